use egui::{Pos2, Rect, Vec2, pos2};

/// Zoom/pan transform of the photo-and-layers group.
///
/// A photo-space point `p` lands on the rendering surface at
/// `position + scale * (p - pivot)`.  Zooming moves the pivot under the
/// anchor first, so the anchored point stays put while the scale changes.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportTransform {
    scale: f32,
    position: Pos2,
    pivot: Pos2,
    min_scale: f32,
    /// Scale change per unit of zoom delta.
    zoom_step: f32,
    /// Scale computed by the initial fit, kept for `reset`.
    fit_scale: f32,
    fit_position: Pos2,
}

impl ViewportTransform {
    /// `min_scale` is derived as `scale * min_scale_factor`.
    pub fn new(scale: f32, position: Pos2, min_scale_factor: f32, zoom_step: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self {
            scale,
            position,
            pivot: Pos2::ZERO,
            min_scale: scale * min_scale_factor,
            zoom_step,
            fit_scale: scale,
            fit_position: position,
        }
    }

    /// Fit `photo_size` inside `container_size`, centered.
    pub fn fit_to_container(
        photo_size: Vec2,
        container_size: Vec2,
        min_scale_factor: f32,
        zoom_step: f32,
    ) -> Self {
        let (scale, position) = fit_scale_and_position(photo_size, container_size);
        Self::new(scale, position, min_scale_factor, zoom_step)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn position(&self) -> Pos2 {
        self.position
    }

    pub fn pivot(&self) -> Pos2 {
        self.pivot
    }

    pub fn min_scale(&self) -> f32 {
        self.min_scale
    }

    /// Surface → photo coordinates.
    pub fn to_local(&self, global: Pos2) -> Pos2 {
        self.pivot + (global - self.position) / self.scale
    }

    /// Photo → surface coordinates.
    pub fn to_global(&self, local: Pos2) -> Pos2 {
        self.position + (local - self.pivot) * self.scale
    }

    /// Where a `photo_size` image lands on the surface.
    pub fn photo_rect(&self, photo_size: Vec2) -> Rect {
        Rect::from_two_pos(self.to_global(Pos2::ZERO), self.to_global(photo_size.to_pos2()))
    }

    /// Wheel-style zoom: negative `delta` zooms in by `-delta`, anything else
    /// zooms out by `delta`.
    pub fn zoom_by(&mut self, delta: f32, anchor: Pos2) {
        if delta < 0.0 {
            self.zoom_in(-delta, anchor);
        } else {
            self.zoom_out(delta, anchor);
        }
    }

    pub fn zoom_in(&mut self, delta: f32, anchor: Pos2) {
        let scale = self.scale + delta * self.zoom_step;
        self.zoom_to(scale, anchor);
    }

    /// Pins the scale to `min_scale` (pivot and position untouched) when the
    /// result would reach the floor.
    pub fn zoom_out(&mut self, delta: f32, anchor: Pos2) {
        let scale = self.scale - delta * self.zoom_step;
        if scale <= self.min_scale {
            self.scale = self.min_scale;
            return;
        }
        self.zoom_to(scale, anchor);
    }

    fn zoom_to(&mut self, scale: f32, anchor: Pos2) {
        if !scale.is_finite() || scale <= 0.0 {
            return;
        }
        // Both projections use the transform as it is before the scale change.
        let pivot = self.to_local(anchor);
        let position = self.to_global(pivot);
        self.pivot = pivot;
        self.position = position;
        self.scale = scale.max(self.min_scale);
    }

    pub fn pan_by(&mut self, movement: Vec2) {
        self.position += movement;
    }

    /// One pinch step: zoom by `scale_ratio` about `anchor` (the previous
    /// middle point), then move by the middle point's `movement`.
    pub fn pinch_update(&mut self, movement: Vec2, scale_ratio: f32, anchor: Pos2) {
        if !scale_ratio.is_finite() || scale_ratio <= 0.0 {
            self.pan_by(movement);
            return;
        }
        self.pivot = self.to_local(anchor);
        self.position = anchor;
        self.scale = (self.scale * scale_ratio).max(self.min_scale);
        self.position += movement;
    }

    /// Back to the initial fit.
    pub fn reset(&mut self) {
        self.scale = self.fit_scale;
        self.position = self.fit_position;
        self.pivot = Pos2::ZERO;
    }
}

/// Largest uniform scale that fits `photo` into `container`, and the offset
/// that centers it.
pub fn fit_scale_and_position(photo: Vec2, container: Vec2) -> (f32, Pos2) {
    if photo.x <= 0.0 || photo.y <= 0.0 || container.x <= 0.0 || container.y <= 0.0 {
        return (1.0, Pos2::ZERO);
    }
    let scale = (container.x / photo.x).min(container.y / photo.y);
    let x = (container.x - photo.x * scale) / 2.0;
    let y = (container.y - photo.y * scale) / 2.0;
    (scale, pos2(x, y))
}
