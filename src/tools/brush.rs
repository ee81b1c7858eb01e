use egui::Pos2;
use image::Luma;

use super::{PaintMode, Tool, ToolContext, ToolId, ToolOverlay, ToolSetting, ToolValues};
use crate::board::BoardRequest;
use crate::error::BoardError;
use crate::layers::LayerId;
use crate::selection::SelectionMask;
use crate::viewport::ViewportTransform;

/// Soft round brush painting coverage into the current layer mask.
pub struct BrushTool {
    /// Diameter in surface pixels, so the cursor looks the same at any zoom.
    size: f32,
    /// 0.0..=1.0
    hardness: f32,
    mode: PaintMode,
    layer: Option<LayerId>,
    view_scale: f32,
    /// Last stamped point of the current stroke, photo space.
    last_point: Option<Pos2>,
    /// Pointer position for the cursor overlay, surface space.
    cursor: Option<Pos2>,
    /// Alpha by squared-distance ratio of the outer radius.
    alpha_lut: [u8; 256],
    lut_params: (f32, f32),
}

impl BrushTool {
    pub fn new(size: f32, hardness: f32) -> Self {
        Self {
            size: size.max(1.0),
            hardness: hardness.clamp(0.0, 1.0),
            mode: PaintMode::Add,
            layer: None,
            view_scale: 1.0,
            last_point: None,
            cursor: None,
            alpha_lut: [0; 256],
            lut_params: (-1.0, -1.0),
        }
    }

    /// Photo-space radius for the current zoom.
    pub fn photo_radius(&self) -> f32 {
        self.size / 2.0 / self.view_scale
    }

    fn rebuild_lut(&mut self, radius: f32) {
        let params = (radius, self.hardness);
        if params == self.lut_params {
            return;
        }
        self.lut_params = params;
        let outer = outer_radius(radius);
        for (i, slot) in self.alpha_lut.iter_mut().enumerate() {
            let dist = (i as f32 / 255.0).sqrt() * outer;
            *slot = (brush_alpha(dist, radius, self.hardness) * 255.0).round().min(255.0) as u8;
        }
    }

    fn stroke_to(&mut self, ctx: &mut ToolContext<'_>, to: Pos2) {
        let Some(id) = self.layer else { return };
        let radius = self.photo_radius();
        self.rebuild_lut(radius);
        let from = self.last_point.unwrap_or(to);
        let selection: &SelectionMask = &*ctx.selection;
        let Some(layer) = ctx.layers.find_layer_mut(id) else { return };
        let mask = layer.mask_mut();

        let spacing = (radius * 0.25).max(0.5);
        let steps = ((to - from).length() / spacing).ceil().max(1.0) as u32;
        let first = if self.last_point.is_some() { 1 } else { 0 };
        for step in first..=steps {
            let center = from.lerp(to, step as f32 / steps as f32);
            stamp(mask, selection, center, radius, &self.alpha_lut, self.mode);
        }
        self.last_point = Some(to);
        ctx.request(BoardRequest::Redraw);
    }
}

impl Tool for BrushTool {
    fn id(&self) -> ToolId {
        ToolId::Brush
    }

    fn set_active(&mut self, _ctx: &mut ToolContext<'_>, layer: Option<LayerId>, view_scale: f32) {
        self.layer = layer;
        self.view_scale = view_scale;
        self.last_point = None;
        if layer.is_none() {
            self.cursor = None;
        }
    }

    fn is_active(&self) -> bool {
        self.layer.is_some()
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>) {
        let Some(pos) = pos else { return };
        self.cursor = Some(pos);
        self.last_point = None;
        let local = ctx.viewport.to_local(pos);
        self.stroke_to(ctx, local);
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>) {
        let Some(pos) = pos else { return };
        self.cursor = Some(pos);
        if self.last_point.is_some() {
            let local = ctx.viewport.to_local(pos);
            self.stroke_to(ctx, local);
        }
    }

    fn pointer_up(&mut self, _ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {
        self.last_point = None;
    }

    fn on_view_scale_change(&mut self, _ctx: &mut ToolContext<'_>, scale: f32) {
        if scale > 0.0 {
            self.view_scale = scale;
        }
    }

    fn apply_setting(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        setting: ToolSetting,
    ) -> Result<(), BoardError> {
        match setting {
            ToolSetting::Size(px) => self.size = px.max(1.0),
            ToolSetting::Hardness(h) => self.hardness = (h / 100.0).clamp(0.0, 1.0),
            ToolSetting::Mode(mode) => self.mode = mode,
            other => {
                return Err(BoardError::UnsupportedSetting {
                    tool: self.id(),
                    setting: other.name(),
                });
            }
        }
        Ok(())
    }

    fn values(&self) -> Option<ToolValues> {
        Some(ToolValues::Brush {
            size: self.size,
            hardness: (self.hardness * 100.0).round(),
            mode: self.mode,
        })
    }

    fn overlay(&self, _viewport: &ViewportTransform) -> Option<ToolOverlay<'_>> {
        if !self.is_active() {
            return None;
        }
        self.cursor.map(|center| ToolOverlay::BrushCursor {
            center,
            radius: self.size / 2.0,
        })
    }
}

/// Tiny brushes get an extra antialiasing band past the nominal radius.
fn outer_radius(radius: f32) -> f32 {
    if radius < 3.0 { radius + 1.5 } else { radius }
}

/// Smoothstep falloff from a solid core to the outer radius.
fn brush_alpha(dist: f32, radius: f32, hardness: f32) -> f32 {
    // 0 hardness still keeps a sliver of solid core.
    let hardness = (0.02 + hardness * 0.98).clamp(0.0, 0.99);
    let outer = outer_radius(radius);
    let fade = if radius < 3.0 {
        1.5 + radius * (1.0 - hardness)
    } else {
        (radius * (1.0 - hardness)).max(1.0)
    };
    let solid = outer - fade;
    if dist <= solid {
        return 1.0;
    }
    if dist >= outer {
        return 0.0;
    }
    let x = 1.0 - ((dist - solid) / fade).clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}

fn stamp(
    mask: &mut image::GrayImage,
    selection: &SelectionMask,
    center: Pos2,
    radius: f32,
    lut: &[u8; 256],
    mode: PaintMode,
) {
    let outer = outer_radius(radius);
    let outer_sq = outer * outer;
    let (w, h) = mask.dimensions();
    let x0 = (center.x - outer).floor().max(0.0) as u32;
    let y0 = (center.y - outer).floor().max(0.0) as u32;
    let x1 = ((center.x + outer).ceil().max(0.0) as u32).min(w);
    let y1 = ((center.y + outer).ceil().max(0.0) as u32).min(h);
    for y in y0..y1 {
        let dy = y as f32 + 0.5 - center.y;
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - center.x;
            let d_sq = dx * dx + dy * dy;
            if d_sq >= outer_sq {
                continue;
            }
            let idx = ((d_sq / outer_sq) * 255.0) as usize;
            let alpha = lut[idx.min(255)] as u32 * selection.coverage(x, y) as u32 / 255;
            if alpha == 0 {
                continue;
            }
            let old = mask.get_pixel(x, y).0[0];
            let new = match mode {
                PaintMode::Add => old.max(alpha as u8),
                PaintMode::Remove => old.min(255 - alpha as u8),
            };
            mask.put_pixel(x, y, Luma([new]));
        }
    }
}
