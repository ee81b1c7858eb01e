use egui::{Pos2, Rect, Vec2, pos2, vec2};

/// Magnifying glass that follows the pointer, independent of tool state.
#[derive(Clone, Debug, PartialEq)]
pub struct MagnifyingGlass {
    visible: bool,
    size: Vec2,
    zoom: f32,
    /// Last pointer position, surface space.
    pointer: Option<Pos2>,
}

impl MagnifyingGlass {
    pub fn new(width: f32, height: f32, zoom: f32) -> Self {
        Self {
            visible: false,
            size: vec2(width.max(1.0), height.max(1.0)),
            zoom: if zoom > 0.0 { zoom } else { 1.0 },
            pointer: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn switch(&mut self) {
        self.visible = !self.visible;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pointer(&self) -> Option<Pos2> {
        self.pointer
    }

    pub fn update_pointer(&mut self, pos: Pos2) {
        self.pointer = Some(pos);
    }

    /// On-screen frame, top-right corner at the pointer.
    pub fn frame_rect(&self) -> Option<Rect> {
        let p = self.pointer?;
        Some(Rect::from_min_size(pos2(p.x - self.size.x, p.y), self.size))
    }

    /// Surface region shown inside the frame, centered on the pointer.
    pub fn source_rect(&self) -> Option<Rect> {
        let p = self.pointer?;
        Some(Rect::from_center_size(p, self.size / self.zoom))
    }
}
