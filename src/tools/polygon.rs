use egui::Pos2;

use super::{Tool, ToolContext, ToolId, ToolOverlay};
use crate::board::BoardRequest;
use crate::layers::LayerId;
use crate::viewport::ViewportTransform;

/// Surface-pixel distance to the first vertex that closes the polygon.
pub const CLOSE_RADIUS: f32 = 10.0;

/// Click-by-click polygon that becomes the selection when closed.
#[derive(Default)]
pub struct PolygonTool {
    armed: bool,
    /// Placed vertices, photo space.
    points: Vec<Pos2>,
    /// Rubber-band end following the pointer, photo space.
    hover: Option<Pos2>,
}

impl PolygonTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    fn closes(&self, pos: Pos2, viewport: &ViewportTransform) -> bool {
        self.points.len() >= 3
            && self
                .points
                .first()
                .is_some_and(|first| viewport.to_global(*first).distance(pos) <= CLOSE_RADIUS)
    }
}

impl Tool for PolygonTool {
    fn id(&self) -> ToolId {
        ToolId::Polygon
    }

    fn set_active(&mut self, ctx: &mut ToolContext<'_>, layer: Option<LayerId>, _view_scale: f32) {
        self.armed = layer.is_some();
        if !self.armed && !self.points.is_empty() {
            self.points.clear();
            self.hover = None;
            ctx.request(BoardRequest::Redraw);
        }
    }

    fn is_active(&self) -> bool {
        self.armed
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>) {
        if !self.armed {
            return;
        }
        let Some(pos) = pos else { return };
        if self.closes(pos, ctx.viewport) {
            let (w, h) = ctx.photo.dimensions();
            ctx.selection.set_polygon(&self.points, w, h);
            log_info!("Polygon selection closed with {} vertices", self.points.len());
            self.points.clear();
            self.hover = None;
        } else {
            self.points.push(ctx.viewport.to_local(pos));
        }
        ctx.request(BoardRequest::Redraw);
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>) {
        if self.points.is_empty() {
            return;
        }
        self.hover = pos.map(|p| ctx.viewport.to_local(p));
    }

    fn pointer_up(&mut self, _ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {}

    fn overlay(&self, viewport: &ViewportTransform) -> Option<ToolOverlay<'_>> {
        if self.points.is_empty() {
            return None;
        }
        let points = self
            .points
            .iter()
            .chain(self.hover.iter())
            .map(|p| viewport.to_global(*p))
            .collect();
        Some(ToolOverlay::Polygon { points })
    }
}
