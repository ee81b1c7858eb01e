use std::collections::VecDeque;

use egui::Pos2;
use image::{GrayImage, Luma, Rgba, RgbaImage};

use super::{PaintMode, Tool, ToolCommand, ToolContext, ToolId, ToolOverlay, ToolSetting, ToolValues};
use crate::board::BoardRequest;
use crate::error::BoardError;
use crate::layers::{DEFAULT_LAYER_COLOR, LayerId};
use crate::viewport::ViewportTransform;

pub const MIN_TOLERANCE: u32 = 1;
pub const MAX_TOLERANCE: u32 = 200;

/// Contiguous color-region picker.  A click builds a preview; `Apply` merges
/// it into the current layer.
pub struct MagicWandTool {
    tolerance: u32,
    mode: PaintMode,
    layer: Option<LayerId>,
    /// Tint for the preview overlay, taken from the current layer.
    layer_color: u32,
    /// Photo pixel the last click landed on.
    seed: Option<(u32, u32)>,
    preview: Option<GrayImage>,
}

impl MagicWandTool {
    pub fn new(tolerance: u32) -> Self {
        Self {
            tolerance: tolerance.clamp(MIN_TOLERANCE, MAX_TOLERANCE),
            mode: PaintMode::Add,
            layer: None,
            layer_color: DEFAULT_LAYER_COLOR,
            seed: None,
            preview: None,
        }
    }

    pub fn preview(&self) -> Option<&GrayImage> {
        self.preview.as_ref()
    }

    fn refresh_preview(&mut self, ctx: &mut ToolContext<'_>) {
        let Some(seed) = self.seed else { return };
        let mask = flood_fill_selection(ctx.photo, seed, self.tolerance as f32);
        log_info!(
            "Magic wand at ({}, {}) tolerance {} selected {} px",
            seed.0,
            seed.1,
            self.tolerance,
            mask.pixels().filter(|p| p.0[0] > 0).count()
        );
        self.preview = Some(mask);
        ctx.request(BoardRequest::Redraw);
    }

    fn sync_color(&mut self, ctx: &ToolContext<'_>) {
        if let Some(layer) = self.layer.and_then(|id| ctx.layers.find_layer(id)) {
            self.layer_color = layer.color;
        }
    }

    fn apply(&mut self, ctx: &mut ToolContext<'_>) -> Result<(), BoardError> {
        let id = self.layer.ok_or(BoardError::NoLayerSelected)?;
        let Some(preview) = self.preview.take() else {
            return Ok(());
        };
        self.seed = None;
        let layer = ctx
            .layers
            .find_layer_mut(id)
            .ok_or(BoardError::LayerNotFound(id))?;
        let value = match self.mode {
            PaintMode::Add => 255,
            PaintMode::Remove => 0,
        };
        let mask = layer.mask_mut();
        for (dst, src) in mask.pixels_mut().zip(preview.pixels()) {
            if src.0[0] > 0 {
                dst.0[0] = value;
            }
        }
        ctx.request(BoardRequest::Redraw);
        Ok(())
    }
}

impl Tool for MagicWandTool {
    fn id(&self) -> ToolId {
        ToolId::MagicWand
    }

    fn set_active(&mut self, ctx: &mut ToolContext<'_>, layer: Option<LayerId>, _view_scale: f32) {
        self.layer = layer;
        if layer.is_none() {
            self.seed = None;
            if self.preview.take().is_some() {
                ctx.request(BoardRequest::Redraw);
            }
            return;
        }
        self.sync_color(ctx);
    }

    fn is_active(&self) -> bool {
        self.layer.is_some()
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>) {
        if self.layer.is_none() {
            return;
        }
        let Some(pos) = pos else { return };
        let local = ctx.viewport.to_local(pos);
        let (w, h) = ctx.photo.dimensions();
        if local.x < 0.0 || local.y < 0.0 || local.x >= w as f32 || local.y >= h as f32 {
            return;
        }
        self.seed = Some((local.x as u32, local.y as u32));
        self.refresh_preview(ctx);
    }

    fn pointer_move(&mut self, _ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {}

    fn pointer_up(&mut self, _ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {}

    fn on_selected_layer_props_change(&mut self, ctx: &mut ToolContext<'_>) {
        self.sync_color(ctx);
        if self.preview.is_some() {
            ctx.request(BoardRequest::Redraw);
        }
    }

    fn apply_setting(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        setting: ToolSetting,
    ) -> Result<(), BoardError> {
        match setting {
            ToolSetting::Tolerance(t) => self.tolerance = t.clamp(MIN_TOLERANCE, MAX_TOLERANCE),
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

    fn run_command(
        &mut self,
        ctx: &mut ToolContext<'_>,
        command: ToolCommand,
    ) -> Result<(), BoardError> {
        match command {
            ToolCommand::FillPreview => {
                self.refresh_preview(ctx);
                Ok(())
            }
            ToolCommand::Apply => self.apply(ctx),
        }
    }

    fn values(&self) -> Option<ToolValues> {
        Some(ToolValues::MagicWand {
            tolerance: self.tolerance,
            mode: self.mode,
        })
    }

    fn overlay(&self, _viewport: &ViewportTransform) -> Option<ToolOverlay<'_>> {
        self.preview.as_ref().map(|mask| ToolOverlay::Mask {
            mask,
            color: self.layer_color,
        })
    }
}

/// 4-connected flood fill from `start` over pixels within `tolerance` of the
/// start color.
pub fn flood_fill_selection(photo: &RgbaImage, start: (u32, u32), tolerance: f32) -> GrayImage {
    let (width, height) = photo.dimensions();
    let mut mask = GrayImage::new(width, height);
    if start.0 >= width || start.1 >= height {
        return mask;
    }
    let target = *photo.get_pixel(start.0, start.1);
    let w = width as usize;
    let mut visited = vec![false; w * height as usize];
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited[start.1 as usize * w + start.0 as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        mask.put_pixel(x, y, Luma([255]));
        let neighbors = [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= width || ny >= height {
                continue;
            }
            let vi = ny as usize * w + nx as usize;
            if visited[vi] {
                continue;
            }
            visited[vi] = true;
            if colors_match(&target, photo.get_pixel(nx, ny), tolerance) {
                queue.push_back((nx, ny));
            }
        }
    }
    mask
}

/// Largest per-channel difference, alpha included.
pub fn colors_match(a: &Rgba<u8>, b: &Rgba<u8>, tolerance: f32) -> bool {
    let dist = a
        .0
        .iter()
        .zip(b.0.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0);
    dist as f32 <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerStack;
    use crate::selection::SelectionMask;
    use egui::pos2;

    /// Left half dark, right half bright, with a slightly lighter dark stripe.
    fn two_tone() -> RgbaImage {
        RgbaImage::from_fn(20, 10, |x, _| match x {
            0..=4 => Rgba([10, 10, 10, 255]),
            5..=9 => Rgba([35, 35, 35, 255]),
            _ => Rgba([240, 240, 240, 255]),
        })
    }

    struct Fixture {
        photo: RgbaImage,
        layers: LayerStack,
        selection: SelectionMask,
        viewport: ViewportTransform,
        requests: Vec<BoardRequest>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut layers = LayerStack::new(20, 10);
            layers.add();
            Self {
                photo: two_tone(),
                layers,
                selection: SelectionMask::new(),
                viewport: ViewportTransform::new(1.0, Pos2::ZERO, 0.3, 0.01),
                requests: Vec::new(),
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                photo: &self.photo,
                layers: &mut self.layers,
                selection: &mut self.selection,
                viewport: &self.viewport,
                requests: &mut self.requests,
            }
        }

        fn painted(&self) -> usize {
            self.layers
                .find_layer(0)
                .map(|l| l.mask().pixels().filter(|p| p.0[0] == 255).count())
                .unwrap_or(0)
        }
    }

    fn count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn fill_respects_tolerance() {
        let photo = two_tone();
        assert_eq!(count(&flood_fill_selection(&photo, (0, 0), 10.0)), 50);
        assert_eq!(count(&flood_fill_selection(&photo, (0, 0), 30.0)), 100);
        assert_eq!(count(&flood_fill_selection(&photo, (15, 5), 30.0)), 100);
    }

    #[test]
    fn fill_is_contiguous_only() {
        let photo = RgbaImage::from_fn(9, 1, |x, _| {
            if x == 4 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 0, 255]) }
        });
        assert_eq!(count(&flood_fill_selection(&photo, (0, 0), 5.0)), 4);
    }

    #[test]
    fn preview_then_apply_paints_layer() {
        let mut fx = Fixture::new();
        let mut wand = MagicWandTool::new(30);
        wand.set_active(&mut fx.ctx(), Some(0), 1.0);
        wand.pointer_down(&mut fx.ctx(), Some(pos2(2.0, 2.0)));
        assert_eq!(wand.preview().map(count), Some(100));
        assert_eq!(fx.painted(), 0);
        wand.run_command(&mut fx.ctx(), ToolCommand::Apply).expect("apply");
        assert_eq!(fx.painted(), 100);
        assert!(wand.preview().is_none());
    }

    #[test]
    fn fill_command_recomputes_with_new_tolerance() {
        let mut fx = Fixture::new();
        let mut wand = MagicWandTool::new(30);
        wand.set_active(&mut fx.ctx(), Some(0), 1.0);
        wand.pointer_down(&mut fx.ctx(), Some(pos2(2.0, 2.0)));
        wand.apply_setting(&mut fx.ctx(), ToolSetting::Tolerance(5)).expect("tolerance");
        wand.run_command(&mut fx.ctx(), ToolCommand::FillPreview).expect("fill");
        assert_eq!(wand.preview().map(count), Some(50));
    }

    #[test]
    fn remove_mode_clears_region() {
        let mut fx = Fixture::new();
        let mut wand = MagicWandTool::new(30);
        wand.set_active(&mut fx.ctx(), Some(0), 1.0);
        wand.pointer_down(&mut fx.ctx(), Some(pos2(12.0, 2.0)));
        wand.run_command(&mut fx.ctx(), ToolCommand::Apply).expect("apply");
        assert_eq!(fx.painted(), 100);
        wand.apply_setting(&mut fx.ctx(), ToolSetting::Mode(PaintMode::Remove)).expect("mode");
        wand.pointer_down(&mut fx.ctx(), Some(pos2(12.0, 2.0)));
        wand.run_command(&mut fx.ctx(), ToolCommand::Apply).expect("apply");
        assert_eq!(fx.painted(), 0);
    }

    #[test]
    fn deactivation_drops_preview() {
        let mut fx = Fixture::new();
        let mut wand = MagicWandTool::new(30);
        wand.set_active(&mut fx.ctx(), Some(0), 1.0);
        wand.pointer_down(&mut fx.ctx(), Some(pos2(2.0, 2.0)));
        wand.set_active(&mut fx.ctx(), None, 1.0);
        assert!(wand.preview().is_none());
        assert!(wand.overlay(&fx.viewport).is_none());
    }

    #[test]
    fn tolerance_is_clamped() {
        let mut fx = Fixture::new();
        let mut wand = MagicWandTool::new(0);
        assert_eq!(wand.values(), Some(ToolValues::MagicWand { tolerance: 1, mode: PaintMode::Add }));
        wand.apply_setting(&mut fx.ctx(), ToolSetting::Tolerance(500)).expect("tolerance");
        assert_eq!(wand.values(), Some(ToolValues::MagicWand { tolerance: 200, mode: PaintMode::Add }));
        assert!(wand.apply_setting(&mut fx.ctx(), ToolSetting::Size(3.0)).is_err());
    }
}
