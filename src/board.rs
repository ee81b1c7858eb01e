//! The controller that ties input, gestures, the viewport, layers and tools
//! together behind one explicit API.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use egui::{Pos2, Vec2, vec2};
use image::RgbaImage;

use crate::compositor::{self, ShadingMaps};
use crate::error::BoardError;
use crate::gesture::{GestureEvent, GestureStateMachine};
use crate::glass::MagnifyingGlass;
use crate::input::{self, PointerInput, RawInput};
use crate::io;
use crate::layers::{LayerId, LayerInfo, LayerStack};
use crate::selection::SelectionMask;
use crate::settings::BoardSettings;
use crate::tools::{
    PaintMode, ToolCommand, ToolContext, ToolDispatcher, ToolId, ToolOverlay, ToolRegistry,
    ToolSetting, ToolValues,
};
use crate::viewport::ViewportTransform;

/// Work a tool asks the controller to do once the current dispatch is done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardRequest {
    SelectLayer(LayerId),
    Redraw,
}

/// State the tools see through `ToolContext`.
struct Scene {
    photo: RgbaImage,
    shading: ShadingMaps,
    layers: LayerStack,
    selection: SelectionMask,
    viewport: ViewportTransform,
    requests: Vec<BoardRequest>,
}

impl Scene {
    fn tool_ctx(&mut self) -> ToolContext<'_> {
        ToolContext {
            photo: &self.photo,
            layers: &mut self.layers,
            selection: &mut self.selection,
            viewport: &self.viewport,
            requests: &mut self.requests,
        }
    }
}

pub struct BoardController {
    settings: BoardSettings,
    scene: Scene,
    gestures: GestureStateMachine,
    dispatcher: ToolDispatcher,
    glass: MagnifyingGlass,
    redraw: bool,
}

impl BoardController {
    /// Decode `path` (blocking) and build a controller fitted to `container`.
    pub fn load_image(
        path: &Path,
        container: Vec2,
        max_size: Option<u32>,
        settings: BoardSettings,
    ) -> Result<Self, BoardError> {
        let photo = io::load_photo(path, max_size).inspect_err(|e| {
            log_err!("Could not load {}: {}", path.display(), e);
        })?;
        Ok(Self::from_photo(photo, container, settings))
    }

    pub fn from_photo(photo: RgbaImage, container: Vec2, settings: BoardSettings) -> Self {
        let registry = ToolRegistry::standard(&settings);
        Self::with_registry(photo, container, settings, registry)
    }

    /// Build with a caller-supplied set of tools.
    pub fn with_registry(
        photo: RgbaImage,
        container: Vec2,
        settings: BoardSettings,
        registry: ToolRegistry,
    ) -> Self {
        let (w, h) = photo.dimensions();
        let viewport = ViewportTransform::fit_to_container(
            vec2(w as f32, h as f32),
            container,
            settings.min_scale_factor,
            settings.wheel_zoom_step,
        );
        log_info!(
            "Board ready: photo {}x{}, fit scale {:.3}, min scale {:.3}",
            w,
            h,
            viewport.scale(),
            viewport.min_scale()
        );
        Self {
            scene: Scene {
                shading: ShadingMaps::from_photo(&photo),
                layers: LayerStack::new(w, h),
                selection: SelectionMask::new(),
                viewport,
                requests: Vec::new(),
                photo,
            },
            gestures: GestureStateMachine::new(settings.tap_delay()),
            dispatcher: ToolDispatcher::new(registry),
            glass: MagnifyingGlass::new(settings.glass_width, settings.glass_height, settings.glass_zoom),
            settings,
            redraw: true,
        }
    }

    // -- Layers --------------------------------------------------------------

    /// Append a layer and make it the selected one.
    pub fn add_layer(&mut self) -> LayerInfo {
        let added = self.scene.layers.add();
        log_info!("Added layer {}", added.id);
        self.redraw = true;
        self.select_layer(added.id).unwrap_or(added)
    }

    pub fn select_layer(&mut self, id: LayerId) -> Result<LayerInfo, BoardError> {
        let info = self.select_layer_quiet(id)?;
        self.drain_requests();
        Ok(info)
    }

    fn select_layer_quiet(&mut self, id: LayerId) -> Result<LayerInfo, BoardError> {
        let info = self.scene.layers.select(id).inspect_err(|e| {
            log_warn!("{}", e);
        })?;
        let scale = self.scene.viewport.scale();
        self.dispatcher.rearm(&mut self.scene.tool_ctx(), id, scale);
        Ok(info)
    }

    /// `level` in 0..=100.
    pub fn set_black_level_to_selected_layer(&mut self, level: f32) -> Result<LayerInfo, BoardError> {
        self.update_selected_layer(|layers| layers.set_black_level(level))
    }

    /// `level` in 0..=100.
    pub fn set_white_level_to_selected_layer(&mut self, level: f32) -> Result<LayerInfo, BoardError> {
        self.update_selected_layer(|layers| layers.set_white_level(level))
    }

    /// Packed 0xRRGGBB.
    pub fn set_color_to_selected_layer(&mut self, color: u32) -> Result<LayerInfo, BoardError> {
        self.update_selected_layer(|layers| layers.set_color(color))
    }

    /// `hue` in 0..=359.
    pub fn set_hue_to_selected_layer(&mut self, hue: u16) -> Result<LayerInfo, BoardError> {
        self.update_selected_layer(|layers| layers.set_hue(hue))
    }

    /// `saturation` in 0..=100.
    pub fn set_saturation_to_selected_layer(&mut self, saturation: u8) -> Result<LayerInfo, BoardError> {
        self.update_selected_layer(|layers| layers.set_saturation(saturation))
    }

    /// `brightness` in 0..=100.
    pub fn set_brightness_to_selected_layer(&mut self, brightness: u8) -> Result<LayerInfo, BoardError> {
        self.update_selected_layer(|layers| layers.set_brightness(brightness))
    }

    fn update_selected_layer(
        &mut self,
        f: impl FnOnce(&mut LayerStack) -> Result<LayerInfo, BoardError>,
    ) -> Result<LayerInfo, BoardError> {
        let info = f(&mut self.scene.layers).inspect_err(|e| {
            log_warn!("{}", e);
        })?;
        self.dispatcher.notify_layer_props(&mut self.scene.tool_ctx());
        self.redraw = true;
        self.drain_requests();
        Ok(info)
    }

    // -- Tools ---------------------------------------------------------------

    /// `None` leaves the board in pan mode.
    pub fn set_tool(&mut self, tool: Option<ToolId>) -> Result<(), BoardError> {
        let layer = self.scene.layers.selected_id();
        let scale = self.scene.viewport.scale();
        self.dispatcher
            .set_tool(&mut self.scene.tool_ctx(), tool, layer, scale)
            .inspect_err(|e| {
                log_warn!("{}", e);
            })?;
        self.redraw = true;
        self.drain_requests();
        Ok(())
    }

    /// Diameter in surface pixels.
    pub fn set_brush_size(&mut self, px: f32) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::Brush, ToolSetting::Size(px))
    }

    /// `hardness` in 0..=100.
    pub fn set_brush_hardness(&mut self, hardness: f32) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::Brush, ToolSetting::Hardness(hardness))
    }

    pub fn set_brush_to_add(&mut self) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::Brush, ToolSetting::Mode(PaintMode::Add))
    }

    pub fn set_brush_to_remove(&mut self) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::Brush, ToolSetting::Mode(PaintMode::Remove))
    }

    /// `tolerance` in 1..=200.
    pub fn set_magic_wand_tolerance(&mut self, tolerance: u32) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::MagicWand, ToolSetting::Tolerance(tolerance))
    }

    pub fn set_magic_wand_to_add(&mut self) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::MagicWand, ToolSetting::Mode(PaintMode::Add))
    }

    pub fn set_magic_wand_to_remove(&mut self) -> Result<(), BoardError> {
        self.apply_tool_setting(ToolId::MagicWand, ToolSetting::Mode(PaintMode::Remove))
    }

    /// Recompute the wand preview with the current tolerance.
    pub fn fill_magic_wand(&mut self) -> Result<(), BoardError> {
        self.run_tool_command(ToolId::MagicWand, ToolCommand::FillPreview)
    }

    /// Merge the wand preview into the selected layer.
    pub fn apply_magic_wand_to_selected_layer(&mut self) -> Result<(), BoardError> {
        self.run_tool_command(ToolId::MagicWand, ToolCommand::Apply)
    }

    pub fn clear_selection(&mut self) {
        if !self.scene.selection.is_empty() {
            self.scene.selection.clear();
            self.redraw = true;
        }
    }

    pub fn get_tools_values(&self) -> BTreeMap<ToolId, ToolValues> {
        self.dispatcher.values()
    }

    fn apply_tool_setting(&mut self, id: ToolId, setting: ToolSetting) -> Result<(), BoardError> {
        self.dispatcher
            .apply_setting(&mut self.scene.tool_ctx(), id, setting)
            .inspect_err(|e| {
                log_warn!("{}", e);
            })?;
        self.drain_requests();
        Ok(())
    }

    fn run_tool_command(&mut self, id: ToolId, command: ToolCommand) -> Result<(), BoardError> {
        let result = self.dispatcher.run_command(&mut self.scene.tool_ctx(), id, command);
        // A failed command may still have queued work.
        self.drain_requests();
        result.inspect_err(|e| {
            log_warn!("{}", e);
        })
    }

    // -- Output and overlays -------------------------------------------------

    /// Photo-sized composite of every layer.
    pub fn get_canvas_result(&self) -> RgbaImage {
        compositor::composite(&self.scene.photo, &self.scene.shading, &self.scene.layers)
    }

    pub fn show_glass(&mut self) {
        self.glass.show();
        self.redraw = true;
    }

    pub fn hide_glass(&mut self) {
        self.glass.hide();
        self.redraw = true;
    }

    pub fn switch_glass(&mut self) {
        self.glass.switch();
        self.redraw = true;
    }

    // -- Input ---------------------------------------------------------------

    /// Feed one host event.  `now` orders it against the deferred tap.
    pub fn handle_input(&mut self, raw: &RawInput, now: Instant) {
        let input = input::normalize(raw);
        if let Some(pos) = pointer_position(&input) {
            self.glass.update_pointer(pos);
            if self.glass.is_visible() {
                self.redraw = true;
            }
        }
        for event in self.gestures.feed(&input, now) {
            self.dispatch(event);
        }
    }

    /// Let a pending deferred tap fire without further input.
    pub fn tick(&mut self, now: Instant) {
        if let Some(event) = self.gestures.tick(now) {
            self.dispatch(event);
        }
    }

    /// When the host should call `tick` next, if anything is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.gestures.pending_deadline()
    }

    fn dispatch(&mut self, event: GestureEvent) {
        match event {
            GestureEvent::PointerDown(pos) => {
                self.dispatcher.pointer_down(&mut self.scene.tool_ctx(), pos);
            }
            GestureEvent::PointerMove(pos) => {
                if let Some(pan) = self.dispatcher.pointer_move(&mut self.scene.tool_ctx(), pos) {
                    self.scene.viewport.pan_by(pan);
                    self.view_changed();
                }
            }
            GestureEvent::PointerUp(pos) => {
                self.dispatcher.pointer_up(&mut self.scene.tool_ctx(), pos);
            }
            GestureEvent::Zoom { delta, anchor } => {
                self.scene.viewport.zoom_by(delta, anchor);
                self.view_changed();
            }
            GestureEvent::Pinch {
                movement,
                scale_ratio,
                anchor,
            } => {
                self.scene.viewport.pinch_update(movement, scale_ratio, anchor);
                self.view_changed();
            }
        }
        self.drain_requests();
    }

    /// Back to the initial fit.
    pub fn reset_view(&mut self) {
        self.scene.viewport.reset();
        self.view_changed();
    }

    fn view_changed(&mut self) {
        let scale = self.scene.viewport.scale();
        self.dispatcher.notify_view_scale(&mut self.scene.tool_ctx(), scale);
        self.redraw = true;
    }

    /// Apply what tools queued during the last dispatch.
    fn drain_requests(&mut self) {
        loop {
            let requests = std::mem::take(&mut self.scene.requests);
            if requests.is_empty() {
                break;
            }
            for request in requests {
                match request {
                    BoardRequest::SelectLayer(id) => {
                        let _ = self.select_layer_quiet(id);
                        self.redraw = true;
                    }
                    BoardRequest::Redraw => self.redraw = true,
                }
            }
        }
    }

    // -- Accessors for the host ----------------------------------------------

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub fn photo(&self) -> &RgbaImage {
        &self.scene.photo
    }

    pub fn photo_size(&self) -> Vec2 {
        let (w, h) = self.scene.photo.dimensions();
        vec2(w as f32, h as f32)
    }

    pub fn viewport(&self) -> &ViewportTransform {
        &self.scene.viewport
    }

    pub fn layers(&self) -> &LayerStack {
        &self.scene.layers
    }

    pub fn selection(&self) -> &SelectionMask {
        &self.scene.selection
    }

    pub fn glass(&self) -> &MagnifyingGlass {
        &self.glass
    }

    pub fn active_tool(&self) -> Option<ToolId> {
        self.dispatcher.active_tool()
    }

    pub fn tool_overlay(&self) -> Option<ToolOverlay<'_>> {
        self.dispatcher.overlay(&self.scene.viewport)
    }

    /// True once after anything visible changed.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }
}

/// Surface position carried by a move, if any.
fn pointer_position(input: &PointerInput) -> Option<Pos2> {
    match input {
        PointerInput::Mouse { sample, .. } => sample.map(|s| s.pos),
        PointerInput::Wheel { sample, .. } => Some(sample.pos),
        PointerInput::Touch { samples, .. } => samples.first().map(|s| s.pos),
    }
}
