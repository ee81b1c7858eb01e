//! Tool capability contract, the per-controller registry, and the dispatcher
//! that routes pointer input to the single active tool.

pub mod brush;
pub mod magic_wand;
pub mod polygon;

use std::collections::BTreeMap;

use egui::{Pos2, Vec2};
use image::{GrayImage, RgbaImage};

use crate::board::BoardRequest;
use crate::error::BoardError;
use crate::layers::{LayerId, LayerStack};
use crate::selection::SelectionMask;
use crate::settings::BoardSettings;
use crate::viewport::ViewportTransform;

pub use brush::BrushTool;
pub use magic_wand::MagicWandTool;
pub use polygon::PolygonTool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolId {
    Brush,
    MagicWand,
    Polygon,
}

impl ToolId {
    pub const ALL: [ToolId; 3] = [ToolId::Brush, ToolId::MagicWand, ToolId::Polygon];

    pub fn name(&self) -> &'static str {
        match self {
            ToolId::Brush => "brush",
            ToolId::MagicWand => "magic wand",
            ToolId::Polygon => "polygon",
        }
    }
}

/// Whether a tool adds to or removes from the mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PaintMode {
    #[default]
    Add,
    Remove,
}

impl PaintMode {
    /// 1 = add, 0 = remove.
    pub fn flag(&self) -> u8 {
        match self {
            PaintMode::Add => 1,
            PaintMode::Remove => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolSetting {
    /// Brush diameter in surface pixels.
    Size(f32),
    /// 0..=100.
    Hardness(f32),
    /// 1..=200.
    Tolerance(u32),
    Mode(PaintMode),
}

impl ToolSetting {
    pub fn name(&self) -> &'static str {
        match self {
            ToolSetting::Size(_) => "size",
            ToolSetting::Hardness(_) => "hardness",
            ToolSetting::Tolerance(_) => "tolerance",
            ToolSetting::Mode(_) => "mode",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolCommand {
    /// Recompute the preview with the current parameters.
    FillPreview,
    /// Commit the preview into the current layer.
    Apply,
}

impl ToolCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCommand::FillPreview => "fill",
            ToolCommand::Apply => "apply",
        }
    }
}

/// User-facing parameters of a tool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolValues {
    Brush { size: f32, hardness: f32, mode: PaintMode },
    MagicWand { tolerance: u32, mode: PaintMode },
}

/// What the host draws on top of the layers for the active tool.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolOverlay<'a> {
    /// Surface-space circle following the pointer.
    BrushCursor { center: Pos2, radius: f32 },
    /// Open polyline in surface coordinates.
    Polygon { points: Vec<Pos2> },
    /// Photo-sized preview mask, tinted with a packed color.
    Mask { mask: &'a GrayImage, color: u32 },
}

/// Everything a tool may read or change while handling a hook.
pub struct ToolContext<'a> {
    pub photo: &'a RgbaImage,
    pub layers: &'a mut LayerStack,
    pub selection: &'a mut SelectionMask,
    pub viewport: &'a ViewportTransform,
    /// Work for the controller to do after the current dispatch.
    pub requests: &'a mut Vec<BoardRequest>,
}

impl ToolContext<'_> {
    pub fn request(&mut self, request: BoardRequest) {
        self.requests.push(request);
    }
}

/// Capability contract every tool implements.
pub trait Tool {
    fn id(&self) -> ToolId;

    /// `None` deactivates and drops tool-owned UI state; `Some` arms the
    /// tool against that layer.
    fn set_active(&mut self, ctx: &mut ToolContext<'_>, layer: Option<LayerId>, view_scale: f32);

    /// True while armed against a layer by `set_active`.
    fn is_active(&self) -> bool;

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>);

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>);

    /// `pos` is `None` for releases without coordinates (touch end).
    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>);

    fn on_view_scale_change(&mut self, _ctx: &mut ToolContext<'_>, _scale: f32) {}

    fn on_selected_layer_props_change(&mut self, _ctx: &mut ToolContext<'_>) {}

    fn apply_setting(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        setting: ToolSetting,
    ) -> Result<(), BoardError> {
        Err(BoardError::UnsupportedSetting {
            tool: self.id(),
            setting: setting.name(),
        })
    }

    fn run_command(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        command: ToolCommand,
    ) -> Result<(), BoardError> {
        Err(BoardError::UnsupportedSetting {
            tool: self.id(),
            setting: command.name(),
        })
    }

    fn values(&self) -> Option<ToolValues> {
        None
    }

    fn overlay(&self, _viewport: &ViewportTransform) -> Option<ToolOverlay<'_>> {
        None
    }
}

/// One tool instance per identifier, owned by a single controller.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolId, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brush, magic wand and polygon with their configured defaults.
    pub fn standard(settings: &BoardSettings) -> Self {
        let mut registry = Self::new();
        registry.insert(Box::new(BrushTool::new(settings.brush_size, settings.brush_hardness)));
        registry.insert(Box::new(MagicWandTool::new(settings.wand_tolerance)));
        registry.insert(Box::new(PolygonTool::new()));
        registry
    }

    /// Register a tool under its own id, replacing any previous one.
    pub fn insert(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.id(), tool);
    }

    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.contains_key(&id)
    }

    pub fn get(&self, id: ToolId) -> Option<&dyn Tool> {
        self.tools.get(&id).map(|t| t.as_ref())
    }

    fn get_mut(&mut self, id: ToolId) -> Result<&mut (dyn Tool + 'static), BoardError> {
        self.tools
            .get_mut(&id)
            .map(|t| t.as_mut())
            .ok_or(BoardError::ToolNotRegistered(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = ToolId> + '_ {
        self.tools.keys().copied()
    }
}

/// Tracks the current tool and routes pointer events to it.  With no tool
/// selected a held pointer pans the view instead.
pub struct ToolDispatcher {
    registry: ToolRegistry,
    active: Option<ToolId>,
    /// Last pointer position while panning without a tool.
    last_click: Option<Pos2>,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            active: None,
            last_click: None,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn active_tool(&self) -> Option<ToolId> {
        self.active
    }

    /// Deactivate the current tool, then arm `tool` against `layer` if both
    /// are present.
    pub fn set_tool(
        &mut self,
        ctx: &mut ToolContext<'_>,
        tool: Option<ToolId>,
        layer: Option<LayerId>,
        view_scale: f32,
    ) -> Result<(), BoardError> {
        if let Some(id) = tool
            && !self.registry.contains(id)
        {
            return Err(BoardError::ToolNotRegistered(id));
        }
        if let Some(previous) = self.active.take() {
            self.registry.get_mut(previous)?.set_active(ctx, None, view_scale);
        }
        self.active = tool;
        self.last_click = None;
        if let (Some(id), Some(layer)) = (tool, layer) {
            self.registry.get_mut(id)?.set_active(ctx, Some(layer), view_scale);
        }
        Ok(())
    }

    /// Re-arm the current tool after the selected layer changed.
    pub fn rearm(&mut self, ctx: &mut ToolContext<'_>, layer: LayerId, view_scale: f32) {
        if let Some(tool) = self.active_mut() {
            tool.set_active(ctx, Some(layer), view_scale);
        }
    }

    pub fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Pos2) {
        match self.active_mut() {
            Some(tool) => tool.pointer_down(ctx, Some(pos)),
            None => self.last_click = Some(pos),
        }
    }

    /// Returns the pan to apply when no tool is selected and the pointer
    /// is held.
    pub fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Pos2) -> Option<Vec2> {
        if let Some(tool) = self.active_mut() {
            tool.pointer_move(ctx, Some(pos));
            return None;
        }
        let last = self.last_click.as_mut()?;
        let movement = pos - *last;
        *last = pos;
        Some(movement)
    }

    pub fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, pos: Option<Pos2>) {
        if let Some(tool) = self.active_mut() {
            tool.pointer_up(ctx, pos);
        }
        self.last_click = None;
    }

    pub fn notify_view_scale(&mut self, ctx: &mut ToolContext<'_>, scale: f32) {
        if let Some(tool) = self.active_mut() {
            tool.on_view_scale_change(ctx, scale);
        }
    }

    pub fn notify_layer_props(&mut self, ctx: &mut ToolContext<'_>) {
        if let Some(tool) = self.active_mut() {
            tool.on_selected_layer_props_change(ctx);
        }
    }

    /// Settings go to a specific tool, active or not.
    pub fn apply_setting(
        &mut self,
        ctx: &mut ToolContext<'_>,
        id: ToolId,
        setting: ToolSetting,
    ) -> Result<(), BoardError> {
        self.registry.get_mut(id)?.apply_setting(ctx, setting)
    }

    pub fn run_command(
        &mut self,
        ctx: &mut ToolContext<'_>,
        id: ToolId,
        command: ToolCommand,
    ) -> Result<(), BoardError> {
        self.registry.get_mut(id)?.run_command(ctx, command)
    }

    pub fn values(&self) -> BTreeMap<ToolId, ToolValues> {
        self.registry
            .tools
            .iter()
            .filter_map(|(id, tool)| tool.values().map(|v| (*id, v)))
            .collect()
    }

    pub fn overlay(&self, viewport: &ViewportTransform) -> Option<ToolOverlay<'_>> {
        let id = self.active?;
        self.registry.get(id)?.overlay(viewport)
    }

    fn active_mut(&mut self) -> Option<&mut (dyn Tool + 'static)> {
        let id = self.active?;
        self.registry.get_mut(id).ok()
    }
}
