//! `eframe` shell: side panel controls, a canvas that feeds host events to the
//! board, and drawing of the composite, tool overlays and the glass.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Sense, Shape, Stroke, TextureHandle, TextureOptions, Vec2, pos2};
use image::{GrayImage, RgbaImage};

use crate::board::BoardController;
use crate::color::{self, Rgb};
use crate::input::{MouseAction, RawInput, RawTouchList, TouchPhase};
use crate::io::{self, LoadResult};
use crate::layers::LayerId;
use crate::settings::BoardSettings;
use crate::tools::{PaintMode, ToolId, ToolOverlay, ToolValues};

/// Fallback container size until the canvas has been laid out once.
const DEFAULT_CANVAS_SIZE: Vec2 = Vec2::new(1024.0, 720.0);

/// Everything the side panel can ask for, applied after the panel is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PanelAction {
    Open,
    Save,
    Copy,
    AddLayer,
    SelectLayer(LayerId),
    SetTool(Option<ToolId>),
    BrushSize(f32),
    BrushHardness(f32),
    BrushMode(PaintMode),
    Tolerance(u32),
    WandMode(PaintMode),
    FillWand,
    ApplyWand,
    ClearSelection,
    Color(u32),
    Hue(u16),
    Saturation(u8),
    Brightness(u8),
    BlackLevel(f32),
    WhiteLevel(f32),
    ToggleGlass,
    ResetView,
    SaveDefaults,
}

/// GPU copies of the board's rasters, rebuilt only when they change.
#[derive(Default)]
struct CanvasTextures {
    result: Option<TextureHandle>,
    result_generation: Option<u64>,
    tool_mask: Option<TextureHandle>,
    selection: Option<TextureHandle>,
    selection_generation: Option<u64>,
}

pub struct MaskboardApp {
    settings: BoardSettings,
    board: Option<BoardController>,
    loading: Option<mpsc::Receiver<LoadResult>>,
    status: String,
    canvas_size: Vec2,
    /// Live touches in arrival order, keyed by egui touch id.
    touches: Vec<(u64, Pos2)>,
    textures: CanvasTextures,
}

impl MaskboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: BoardSettings, photo: Option<PathBuf>) -> Self {
        let mut app = Self {
            settings,
            board: None,
            loading: None,
            status: "Open a photo to start".to_string(),
            canvas_size: DEFAULT_CANVAS_SIZE,
            touches: Vec::new(),
            textures: CanvasTextures::default(),
        };
        if let Some(path) = photo {
            app.start_load(path);
        }
        app
    }

    fn start_load(&mut self, path: PathBuf) {
        self.status = format!("Loading {}…", path.display());
        self.loading = Some(io::spawn_load(path, self.settings.max_image_size));
    }

    fn poll_loading(&mut self, ctx: &egui::Context) {
        let Some(rx) = self.loading.take() else { return };
        match rx.try_recv() {
            Ok(LoadResult::Loaded { path, photo }) => {
                self.board = Some(BoardController::from_photo(photo, self.canvas_size, self.settings.clone()));
                self.textures = CanvasTextures::default();
                self.touches.clear();
                self.status = format!("{}", path.display());
            }
            Ok(LoadResult::Failed { path, error }) => {
                self.status = format!("Could not open {}: {}", path.display(), error);
            }
            Err(mpsc::TryRecvError::Empty) => {
                self.loading = Some(rx);
                ctx.request_repaint();
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                log_err!("Photo loader thread ended without a result");
            }
        }
    }

    // -- Side panel ----------------------------------------------------------

    fn side_panel(&self, ui: &mut egui::Ui) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        ui.heading("maskboard");
        ui.horizontal(|ui| {
            if ui.button("Open…").clicked() {
                actions.push(PanelAction::Open);
            }
            let has_board = self.board.is_some();
            if ui.add_enabled(has_board, egui::Button::new("Save…")).clicked() {
                actions.push(PanelAction::Save);
            }
            if ui.add_enabled(has_board, egui::Button::new("Copy")).clicked() {
                actions.push(PanelAction::Copy);
            }
        });
        ui.label(self.status.as_str());
        let Some(board) = &self.board else {
            return actions;
        };

        ui.separator();
        ui.label("Tool");
        ui.horizontal_wrapped(|ui| {
            let active = board.active_tool();
            if ui.selectable_label(active.is_none(), "Pan").clicked() {
                actions.push(PanelAction::SetTool(None));
            }
            for id in ToolId::ALL {
                if ui.selectable_label(active == Some(id), id.name()).clicked() {
                    actions.push(PanelAction::SetTool(Some(id)));
                }
            }
        });

        let values = board.get_tools_values();
        if let Some(ToolValues::Brush { size, hardness, mode }) = values.get(&ToolId::Brush).copied() {
            ui.collapsing("Brush", |ui| {
                let mut size = size;
                if ui.add(egui::Slider::new(&mut size, 1.0..=200.0).text("Size")).changed() {
                    actions.push(PanelAction::BrushSize(size));
                }
                let mut hardness = hardness;
                if ui.add(egui::Slider::new(&mut hardness, 0.0..=100.0).text("Hardness")).changed() {
                    actions.push(PanelAction::BrushHardness(hardness));
                }
                mode_picker(ui, mode, &mut actions, PanelAction::BrushMode);
            });
        }
        if let Some(ToolValues::MagicWand { tolerance, mode }) = values.get(&ToolId::MagicWand).copied() {
            ui.collapsing("Magic wand", |ui| {
                let mut tolerance = tolerance;
                if ui.add(egui::Slider::new(&mut tolerance, 1..=200).text("Tolerance")).changed() {
                    actions.push(PanelAction::Tolerance(tolerance));
                }
                mode_picker(ui, mode, &mut actions, PanelAction::WandMode);
                ui.horizontal(|ui| {
                    if ui.button("Fill").clicked() {
                        actions.push(PanelAction::FillWand);
                    }
                    if ui.button("Apply").clicked() {
                        actions.push(PanelAction::ApplyWand);
                    }
                });
            });
        }
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!board.selection().is_empty(), egui::Button::new("Clear selection"))
                .clicked()
            {
                actions.push(PanelAction::ClearSelection);
            }
            if ui.button("Save as defaults").clicked() {
                actions.push(PanelAction::SaveDefaults);
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Layers");
            if ui.button("+").clicked() {
                actions.push(PanelAction::AddLayer);
            }
        });
        let selected = board.layers().selected_id();
        for layer in board.layers().iter() {
            let swatch = color::unpack(layer.color);
            ui.horizontal(|ui| {
                let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
                ui.painter()
                    .rect_filled(rect, 2.0, Color32::from_rgb(swatch.r, swatch.g, swatch.b));
                if ui.selectable_label(selected == Some(layer.id), layer.name.as_str()).clicked() {
                    actions.push(PanelAction::SelectLayer(layer.id));
                }
            });
        }

        if let Some(info) = board.layers().selected().map(|l| l.info()) {
            ui.separator();
            ui.label(format!("{}  {}", info.name, info.hex_color));
            let Rgb { r, g, b } = info.rgb_color;
            let mut rgb = [r, g, b];
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                actions.push(PanelAction::Color(color::pack(Rgb { r: rgb[0], g: rgb[1], b: rgb[2] })));
            }
            let mut hue = info.hsv_color.h;
            if ui.add(egui::Slider::new(&mut hue, 0..=359).text("Hue")).changed() {
                actions.push(PanelAction::Hue(hue));
            }
            let mut sat = info.hsv_color.s;
            if ui.add(egui::Slider::new(&mut sat, 0..=100).text("Saturation")).changed() {
                actions.push(PanelAction::Saturation(sat));
            }
            let mut val = info.hsv_color.v;
            if ui.add(egui::Slider::new(&mut val, 0..=100).text("Brightness")).changed() {
                actions.push(PanelAction::Brightness(val));
            }
            let mut black = info.black_level * 100.0;
            if ui.add(egui::Slider::new(&mut black, 0.0..=100.0).text("Black level")).changed() {
                actions.push(PanelAction::BlackLevel(black));
            }
            let mut white = info.white_level * 100.0;
            if ui.add(egui::Slider::new(&mut white, 0.0..=100.0).text("White level")).changed() {
                actions.push(PanelAction::WhiteLevel(white));
            }
        }

        ui.separator();
        ui.horizontal(|ui| {
            if ui.selectable_label(board.glass().is_visible(), "Glass").clicked() {
                actions.push(PanelAction::ToggleGlass);
            }
            if ui.button("Reset view").clicked() {
                actions.push(PanelAction::ResetView);
            }
        });
        actions
    }

    fn apply(&mut self, action: PanelAction) {
        match action {
            PanelAction::Open => {
                if let Some(path) = io::pick_photo_path() {
                    self.start_load(path);
                }
                return;
            }
            PanelAction::Save => {
                let Some(board) = &self.board else { return };
                if let Some(path) = io::pick_result_path() {
                    self.status = match io::save_result(&board.get_canvas_result(), &path) {
                        Ok(()) => format!("Saved {}", path.display()),
                        Err(e) => format!("Save failed: {}", e),
                    };
                }
                return;
            }
            PanelAction::Copy => {
                if let Some(board) = &self.board {
                    copy_to_clipboard(&board.get_canvas_result());
                    self.status = "Result copied".to_string();
                }
                return;
            }
            PanelAction::SaveDefaults => {
                if let Some(board) = &self.board {
                    for values in board.get_tools_values().values() {
                        match *values {
                            ToolValues::Brush { size, hardness, .. } => {
                                self.settings.brush_size = size;
                                self.settings.brush_hardness = hardness / 100.0;
                            }
                            ToolValues::MagicWand { tolerance, .. } => {
                                self.settings.wand_tolerance = tolerance;
                            }
                        }
                    }
                }
                self.settings.save();
                return;
            }
            _ => {}
        }

        let Some(board) = self.board.as_mut() else { return };
        let result = match action {
            PanelAction::AddLayer => {
                board.add_layer();
                Ok(())
            }
            PanelAction::SelectLayer(id) => board.select_layer(id).map(drop),
            PanelAction::SetTool(tool) => board.set_tool(tool),
            PanelAction::BrushSize(px) => board.set_brush_size(px),
            PanelAction::BrushHardness(h) => board.set_brush_hardness(h),
            PanelAction::BrushMode(PaintMode::Add) => board.set_brush_to_add(),
            PanelAction::BrushMode(PaintMode::Remove) => board.set_brush_to_remove(),
            PanelAction::Tolerance(t) => board.set_magic_wand_tolerance(t),
            PanelAction::WandMode(PaintMode::Add) => board.set_magic_wand_to_add(),
            PanelAction::WandMode(PaintMode::Remove) => board.set_magic_wand_to_remove(),
            PanelAction::FillWand => board.fill_magic_wand(),
            PanelAction::ApplyWand => board.apply_magic_wand_to_selected_layer(),
            PanelAction::ClearSelection => {
                board.clear_selection();
                Ok(())
            }
            PanelAction::Color(c) => board.set_color_to_selected_layer(c).map(drop),
            PanelAction::Hue(h) => board.set_hue_to_selected_layer(h).map(drop),
            PanelAction::Saturation(s) => board.set_saturation_to_selected_layer(s).map(drop),
            PanelAction::Brightness(v) => board.set_brightness_to_selected_layer(v).map(drop),
            PanelAction::BlackLevel(v) => board.set_black_level_to_selected_layer(v).map(drop),
            PanelAction::WhiteLevel(v) => board.set_white_level_to_selected_layer(v).map(drop),
            PanelAction::ToggleGlass => {
                board.switch_glass();
                Ok(())
            }
            PanelAction::ResetView => {
                board.reset_view();
                Ok(())
            }
            PanelAction::Open | PanelAction::Save | PanelAction::Copy | PanelAction::SaveDefaults => Ok(()),
        };
        if let Err(e) = result {
            self.status = e.to_string();
        }
    }

    // -- Canvas --------------------------------------------------------------

    /// Translate this frame's egui events into board input.
    fn feed_events(&mut self, ctx: &egui::Context, rect: Rect) {
        let Some(board) = self.board.as_mut() else { return };
        let (events, hover) = ctx.input(|i| (i.events.clone(), i.pointer.hover_pos()));
        let now = Instant::now();
        // Touch screens also emit emulated pointer events; the touches win.
        let touching = !self.touches.is_empty() || events.iter().any(|e| matches!(e, egui::Event::Touch { .. }));
        let origin = rect.min.to_vec2();

        for event in events {
            let raw = match event {
                egui::Event::PointerButton { pos, button: egui::PointerButton::Primary, pressed, .. }
                    if !touching =>
                {
                    if pressed && !rect.contains(pos) {
                        continue;
                    }
                    let action = if pressed { MouseAction::Down } else { MouseAction::Up };
                    RawInput::Mouse { action, offset: Some(pos - origin) }
                }
                egui::Event::PointerMoved(pos) if !touching => RawInput::Mouse {
                    action: MouseAction::Move,
                    offset: Some(pos - origin),
                },
                egui::Event::Scroll(delta) => {
                    let Some(pos) = hover.filter(|p| rect.contains(*p)) else { continue };
                    if delta.y == 0.0 {
                        continue;
                    }
                    // egui scrolls positive when the wheel turns away from the user.
                    RawInput::Wheel { offset: pos - origin, delta_y: -delta.y }
                }
                egui::Event::Touch { id, phase, pos, .. } => {
                    let phase = match phase {
                        egui::TouchPhase::Start => {
                            if !rect.contains(pos) {
                                continue;
                            }
                            self.touches.push((id.0, pos));
                            TouchPhase::Start
                        }
                        egui::TouchPhase::Move => {
                            let Some(slot) = self.touches.iter_mut().find(|(t, _)| *t == id.0) else { continue };
                            slot.1 = pos;
                            TouchPhase::Move
                        }
                        egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                            let before = self.touches.len();
                            self.touches.retain(|(t, _)| *t != id.0);
                            if self.touches.len() == before {
                                continue;
                            }
                            if phase == egui::TouchPhase::End { TouchPhase::End } else { TouchPhase::Cancel }
                        }
                    };
                    RawInput::Touch {
                        phase,
                        list: RawTouchList {
                            target_origin: rect.min,
                            touches: self.touches.iter().map(|(_, p)| *p).collect(),
                        },
                    }
                }
                _ => continue,
            };
            board.handle_input(&raw, now);
        }
        board.tick(now);
        if let Some(deadline) = board.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }

    fn refresh_textures(&mut self, ctx: &egui::Context) {
        let Some(board) = self.board.as_mut() else { return };
        if !board.take_redraw_request() && self.textures.result.is_some() {
            return;
        }
        let generation = board.layers().generation();
        if self.textures.result_generation != Some(generation) {
            let result = board.get_canvas_result();
            self.textures.result = Some(ctx.load_texture("result", rgba_to_color_image(&result), TextureOptions::LINEAR));
            self.textures.result_generation = Some(generation);
        }
        self.textures.tool_mask = match board.tool_overlay() {
            Some(ToolOverlay::Mask { mask, color }) => Some(ctx.load_texture(
                "tool-mask",
                tinted_mask(mask, color::unpack(color), 110),
                TextureOptions::NEAREST,
            )),
            _ => None,
        };
        let selection_generation = board.selection().generation();
        if self.textures.selection_generation != Some(selection_generation) {
            self.textures.selection = board.selection().mask().map(|mask| {
                ctx.load_texture(
                    "selection",
                    tinted_mask(mask, Rgb { r: 70, g: 140, b: 255 }, 60),
                    TextureOptions::NEAREST,
                )
            });
            self.textures.selection_generation = Some(selection_generation);
        }
    }

    fn paint_canvas(&self, painter: &egui::Painter, rect: Rect) {
        painter.rect_filled(rect, 0.0, Color32::from_gray(32));
        let Some(board) = &self.board else { return };
        let origin = rect.min.to_vec2();
        let photo_rect = board.viewport().photo_rect(board.photo_size()).translate(origin);
        let full_uv = Rect::from_min_max(Pos2::ZERO, pos2(1.0, 1.0));
        for texture in [&self.textures.result, &self.textures.selection, &self.textures.tool_mask]
            .into_iter()
            .flatten()
        {
            painter.image(texture.id(), photo_rect, full_uv, Color32::WHITE);
        }

        let stroke = Stroke::new(1.5, Color32::WHITE);
        match board.tool_overlay() {
            Some(ToolOverlay::BrushCursor { center, radius }) => {
                painter.circle_stroke(center + origin, radius, stroke);
            }
            Some(ToolOverlay::Polygon { points }) => {
                let points: Vec<Pos2> = points.into_iter().map(|p| p + origin).collect();
                painter.add(Shape::line(points, stroke));
            }
            _ => {}
        }

        let glass = board.glass();
        if let (true, Some(frame), Some(source), Some(texture)) =
            (glass.is_visible(), glass.frame_rect(), glass.source_rect(), &self.textures.result)
        {
            let size = board.photo_size();
            let min = board.viewport().to_local(source.min);
            let max = board.viewport().to_local(source.max);
            let uv = Rect::from_min_max(pos2(min.x / size.x, min.y / size.y), pos2(max.x / size.x, max.y / size.y));
            let frame = frame.translate(origin);
            painter.rect_filled(frame, 0.0, Color32::BLACK);
            painter.image(texture.id(), frame, uv, Color32::WHITE);
            painter.rect_stroke(frame, 0.0, Stroke::new(2.0, Color32::WHITE));
        }
    }
}

impl eframe::App for MaskboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loading(ctx);

        let actions = egui::SidePanel::left("controls")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| egui::ScrollArea::vertical().show(ui, |ui| self.side_panel(ui)).inner)
            .inner;
        for action in actions {
            self.apply(action);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                let rect = response.rect;
                self.canvas_size = rect.size();
                self.feed_events(ctx, rect);
                self.refresh_textures(ctx);
                self.paint_canvas(&painter, rect);
            });
    }
}

fn mode_picker(
    ui: &mut egui::Ui,
    mode: PaintMode,
    actions: &mut Vec<PanelAction>,
    wrap: fn(PaintMode) -> PanelAction,
) {
    ui.horizontal(|ui| {
        if ui.selectable_label(mode == PaintMode::Add, "Add").clicked() {
            actions.push(wrap(PaintMode::Add));
        }
        if ui.selectable_label(mode == PaintMode::Remove, "Remove").clicked() {
            actions.push(wrap(PaintMode::Remove));
        }
    });
}

fn rgba_to_color_image(img: &RgbaImage) -> ColorImage {
    ColorImage::from_rgba_unmultiplied([img.width() as usize, img.height() as usize], img.as_raw())
}

/// Mask coverage as a translucent color, `max_alpha` at full coverage.
fn tinted_mask(mask: &GrayImage, tint: Rgb, max_alpha: u8) -> ColorImage {
    let pixels = mask
        .pixels()
        .map(|p| {
            let a = (p.0[0] as u32 * max_alpha as u32 / 255) as u8;
            Color32::from_rgba_unmultiplied(tint.r, tint.g, tint.b, a)
        })
        .collect();
    ColorImage {
        size: [mask.width() as usize, mask.height() as usize],
        pixels,
    }
}

/// Write an RGBA image to the system clipboard.
fn copy_to_clipboard(img: &RgbaImage) {
    match arboard::Clipboard::new() {
        Ok(mut clip) => {
            let data = arboard::ImageData {
                width: img.width() as usize,
                height: img.height() as usize,
                bytes: std::borrow::Cow::Borrowed(img.as_raw()),
            };
            if let Err(e) = clip.set_image(data) {
                log_warn!("Clipboard rejected the image: {}", e);
            }
        }
        Err(e) => {
            log_warn!("Clipboard unavailable: {}", e);
        }
    }
}
