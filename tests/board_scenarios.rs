// Controller scenarios driven only through the public API.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use egui::{Pos2, pos2, vec2};
use image::{Rgba, RgbaImage};

use maskboard::input::{MouseAction, RawInput, RawTouchList, TouchPhase};
use maskboard::layers::LayerId;
use maskboard::settings::BoardSettings;
use maskboard::tools::{Tool, ToolContext, ToolRegistry};
use maskboard::{BoardController, BoardError, BoardRequest, ToolId, ToolValues};

fn gray_board() -> BoardController {
    let photo = RgbaImage::from_pixel(100, 50, Rgba([120, 120, 120, 255]));
    BoardController::from_photo(photo, vec2(200.0, 100.0), BoardSettings::default())
}

fn touches(phase: TouchPhase, points: &[Pos2]) -> RawInput {
    RawInput::Touch {
        phase,
        list: RawTouchList {
            target_origin: Pos2::ZERO,
            touches: points.to_vec(),
        },
    }
}

#[test]
fn load_select_level_and_tolerance() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("photo.png");
    RgbaImage::from_pixel(64, 32, Rgba([10, 200, 30, 255]))
        .save(&path)
        .expect("write png");

    let mut board =
        BoardController::load_image(&path, vec2(128.0, 64.0), None, BoardSettings::default()).expect("load");
    assert_eq!(board.photo().dimensions(), (64, 32));
    assert_eq!(board.viewport().scale(), 2.0);

    let added = board.add_layer();
    assert_eq!(added.id, 0);
    let selected = board.select_layer(0).expect("select");
    assert_eq!(selected.name, "layer 0");

    let info = board.set_black_level_to_selected_layer(50.0).expect("black level");
    assert_eq!(info.black_level, 0.5);

    board.set_magic_wand_tolerance(30).expect("tolerance");
    match board.get_tools_values().get(&ToolId::MagicWand) {
        Some(ToolValues::MagicWand { tolerance, .. }) => assert_eq!(*tolerance, 30),
        other => panic!("unexpected wand values: {:?}", other),
    }
}

#[test]
fn load_downsamples_to_max_size() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("wide.png");
    RgbaImage::from_pixel(400, 100, Rgba([0, 0, 0, 255]))
        .save(&path)
        .expect("write png");
    let board =
        BoardController::load_image(&path, vec2(100.0, 100.0), Some(200), BoardSettings::default()).expect("load");
    assert_eq!(board.photo().dimensions(), (200, 50));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = BoardController::load_image(
        &dir.path().join("nope.png"),
        vec2(100.0, 100.0),
        None,
        BoardSettings::default(),
    );
    assert!(matches!(result, Err(BoardError::Io(_))));
}

#[test]
fn pinch_from_100_to_200_doubles_the_scale() {
    let mut board = gray_board();
    let before = board.viewport().scale();
    let t0 = Instant::now();

    board.handle_input(&touches(TouchPhase::Start, &[pos2(50.0, 50.0)]), t0);
    let pair = [pos2(50.0, 50.0), pos2(150.0, 50.0)];
    board.handle_input(&touches(TouchPhase::Start, &pair), t0 + Duration::from_millis(20));
    let spread = [pos2(0.0, 50.0), pos2(200.0, 50.0)];
    board.handle_input(&touches(TouchPhase::Move, &spread), t0 + Duration::from_millis(40));

    assert!((board.viewport().scale() - before * 2.0).abs() < 1e-5);
    // The middle point stayed at (100, 50), so the content under it did too.
    let anchor = pos2(100.0, 50.0);
    assert!((board.viewport().to_global(pos2(50.0, 25.0)) - anchor).length() < 1e-3);

    board.handle_input(&touches(TouchPhase::End, &[]), t0 + Duration::from_millis(60));
    board.tick(t0 + Duration::from_millis(500));
    assert!(board.next_deadline().is_none());
}

#[test]
fn layer_ids_are_sequential_and_resolvable() {
    let mut board = gray_board();
    for expected in 0..6 {
        assert_eq!(board.add_layer().id, expected);
    }
    for id in 0..6 {
        assert!(board.layers().find_layer(id).is_some());
    }
    assert_eq!(board.layers().selected_id(), Some(5));
    assert!(matches!(board.select_layer(6), Err(BoardError::LayerNotFound(6))));
}

#[test]
fn hue_saturation_brightness_round_trip() {
    let mut board = gray_board();
    board.add_layer();
    for h in 0..360 {
        let info = board.set_hue_to_selected_layer(h).expect("hue");
        assert_eq!(info.hsv_color.h, h, "hue {}", h);
    }
    // Keep a hue with full chroma so saturation and value stay observable.
    board.set_color_to_selected_layer(0xff0000).expect("color");
    for s in 0..=100 {
        let info = board.set_saturation_to_selected_layer(s).expect("saturation");
        assert_eq!(info.hsv_color.s, s, "saturation {}", s);
        board.set_saturation_to_selected_layer(100).expect("reset saturation");
    }
    for v in 0..=100 {
        let info = board.set_brightness_to_selected_layer(v).expect("brightness");
        assert_eq!(info.hsv_color.v, v, "brightness {}", v);
        board.set_brightness_to_selected_layer(100).expect("reset brightness");
    }
}

#[test]
fn hue_survives_desaturated_and_dark_colors() {
    let mut board = gray_board();
    board.add_layer();

    board.set_saturation_to_selected_layer(0).expect("saturation");
    let info = board.set_hue_to_selected_layer(200).expect("hue");
    assert_eq!((info.hsv_color.h, info.hsv_color.s), (200, 0));
    let info = board.set_saturation_to_selected_layer(100).expect("saturation");
    assert_eq!(info.hsv_color.h, 200);

    board.set_saturation_to_selected_layer(30).expect("saturation");
    board.set_brightness_to_selected_layer(40).expect("brightness");
    for h in 0..360 {
        let info = board.set_hue_to_selected_layer(h).expect("hue");
        assert_eq!(info.hsv_color.h, h, "hue {}", h);
        assert_eq!((info.hsv_color.s, info.hsv_color.v), (30, 40), "hue {}", h);
    }

    // Brightness 0 is black, but the hue and saturation are kept.
    board.set_brightness_to_selected_layer(0).expect("brightness");
    let info = board.set_brightness_to_selected_layer(100).expect("brightness");
    assert_eq!((info.hsv_color.h, info.hsv_color.s), (359, 30));
}

#[test]
fn layer_setters_without_selection_fail() {
    let mut board = gray_board();
    assert!(matches!(
        board.set_white_level_to_selected_layer(10.0),
        Err(BoardError::NoLayerSelected)
    ));
    assert!(matches!(board.apply_magic_wand_to_selected_layer(), Err(BoardError::NoLayerSelected)));
}

type Journal = Rc<RefCell<Vec<String>>>;

/// Logs every hook it receives; optionally asks for another layer on release.
struct Recorder {
    id: ToolId,
    armed: bool,
    journal: Journal,
    select_on_release: Option<LayerId>,
}

impl Recorder {
    fn boxed(id: ToolId, journal: &Journal) -> Box<Self> {
        Box::new(Self {
            id,
            armed: false,
            journal: journal.clone(),
            select_on_release: None,
        })
    }
}

impl Tool for Recorder {
    fn id(&self) -> ToolId {
        self.id
    }

    fn set_active(&mut self, _ctx: &mut ToolContext<'_>, layer: Option<LayerId>, view_scale: f32) {
        self.armed = layer.is_some();
        self.journal
            .borrow_mut()
            .push(format!("{} {:?} {:.2}", self.id.name(), layer, view_scale));
    }

    fn is_active(&self) -> bool {
        self.armed
    }

    fn pointer_down(&mut self, _ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {}

    fn pointer_move(&mut self, _ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {}

    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, _pos: Option<Pos2>) {
        if let Some(id) = self.select_on_release {
            ctx.request(BoardRequest::SelectLayer(id));
            self.journal
                .borrow_mut()
                .push(format!("release on {:?}", ctx.layers.selected_id()));
        }
    }

    fn on_view_scale_change(&mut self, _ctx: &mut ToolContext<'_>, scale: f32) {
        self.journal.borrow_mut().push(format!("scale {:.2}", scale));
    }

    fn on_selected_layer_props_change(&mut self, _ctx: &mut ToolContext<'_>) {
        self.journal.borrow_mut().push("props".to_string());
    }
}

fn recorded_board(registry: ToolRegistry) -> BoardController {
    let photo = RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 255]));
    BoardController::with_registry(photo, vec2(200.0, 100.0), BoardSettings::default(), registry)
}

#[test]
fn switching_tools_deactivates_the_previous_one_first() {
    let journal: Journal = Rc::default();
    let mut registry = ToolRegistry::new();
    for id in [ToolId::Brush, ToolId::MagicWand] {
        registry.insert(Recorder::boxed(id, &journal));
    }
    let mut board = recorded_board(registry);
    board.add_layer();
    journal.borrow_mut().clear();

    board.set_tool(Some(ToolId::Brush)).expect("brush");
    board.set_tool(Some(ToolId::MagicWand)).expect("wand");
    assert_eq!(
        *journal.borrow(),
        vec!["brush Some(0) 2.00", "brush None 2.00", "magic wand Some(0) 2.00"]
    );
    assert_eq!(board.active_tool(), Some(ToolId::MagicWand));

    assert!(matches!(
        board.set_tool(Some(ToolId::Polygon)),
        Err(BoardError::ToolNotRegistered(ToolId::Polygon))
    ));
}

#[test]
fn layer_change_requested_by_a_tool_applies_after_dispatch() {
    let journal: Journal = Rc::default();
    let mut registry = ToolRegistry::new();
    let mut recorder = Recorder::boxed(ToolId::Brush, &journal);
    recorder.select_on_release = Some(1);
    registry.insert(recorder);
    let mut board = recorded_board(registry);
    board.add_layer();
    board.add_layer();
    board.select_layer(0).expect("select");
    board.set_tool(Some(ToolId::Brush)).expect("brush");
    journal.borrow_mut().clear();

    let t = Instant::now();
    board.handle_input(&RawInput::Mouse { action: MouseAction::Down, offset: Some(pos2(10.0, 10.0)) }, t);
    board.handle_input(&RawInput::Mouse { action: MouseAction::Up, offset: Some(pos2(10.0, 10.0)) }, t);

    // The tool still saw layer 0 while handling the release.
    assert_eq!(*journal.borrow(), vec!["release on Some(0)", "brush Some(1) 2.00"]);
    assert_eq!(board.layers().selected_id(), Some(1));
    assert!(board.take_redraw_request());
}

#[test]
fn active_tool_hears_layer_and_view_changes() {
    let journal: Journal = Rc::default();
    let mut registry = ToolRegistry::new();
    registry.insert(Recorder::boxed(ToolId::Brush, &journal));
    let mut board = recorded_board(registry);
    board.add_layer();
    board.set_tool(Some(ToolId::Brush)).expect("brush");
    journal.borrow_mut().clear();

    board.set_black_level_to_selected_layer(30.0).expect("black level");
    board.set_color_to_selected_layer(0x00ff00).expect("color");
    board.set_hue_to_selected_layer(10).expect("hue");

    let t0 = Instant::now();
    board.handle_input(&RawInput::Wheel { offset: pos2(100.0, 50.0), delta_y: -50.0 }, t0);
    let after_wheel = board.viewport().scale();
    assert!((after_wheel - 2.5).abs() < 1e-4);

    board.handle_input(&touches(TouchPhase::Start, &[pos2(50.0, 50.0)]), t0);
    let pair = [pos2(50.0, 50.0), pos2(150.0, 50.0)];
    board.handle_input(&touches(TouchPhase::Start, &pair), t0 + Duration::from_millis(20));
    let spread = [pos2(0.0, 50.0), pos2(200.0, 50.0)];
    board.handle_input(&touches(TouchPhase::Move, &spread), t0 + Duration::from_millis(40));
    assert!((board.viewport().scale() - after_wheel * 2.0).abs() < 1e-4);
    board.handle_input(&touches(TouchPhase::End, &[]), t0 + Duration::from_millis(60));

    board.reset_view();

    assert_eq!(
        *journal.borrow(),
        vec!["props", "props", "props", "scale 2.50", "scale 5.00", "scale 2.00"]
    );
}

#[test]
fn composite_is_photo_sized() {
    let mut board = gray_board();
    board.add_layer();
    let result = board.get_canvas_result();
    assert_eq!(result.dimensions(), board.photo().dimensions());
    assert_eq!(*result.get_pixel(10, 10), Rgba([120, 120, 120, 255]));
}
