//! Raw host events and their normalization into surface-relative samples.

use egui::{Pos2, Vec2};

/// Where a pointer sample came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    /// The only finger on the surface.
    Touch,
    /// First finger of a two-finger contact.
    PinchA,
    /// Second finger of a two-finger contact.
    PinchB,
}

/// A pointer position in rendering-surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub pos: Pos2,
    pub source: PointerSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// The touches currently on the target, in client coordinates, plus the
/// target's bounding-rect origin in the same space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTouchList {
    pub target_origin: Pos2,
    pub touches: Vec<Pos2>,
}

/// Input as delivered by the host, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum RawInput {
    /// Mouse button/motion; `offset` is already relative to the surface.
    /// `None` on `Up` means the release had no usable position.
    Mouse { action: MouseAction, offset: Option<Pos2> },
    /// Wheel with its vertical delta (negative = away from the user).
    Wheel { offset: Pos2, delta_y: f32 },
    Touch { phase: TouchPhase, list: RawTouchList },
}

/// Canonical pointer input consumed by the gesture state machine.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerInput {
    Mouse { action: MouseAction, sample: Option<PointerSample> },
    Wheel { sample: PointerSample, delta_y: f32 },
    /// `count` is the number of live touches; `samples` holds at most the
    /// first two of them.
    Touch { phase: TouchPhase, count: usize, samples: Vec<PointerSample> },
}

pub fn normalize(raw: &RawInput) -> PointerInput {
    match raw {
        RawInput::Mouse { action, offset } => PointerInput::Mouse {
            action: *action,
            sample: offset.map(|pos| PointerSample { pos, source: PointerSource::Mouse }),
        },
        RawInput::Wheel { offset, delta_y } => PointerInput::Wheel {
            sample: PointerSample { pos: *offset, source: PointerSource::Mouse },
            delta_y: *delta_y,
        },
        RawInput::Touch { phase, list } => PointerInput::Touch {
            phase: *phase,
            count: list.touches.len(),
            samples: touch_samples(list),
        },
    }
}

/// `touch.client - target.origin` for the first two touches.
pub fn touch_samples(list: &RawTouchList) -> Vec<PointerSample> {
    let origin: Vec2 = list.target_origin.to_vec2();
    let single = list.touches.len() == 1;
    list.touches
        .iter()
        .take(2)
        .enumerate()
        .map(|(i, client)| PointerSample {
            pos: *client - origin,
            source: match (single, i) {
                (true, _) => PointerSource::Touch,
                (false, 0) => PointerSource::PinchA,
                (false, _) => PointerSource::PinchB,
            },
        })
        .collect()
}
