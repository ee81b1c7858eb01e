//! Touch-cardinality state machine that tells paint strokes apart from
//! two-finger pinch/pan gestures.

use std::time::{Duration, Instant};

use egui::{Pos2, Vec2};

use crate::input::{MouseAction, PointerInput, PointerSample, TouchPhase};

/// What a piece of input resolved into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    PointerDown(Pos2),
    PointerMove(Pos2),
    /// `None` for releases without a position (touch end).
    PointerUp(Option<Pos2>),
    /// Wheel zoom, `delta < 0` zooms in.
    Zoom { delta: f32, anchor: Pos2 },
    /// Pinch step: `anchor` is the previous middle point.
    Pinch { movement: Vec2, scale_ratio: f32, anchor: Pos2 },
}

/// Live two-finger contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSession {
    pub middle_point: Pos2,
    pub distance: f32,
}

impl GestureSession {
    pub fn from_pair(a: Pos2, b: Pos2) -> Self {
        Self {
            middle_point: a.lerp(b, 0.5),
            distance: a.distance(b),
        }
    }
}

/// A single touch waiting to see whether a second finger follows.
#[derive(Clone, Copy, Debug, PartialEq)]
struct DeferredTap {
    deadline: Instant,
    pos: Pos2,
}

pub struct GestureStateMachine {
    tap_delay: Duration,
    pending_tap: Option<DeferredTap>,
    session: Option<GestureSession>,
    /// A deferred tap fired and the touch now paints; extra fingers are
    /// ignored until the touches end.
    painting_touch: bool,
}

impl GestureStateMachine {
    pub fn new(tap_delay: Duration) -> Self {
        Self {
            tap_delay,
            pending_tap: None,
            session: None,
            painting_touch: false,
        }
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    /// Deadline of the pending tap, so the host can schedule a wake-up.
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending_tap.map(|t| t.deadline)
    }

    /// Fire the deferred tap if its deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Option<GestureEvent> {
        let tap = self.pending_tap?;
        if now < tap.deadline {
            return None;
        }
        self.pending_tap = None;
        self.painting_touch = true;
        Some(GestureEvent::PointerDown(tap.pos))
    }

    pub fn feed(&mut self, input: &PointerInput, now: Instant) -> Vec<GestureEvent> {
        match input {
            PointerInput::Mouse { action, sample } => {
                let pos = sample.map(|s| s.pos);
                let event = match (action, pos) {
                    (MouseAction::Down, Some(p)) => Some(GestureEvent::PointerDown(p)),
                    (MouseAction::Move, Some(p)) => Some(GestureEvent::PointerMove(p)),
                    (MouseAction::Up, p) => Some(GestureEvent::PointerUp(p)),
                    _ => None,
                };
                event.into_iter().collect()
            }
            PointerInput::Wheel { sample, delta_y } => vec![GestureEvent::Zoom {
                delta: *delta_y,
                anchor: sample.pos,
            }],
            PointerInput::Touch { phase, count, samples } => {
                // An expired deadline fires before this event is looked at, as
                // it would have in real time.
                let mut out: Vec<GestureEvent> = self.tick(now).into_iter().collect();
                match phase {
                    TouchPhase::Start => self.touch_start(*count, samples, now),
                    TouchPhase::Move => self.touch_move(*count, samples, &mut out),
                    TouchPhase::End | TouchPhase::Cancel => self.touch_end(&mut out),
                }
                out
            }
        }
    }

    fn touch_start(&mut self, count: usize, samples: &[PointerSample], now: Instant) {
        if count == 1 {
            if let Some(first) = samples.first() {
                self.pending_tap = Some(DeferredTap {
                    deadline: now + self.tap_delay,
                    pos: first.pos,
                });
            }
            return;
        }
        // A second finger before the deadline means this is not a paint stroke.
        self.pending_tap = None;
        if self.painting_touch {
            return;
        }
        if count == 2 && samples.len() == 2 {
            self.session = Some(GestureSession::from_pair(samples[0].pos, samples[1].pos));
        }
    }

    fn touch_move(&mut self, count: usize, samples: &[PointerSample], out: &mut Vec<GestureEvent>) {
        if count == 1 || (self.painting_touch && count >= 1) {
            if let Some(first) = samples.first() {
                if let Some(tap) = self.pending_tap.as_mut() {
                    tap.pos = first.pos;
                }
                out.push(GestureEvent::PointerMove(first.pos));
            }
            return;
        }
        if count != 2 || samples.len() != 2 {
            return;
        }
        let Some(last) = self.session else { return };
        let next = GestureSession::from_pair(samples[0].pos, samples[1].pos);
        let scale_ratio = if last.distance > f32::EPSILON {
            next.distance / last.distance
        } else {
            1.0
        };
        out.push(GestureEvent::Pinch {
            movement: next.middle_point - last.middle_point,
            scale_ratio,
            anchor: last.middle_point,
        });
        self.session = Some(next);
    }

    fn touch_end(&mut self, out: &mut Vec<GestureEvent>) {
        // A tap shorter than the delay still paints a single dab.
        if let Some(tap) = self.pending_tap.take() {
            out.push(GestureEvent::PointerDown(tap.pos));
        }
        self.session = None;
        self.painting_touch = false;
        out.push(GestureEvent::PointerUp(None));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{PointerSource, RawInput, RawTouchList, normalize};
    use egui::pos2;

    fn touch(phase: TouchPhase, points: &[Pos2]) -> PointerInput {
        normalize(&RawInput::Touch {
            phase,
            list: RawTouchList { target_origin: Pos2::ZERO, touches: points.to_vec() },
        })
    }

    fn downs(events: &[GestureEvent]) -> usize {
        events.iter().filter(|e| matches!(e, GestureEvent::PointerDown(_))).count()
    }

    #[test]
    fn quick_second_touch_opens_pinch_without_paint() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        let mut events = gsm.feed(&touch(TouchPhase::Start, &[pos2(10.0, 10.0)]), t0);
        events.extend(gsm.feed(
            &touch(TouchPhase::Start, &[pos2(10.0, 10.0), pos2(30.0, 10.0)]),
            t0 + Duration::from_millis(40),
        ));
        events.extend(gsm.tick(t0 + Duration::from_millis(500)));
        assert_eq!(downs(&events), 0);
        assert_eq!(
            gsm.session(),
            Some(&GestureSession { middle_point: pos2(20.0, 10.0), distance: 20.0 })
        );
    }

    #[test]
    fn held_touch_paints_once_at_its_position() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        assert!(gsm.feed(&touch(TouchPhase::Start, &[pos2(5.0, 6.0)]), t0).is_empty());
        assert_eq!(gsm.tick(t0 + Duration::from_millis(99)), None);
        assert_eq!(
            gsm.tick(t0 + Duration::from_millis(100)),
            Some(GestureEvent::PointerDown(pos2(5.0, 6.0)))
        );
        assert_eq!(gsm.tick(t0 + Duration::from_millis(300)), None);
        assert!(gsm.session().is_none());
    }

    #[test]
    fn deferred_tap_uses_latest_position() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        gsm.feed(&touch(TouchPhase::Start, &[pos2(0.0, 0.0)]), t0);
        let moved = gsm.feed(&touch(TouchPhase::Move, &[pos2(4.0, 4.0)]), t0 + Duration::from_millis(20));
        assert_eq!(moved, vec![GestureEvent::PointerMove(pos2(4.0, 4.0))]);
        assert_eq!(
            gsm.tick(t0 + Duration::from_millis(120)),
            Some(GestureEvent::PointerDown(pos2(4.0, 4.0)))
        );
    }

    #[test]
    fn pinch_move_reports_ratio_and_midpoint_delta() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        gsm.feed(&touch(TouchPhase::Start, &[pos2(50.0, 100.0)]), t0);
        gsm.feed(&touch(TouchPhase::Start, &[pos2(50.0, 100.0), pos2(150.0, 100.0)]), t0);
        let events = gsm.feed(
            &touch(TouchPhase::Move, &[pos2(10.0, 110.0), pos2(210.0, 110.0)]),
            t0 + Duration::from_millis(10),
        );
        assert_eq!(
            events,
            vec![GestureEvent::Pinch {
                movement: egui::vec2(10.0, 10.0),
                scale_ratio: 2.0,
                anchor: pos2(100.0, 100.0),
            }]
        );
        assert_eq!(gsm.session().map(|s| s.distance), Some(200.0));
    }

    #[test]
    fn touch_end_clears_session_and_releases() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        gsm.feed(&touch(TouchPhase::Start, &[pos2(0.0, 0.0)]), t0);
        gsm.feed(&touch(TouchPhase::Start, &[pos2(0.0, 0.0), pos2(10.0, 0.0)]), t0);
        let events = gsm.feed(&touch(TouchPhase::End, &[]), t0 + Duration::from_millis(50));
        assert_eq!(events, vec![GestureEvent::PointerUp(None)]);
        assert!(gsm.session().is_none());
    }

    #[test]
    fn short_tap_paints_a_single_dab() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        gsm.feed(&touch(TouchPhase::Start, &[pos2(7.0, 7.0)]), t0);
        let events = gsm.feed(&touch(TouchPhase::End, &[]), t0 + Duration::from_millis(30));
        assert_eq!(
            events,
            vec![GestureEvent::PointerDown(pos2(7.0, 7.0)), GestureEvent::PointerUp(None)]
        );
        assert_eq!(gsm.pending_deadline(), None);
    }

    #[test]
    fn late_second_touch_is_ignored_while_painting() {
        let t0 = Instant::now();
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        gsm.feed(&touch(TouchPhase::Start, &[pos2(1.0, 1.0)]), t0);
        // The deadline has passed by the time the second finger is delivered.
        let events = gsm.feed(
            &touch(TouchPhase::Start, &[pos2(1.0, 1.0), pos2(50.0, 1.0)]),
            t0 + Duration::from_millis(150),
        );
        assert_eq!(events, vec![GestureEvent::PointerDown(pos2(1.0, 1.0))]);
        assert!(gsm.session().is_none());
        let moved = gsm.feed(
            &touch(TouchPhase::Move, &[pos2(2.0, 1.0), pos2(60.0, 1.0)]),
            t0 + Duration::from_millis(160),
        );
        assert_eq!(moved, vec![GestureEvent::PointerMove(pos2(2.0, 1.0))]);
    }

    #[test]
    fn wheel_becomes_zoom_request() {
        let mut gsm = GestureStateMachine::new(Duration::from_millis(100));
        let events = gsm.feed(
            &PointerInput::Wheel {
                sample: PointerSample { pos: pos2(3.0, 4.0), source: PointerSource::Mouse },
                delta_y: -12.0,
            },
            Instant::now(),
        );
        assert_eq!(events, vec![GestureEvent::Zoom { delta: -12.0, anchor: pos2(3.0, 4.0) }]);
    }
}
