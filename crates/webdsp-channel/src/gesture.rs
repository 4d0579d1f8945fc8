//! Pointer input normalization.
//!
//! Mouse, touch and wheel input become one stream of
//! [`ControlEvent::Start`] / [`ControlEvent::Continue`] / [`ControlEvent::End`]
//! events, so controls such as knobs and resize handles only deal with
//! positions and deltas.
//!
//! The wheel has no natural start or end: the first notch starts a gesture,
//! every notch moves the position by one unit (two with shift), and the
//! gesture ends once the wheel has been idle for [`WHEEL_END_DELAY`]. Callers
//! drive that timeout with [`GestureTracker::poll_wheel_end`].

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const WHEEL_END_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Device a gesture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Mouse,
    Touch,
    Wheel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    MouseDown { position: Point, button: MouseButton },
    MouseMove { position: Point },
    MouseUp { position: Point, button: MouseButton },
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd,
    Wheel {
        position: Point,
        delta_x: f64,
        delta_y: f64,
        shift: bool,
        /// Platform reports natural (inverted) scrolling
        inverted: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    Start {
        position: Point,
        input: InputKind,
    },
    Continue {
        position: Point,
        delta_x: f64,
        delta_y: f64,
        input: InputKind,
    },
    /// Reports the last known position.
    End {
        position: Point,
        input: InputKind,
    },
}

impl ControlEvent {
    pub fn position(&self) -> Point {
        match self {
            ControlEvent::Start { position, .. }
            | ControlEvent::Continue { position, .. }
            | ControlEvent::End { position, .. } => *position,
        }
    }

    pub fn input(&self) -> InputKind {
        match self {
            ControlEvent::Start { input, .. }
            | ControlEvent::Continue { input, .. }
            | ControlEvent::End { input, .. } => *input,
        }
    }
}

#[derive(Debug, Default)]
pub struct GestureTracker {
    started: bool,
    previous: Point,
    mouse_captured: bool,
    wheel_deadline: Option<Instant>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// When the pending wheel gesture ends, if one is running.
    pub fn wheel_deadline(&self) -> Option<Instant> {
        self.wheel_deadline
    }

    /// Feed one input event. A wheel gesture whose idle timeout passed before
    /// `now` is ended first.
    pub fn handle(&mut self, input: PointerInput, now: Instant) -> Vec<ControlEvent> {
        let mut events: Vec<ControlEvent> = self.poll_wheel_end(now).into_iter().collect();

        match input {
            PointerInput::MouseDown { position, button } => {
                if button == MouseButton::Left {
                    self.mouse_captured = true;
                    events.push(self.start(position, InputKind::Mouse));
                }
            }
            PointerInput::MouseMove { position } => {
                if self.mouse_captured {
                    events.push(self.advance(position, InputKind::Mouse));
                }
            }
            PointerInput::MouseUp { .. } => {
                if self.mouse_captured {
                    self.mouse_captured = false;
                    events.push(self.end(InputKind::Mouse));
                }
            }
            PointerInput::TouchStart { touches } => {
                if let Some(&first) = touches.first() {
                    events.push(self.start(first, InputKind::Touch));
                }
            }
            PointerInput::TouchMove { touches } => {
                if let (true, Some(&first)) = (self.started, touches.first()) {
                    events.push(self.advance(first, InputKind::Touch));
                }
            }
            PointerInput::TouchEnd => {
                if self.started {
                    events.push(self.end(InputKind::Touch));
                }
            }
            PointerInput::Wheel {
                position,
                delta_x,
                delta_y,
                shift,
                inverted,
            } => {
                if !self.started {
                    events.push(self.start(position, InputKind::Wheel));
                }
                let k = if shift { 2.0 } else { 1.0 };
                let inv = if inverted { -1.0 } else { 1.0 };
                let step = k * inv;
                let target = Point::new(
                    self.previous.x + step * sign(delta_x),
                    self.previous.y + step * sign(delta_y),
                );
                events.push(self.advance(target, InputKind::Wheel));
                self.wheel_deadline = Some(now + WHEEL_END_DELAY);
            }
        }

        events
    }

    /// End the wheel gesture once it has been idle long enough.
    pub fn poll_wheel_end(&mut self, now: Instant) -> Option<ControlEvent> {
        let deadline = self.wheel_deadline?;
        if now < deadline {
            return None;
        }
        self.wheel_deadline = None;
        Some(self.end(InputKind::Wheel))
    }

    fn start(&mut self, position: Point, input: InputKind) -> ControlEvent {
        if input != InputKind::Wheel {
            self.wheel_deadline = None;
        }
        self.started = true;
        self.previous = position;
        ControlEvent::Start { position, input }
    }

    fn advance(&mut self, position: Point, input: InputKind) -> ControlEvent {
        let delta_x = position.x - self.previous.x;
        let delta_y = position.y - self.previous.y;
        self.previous = position;
        ControlEvent::Continue {
            position,
            delta_x,
            delta_y,
            input,
        }
    }

    fn end(&mut self, input: InputKind) -> ControlEvent {
        self.started = false;
        ControlEvent::End {
            position: self.previous,
            input,
        }
    }
}

/// -1, 0 or 1. Unlike `f64::signum`, zero maps to zero.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}
