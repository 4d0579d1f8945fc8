//! Corner resize handle.
//!
//! Turns drag gestures into UI sizes clamped between a minimum and maximum,
//! optionally locked to the aspect ratio of the minimum size.

use crate::gesture::ControlEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeConfig {
    pub min_width: f64,
    pub min_height: f64,

    /// Ignored when `max_scale` is positive. Zero or less means unbounded.
    pub max_width: f64,
    pub max_height: f64,

    /// Maximum size as a multiple of the minimum size
    pub max_scale: f64,

    /// Lock to `min_width / min_height`
    pub keep_aspect_ratio: bool,

    /// Multiplier applied to pointer deltas
    pub accel: f64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            min_width: 100.0,
            min_height: 100.0,
            max_width: 0.0,
            max_height: 0.0,
            max_scale: 2.0,
            keep_aspect_ratio: false,
            accel: 1.0,
        }
    }
}

impl ResizeConfig {
    pub fn min_size(mut self, width: f64, height: f64) -> Self {
        self.min_width = width;
        self.min_height = height;
        self
    }

    /// Fixed maximum size. Clears `max_scale`.
    pub fn max_size(mut self, width: f64, height: f64) -> Self {
        self.max_width = width;
        self.max_height = height;
        self.max_scale = 0.0;
        self
    }

    pub fn max_scale(mut self, scale: f64) -> Self {
        self.max_scale = scale;
        self
    }

    pub fn keep_aspect_ratio(mut self, keep: bool) -> Self {
        self.keep_aspect_ratio = keep;
        self
    }

    pub fn accel(mut self, accel: f64) -> Self {
        self.accel = accel;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResizeHandle {
    config: ResizeConfig,
    max_width: f64,
    max_height: f64,
    aspect_ratio: f64,
    current: Size,
}

impl ResizeHandle {
    pub fn new(config: ResizeConfig) -> Self {
        let (max_width, max_height) = if config.max_scale > 0.0 {
            (
                config.max_scale * config.min_width,
                config.max_scale * config.min_height,
            )
        } else {
            (config.max_width, config.max_height)
        };
        let aspect_ratio = if config.min_height > 0.0 {
            config.min_width / config.min_height
        } else {
            1.0
        };

        Self {
            config,
            max_width,
            max_height,
            aspect_ratio,
            current: Size::default(),
        }
    }

    pub fn config(&self) -> &ResizeConfig {
        &self.config
    }

    /// Effective maximum size; zero on an axis means unbounded.
    pub fn max_size(&self) -> Size {
        Size::new(self.max_width, self.max_height)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn current(&self) -> Size {
        self.current
    }

    /// Start a drag from the UI's current size.
    pub fn grab(&mut self, width: f64, height: f64) {
        self.current = Size::new(width, height);
    }

    /// Apply a pointer delta. Returns the new size when it changed.
    pub fn drag(&mut self, delta_x: f64, delta_y: f64) -> Option<Size> {
        let delta_x = delta_x * self.config.accel;
        let delta_y = delta_y * self.config.accel;

        let mut width = clamp(
            self.current.width + delta_x,
            self.config.min_width,
            self.max_width,
        );
        let mut height = clamp(
            self.current.height + delta_y,
            self.config.min_height,
            self.max_height,
        );

        if self.config.keep_aspect_ratio {
            if delta_x > delta_y {
                height = width / self.aspect_ratio;
            } else {
                width = height * self.aspect_ratio;
            }
        }

        let size = Size::new(width, height);
        if size == self.current {
            return None;
        }
        self.current = size;
        Some(size)
    }

    /// Drive the handle from normalized gestures. `current` is the UI size
    /// when a gesture starts.
    pub fn handle(&mut self, event: &ControlEvent, current: Size) -> Option<Size> {
        match *event {
            ControlEvent::Start { .. } => {
                self.grab(current.width, current.height);
                None
            }
            ControlEvent::Continue {
                delta_x, delta_y, ..
            } => self.drag(delta_x, delta_y),
            ControlEvent::End { .. } => None,
        }
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    let upper = if max > 0.0 { value.min(max) } else { value };
    upper.max(min)
}
