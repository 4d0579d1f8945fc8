//! Parameter and state descriptors exchanged during host enumeration.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Parameter hint bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterHints(u32);

impl ParameterHints {
    pub const NONE: Self = Self(0);
    pub const AUTOMATABLE: Self = Self(0x01);
    pub const BOOLEAN: Self = Self(0x02);
    pub const INTEGER: Self = Self(0x04);
    pub const LOGARITHMIC: Self = Self(0x08);
    pub const OUTPUT: Self = Self(0x10);
    /// Trigger parameters are always boolean.
    pub const TRIGGER: Self = Self(0x20 | 0x02);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ParameterHints {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ParameterHints {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRanges {
    pub def: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            def: 0.0,
            min: 0.0,
            max: 1.0,
        }
    }
}

impl ParameterRanges {
    pub fn new(def: f32, min: f32, max: f32) -> Self {
        Self { def, min, max }
    }

    /// Requires `min <= def <= max`.
    pub fn validate(&self, index: u32) -> Result<()> {
        if self.min <= self.def && self.def <= self.max {
            Ok(())
        } else {
            Err(BridgeError::InvalidRange {
                index,
                min: self.min,
                def: self.def,
                max: self.max,
            })
        }
    }

    /// Clamp `value` into `min..=max`. Inverted or NaN bounds yield `min`.
    pub fn clamp(&self, value: f32) -> f32 {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Map a plain value into 0..1.
    pub fn normalized(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span.is_nan() || span <= 0.0 {
            return 0.0;
        }
        ((self.clamp(value) - self.min) / span).clamp(0.0, 1.0)
    }
}

/// A parameter as declared by the DSP unit for one index.
///
/// An empty name marks an index past the last parameter; hosts enumerating
/// without a known count stop there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub index: u32,
    pub hints: ParameterHints,
    pub name: String,
    pub ranges: ParameterRanges,
}

impl ParameterDescriptor {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            hints: ParameterHints::AUTOMATABLE,
            name: name.into(),
            ranges: ParameterRanges::default(),
        }
    }

    pub fn hints(mut self, hints: ParameterHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn ranges(mut self, def: f32, min: f32, max: f32) -> Self {
        self.ranges = ParameterRanges::new(def, min, max);
        self
    }

    /// Descriptor returned for indices the unit does not declare.
    pub fn terminator(index: u32) -> Self {
        Self {
            index,
            hints: ParameterHints::NONE,
            name: String::new(),
            ranges: ParameterRanges::default(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.name.is_empty()
    }
}

/// Free-form string state, round-tripped opaquely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub key: String,
    pub value: String,
}

impl StateEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.key.is_empty()
    }
}
