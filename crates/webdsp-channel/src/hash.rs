//! djb2-style function name hash used by the binary protocol.
//!
//! `h = 5381; h = h * 33 ^ unit` over the UTF-16 code units of the name, with
//! 32-bit wrapping arithmetic. Browsers compute the same value as a signed
//! 32-bit integer, so on the wire it is carried as the `i32` with the same
//! bits. Encoder and decoder both go through [`FunctionKey`].

use serde::{Deserialize, Serialize};
use std::fmt;

const SEED: u32 = 5381;

pub fn djb2(name: &str) -> u32 {
    name.encode_utf16()
        .fold(SEED, |h, unit| h.wrapping_mul(33) ^ u32::from(unit))
}

/// Hash of a remote function name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionKey(pub u32);

impl FunctionKey {
    pub fn of(name: &str) -> Self {
        Self(djb2(name))
    }

    /// Reinterpret a wire value.
    pub fn from_wire(value: i32) -> Self {
        Self(value as u32)
    }

    pub fn to_wire(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}
