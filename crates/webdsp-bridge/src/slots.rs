//! Return slots for the C ABI.
//!
//! The module boundary only carries single scalar returns, so entry points that
//! produce several values (a parameter descriptor, a state key and its default)
//! leave them in these cells. The host reads them immediately after the call;
//! the next call overwrites them. The same layout doubles as the argument area
//! for passing strings from the host into the module.

use std::ffi::{c_char, CStr};

pub const SLOT_COUNT: usize = 4;

/// Capacity of a string slot, including the terminating null byte.
pub const STRING_SLOT_BYTES: usize = 1024;

#[repr(C)]
pub struct ReturnSlots {
    ints: [i32; SLOT_COUNT],
    floats: [f32; SLOT_COUNT],
    strings: [[u8; STRING_SLOT_BYTES]; SLOT_COUNT],
}

impl Default for ReturnSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl ReturnSlots {
    pub fn new() -> Self {
        Self {
            ints: [0; SLOT_COUNT],
            floats: [0.0; SLOT_COUNT],
            strings: [[0; STRING_SLOT_BYTES]; SLOT_COUNT],
        }
    }

    pub fn set_int(&mut self, slot: usize, value: i32) {
        if let Some(cell) = self.ints.get_mut(slot) {
            *cell = value;
        }
    }

    pub fn int(&self, slot: usize) -> i32 {
        self.ints.get(slot).copied().unwrap_or(0)
    }

    pub fn set_float(&mut self, slot: usize, value: f32) {
        if let Some(cell) = self.floats.get_mut(slot) {
            *cell = value;
        }
    }

    pub fn float(&self, slot: usize) -> f32 {
        self.floats.get(slot).copied().unwrap_or(0.0)
    }

    /// Store `value` null-terminated. Truncates on a char boundary when it
    /// does not fit. Never allocates.
    pub fn set_str(&mut self, slot: usize, value: &str) {
        let Some(cell) = self.strings.get_mut(slot) else {
            return;
        };

        let mut end = value.len().min(STRING_SLOT_BYTES - 1);
        while !value.is_char_boundary(end) {
            end -= 1;
        }

        cell[..end].copy_from_slice(&value.as_bytes()[..end]);
        cell[end] = 0;
    }

    /// Slot contents up to the first null byte.
    pub fn c_str(&self, slot: usize) -> &CStr {
        self.strings
            .get(slot)
            .and_then(|cell| CStr::from_bytes_until_nul(cell).ok())
            .unwrap_or_default()
    }

    /// Address of a string cell, as handed across the C ABI.
    pub fn str_ptr(&self, slot: usize) -> *const c_char {
        self.c_str(slot).as_ptr()
    }

    pub fn str(&self, slot: usize) -> &str {
        self.c_str(slot).to_str().unwrap_or("")
    }

    /// Raw cell for hosts writing string arguments into module memory.
    pub fn string_cell_mut(&mut self, slot: usize) -> Option<&mut [u8; STRING_SLOT_BYTES]> {
        self.strings.get_mut(slot)
    }

    pub fn clear(&mut self) {
        self.ints = [0; SLOT_COUNT];
        self.floats = [0.0; SLOT_COUNT];
        for cell in &mut self.strings {
            cell[0] = 0;
        }
    }
}
