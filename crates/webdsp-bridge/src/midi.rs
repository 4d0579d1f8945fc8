//! Raw MIDI events crossing the bridge.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Events the host may queue for a single block before further events are dropped.
pub const MIDI_QUEUE_CAPACITY: usize = 256;

pub type MidiEventVec = SmallVec<[MidiEvent; MIDI_QUEUE_CAPACITY]>;

/// A MIDI message at a frame offset within the current block.
///
/// `data` holds the status byte, two data bytes and a reserved byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub frame: u32,
    pub data: [u8; 4],
}

impl MidiEvent {
    pub const fn new(frame: u32, data: [u8; 4]) -> Self {
        Self { frame, data }
    }

    /// Copies up to four bytes, zero-filling the rest.
    pub fn from_bytes(frame: u32, bytes: &[u8]) -> Self {
        let mut data = [0u8; 4];
        let len = bytes.len().min(4);
        data[..len].copy_from_slice(&bytes[..len]);
        Self { frame, data }
    }

    /// Big-endian packing used by the C ABI.
    pub const fn from_packed(frame: u32, packed: u32) -> Self {
        Self {
            frame,
            data: packed.to_be_bytes(),
        }
    }

    pub const fn packed(&self) -> u32 {
        u32::from_be_bytes(self.data)
    }

    pub fn note_on(frame: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(frame, [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F, 0])
    }

    pub fn note_off(frame: u32, channel: u8, note: u8) -> Self {
        Self::new(frame, [0x80 | (channel & 0x0F), note & 0x7F, 0, 0])
    }

    pub fn status(&self) -> u8 {
        self.data[0]
    }

    pub fn channel(&self) -> u8 {
        self.data[0] & 0x0F
    }

    /// A note-on with zero velocity counts as note-off.
    pub fn is_note_on(&self) -> bool {
        self.data[0] & 0xF0 == 0x90 && self.data[2] > 0
    }

    pub fn is_note_off(&self) -> bool {
        let kind = self.data[0] & 0xF0;
        kind == 0x80 || (kind == 0x90 && self.data[2] == 0)
    }

    pub fn note(&self) -> Option<u8> {
        matches!(self.data[0] & 0xF0, 0x80 | 0x90 | 0xA0).then_some(self.data[1])
    }

    pub fn velocity(&self) -> Option<u8> {
        matches!(self.data[0] & 0xF0, 0x80 | 0x90).then_some(self.data[2])
    }
}
