//! The two sides of the bridge: the sandboxed DSP unit and the host.

use crate::buffer::AudioBlock;
use crate::descriptor::{ParameterDescriptor, StateEntry};
use crate::metadata::PluginMetadata;
use crate::midi::MidiEvent;

/// Functions the host provides to the DSP unit.
pub trait Host {
    fn sample_rate(&self) -> f32;

    /// Send a MIDI event out of the unit. Returns `false` when the host has
    /// no MIDI output.
    fn write_midi_event(&mut self, _event: &MidiEvent) -> bool {
        false
    }
}

/// A user DSP implementation behind the bridge.
///
/// Parameter and state indices are dense and 0-based. Returning `None` from an
/// enumeration method marks the index as past the end.
pub trait DspPlugin {
    fn metadata(&self) -> PluginMetadata;

    fn parameter_count(&self) -> u32 {
        0
    }

    fn init_parameter(&self, _index: u32) -> Option<ParameterDescriptor> {
        None
    }

    fn parameter_value(&self, _index: u32) -> f32 {
        0.0
    }

    fn set_parameter_value(&mut self, _index: u32, _value: f32) {}

    fn state_count(&self) -> u32 {
        0
    }

    /// Key and default value for a state index.
    fn init_state(&self, _index: u32) -> Option<StateEntry> {
        None
    }

    fn set_state(&mut self, _key: &str, _value: &str) {}

    fn get_state(&self, _key: &str) -> Option<String> {
        None
    }

    fn program_count(&self) -> u32 {
        0
    }

    fn init_program_name(&self, _index: u32) -> Option<String> {
        None
    }

    fn load_program(&mut self, _index: u32) {}

    fn activate(&mut self, _host: &mut dyn Host) {}

    fn deactivate(&mut self) {}

    /// Process one block.
    ///
    /// Runs on the host's audio thread: must not allocate, block or do I/O.
    fn run(&mut self, block: &mut AudioBlock<'_>, midi: &[MidiEvent], host: &mut dyn Host);
}

/// Host with a fixed sample rate that collects outgoing MIDI.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    pub sample_rate: f32,
    pub midi_out: Vec<MidiEvent>,
    pub accepts_midi: bool,
}

impl StaticHost {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            midi_out: Vec::new(),
            accepts_midi: false,
        }
    }

    /// Accept MIDI written by the unit into `midi_out`.
    pub fn with_midi_output(mut self) -> Self {
        self.accepts_midi = true;
        self
    }
}

impl Host for StaticHost {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn write_midi_event(&mut self, event: &MidiEvent) -> bool {
        if self.accepts_midi {
            self.midi_out.push(*event);
        }
        self.accepts_midi
    }
}
