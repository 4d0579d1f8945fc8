//! Entry points the host calls, delegating into one long-lived DSP instance.
//!
//! The dispatcher is the single context object behind the C ABI: it owns the
//! plugin, the host handle, the block regions, the return slots and the MIDI
//! queue for the next block. Every multi-valued result is returned as a plain
//! struct and mirrored into the return slots for hosts on the other side of a
//! module boundary.

use crate::buffer::BufferRegions;
use crate::descriptor::{ParameterDescriptor, StateEntry};
use crate::error::{BridgeError, Lifecycle, Result};
use crate::metadata::{AudioIO, PluginMetadata};
use crate::midi::{MidiEvent, MidiEventVec, MIDI_QUEUE_CAPACITY};
use crate::plugin::{DspPlugin, Host};
use crate::slots::ReturnSlots;
use std::ffi::CStr;

pub struct Dispatcher<P: DspPlugin, H: Host> {
    plugin: P,
    host: H,
    metadata: PluginMetadata,
    io: AudioIO,
    state: Lifecycle,
    regions: BufferRegions,
    slots: Box<ReturnSlots>,
    args: Box<ReturnSlots>,
    midi: MidiEventVec,
}

impl<P: DspPlugin, H: Host> Dispatcher<P, H> {
    pub fn new(plugin: P, host: H) -> Self {
        let metadata = plugin.metadata();
        let io = metadata.audio_io;

        tracing::debug!(
            "Bridging {} ({} in / {} out)",
            metadata.label,
            io.inputs,
            io.outputs
        );

        Self {
            plugin,
            host,
            metadata,
            io,
            state: Lifecycle::Uninitialized,
            regions: BufferRegions::new(),
            slots: Box::default(),
            args: Box::default(),
            midi: MidiEventVec::new(),
        }
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn io(&self) -> AudioIO {
        self.io
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn plugin_mut(&mut self) -> &mut P {
        &mut self.plugin
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn regions(&self) -> &BufferRegions {
        &self.regions
    }

    pub fn regions_mut(&mut self) -> &mut BufferRegions {
        &mut self.regions
    }

    /// Results of the most recent entry point.
    pub fn slots(&self) -> &ReturnSlots {
        &self.slots
    }

    /// Argument area the host fills before calling a string-taking entry point.
    pub fn args_mut(&mut self) -> &mut ReturnSlots {
        &mut self.args
    }

    // ---- identification ----

    pub fn get_label(&mut self) -> &CStr {
        self.slots.set_str(0, &self.metadata.label);
        self.slots.c_str(0)
    }

    pub fn get_maker(&mut self) -> &CStr {
        self.slots.set_str(0, &self.metadata.maker);
        self.slots.c_str(0)
    }

    pub fn get_license(&mut self) -> &CStr {
        self.slots.set_str(0, &self.metadata.license);
        self.slots.c_str(0)
    }

    pub fn get_version(&self) -> u32 {
        self.metadata.version
    }

    pub fn get_unique_id(&self) -> i64 {
        self.metadata.unique_id
    }

    // ---- parameters ----

    /// Describe parameter `index`.
    ///
    /// Mirrors hints into int slot 0, the name into string slot 0 and
    /// default/min/max into float slots 0..=2. Undeclared indices yield an
    /// empty name.
    pub fn init_parameter(&mut self, index: u32) -> ParameterDescriptor {
        let mut param = match self.plugin.init_parameter(index) {
            Some(param) => param,
            None => {
                tracing::trace!("No parameter at index {}", index);
                ParameterDescriptor::terminator(index)
            }
        };
        param.index = index;

        if let Err(e) = param.ranges.validate(index) {
            tracing::warn!("{}; clamping default into range", e);
            param.ranges.def = param.ranges.clamp(param.ranges.def);
        }

        self.slots.clear();
        self.slots.set_int(0, param.hints.bits() as i32);
        self.slots.set_str(0, &param.name);
        self.slots.set_float(0, param.ranges.def);
        self.slots.set_float(1, param.ranges.min);
        self.slots.set_float(2, param.ranges.max);

        param
    }

    /// All declared parameters, in index order.
    pub fn parameters(&mut self) -> Vec<ParameterDescriptor> {
        let mut params = Vec::new();
        for index in 0..self.plugin.parameter_count() {
            let param = self.init_parameter(index);
            if param.is_terminator() {
                break;
            }
            params.push(param);
        }
        params
    }

    /// Unknown indices read as `0.0`.
    pub fn get_parameter_value(&self, index: u32) -> f32 {
        if index < self.plugin.parameter_count() {
            self.plugin.parameter_value(index)
        } else {
            0.0
        }
    }

    /// Unknown indices are ignored.
    pub fn set_parameter_value(&mut self, index: u32, value: f32) {
        if index < self.plugin.parameter_count() {
            self.plugin.set_parameter_value(index, value);
        } else {
            tracing::trace!("Ignoring value for unknown parameter {}", index);
        }
    }

    // ---- state ----

    /// Key into string slot 0, default value into string slot 1.
    pub fn init_state(&mut self, index: u32) -> StateEntry {
        let entry = if index < self.plugin.state_count() {
            self.plugin.init_state(index).unwrap_or_default()
        } else {
            StateEntry::default()
        };

        self.slots.set_str(0, &entry.key);
        self.slots.set_str(1, &entry.value);
        entry
    }

    pub fn set_state(&mut self, key: &str, value: &str) {
        self.plugin.set_state(key, value);
    }

    /// Value into string slot 0 (empty when unknown).
    pub fn get_state(&mut self, key: &str) -> Option<String> {
        let value = self.plugin.get_state(key);
        self.slots.set_str(0, value.as_deref().unwrap_or(""));
        value
    }

    /// `set_state` with key and value read from argument string cells 0 and 1.
    pub fn set_state_from_args(&mut self) {
        let key = self.args.str(0);
        let value = self.args.str(1);
        self.plugin.set_state(key, value);
    }

    /// `get_state` with the key read from argument string cell 0.
    pub fn get_state_from_args(&mut self) -> &CStr {
        let value = self.plugin.get_state(self.args.str(0));
        self.slots.set_str(0, value.as_deref().unwrap_or(""));
        self.slots.c_str(0)
    }

    // ---- programs ----

    /// Name into string slot 0.
    pub fn init_program_name(&mut self, index: u32) -> Option<String> {
        let name = if index < self.plugin.program_count() {
            self.plugin.init_program_name(index)
        } else {
            None
        };
        self.slots.set_str(0, name.as_deref().unwrap_or(""));
        name
    }

    pub fn load_program(&mut self, index: u32) {
        if index < self.plugin.program_count() {
            self.plugin.load_program(index);
        }
    }

    // ---- lifecycle ----

    pub fn activate(&mut self) {
        if self.state == Lifecycle::Activated {
            return;
        }
        self.midi.clear();
        self.plugin.activate(&mut self.host);
        self.state = Lifecycle::Activated;
        tracing::debug!("{} activated", self.metadata.label);
    }

    pub fn deactivate(&mut self) {
        if self.state != Lifecycle::Activated {
            return;
        }
        self.plugin.deactivate();
        self.state = Lifecycle::Deactivated;
        tracing::debug!("{} deactivated", self.metadata.label);
    }

    /// Change the channel layout. Only legal while not activated.
    pub fn set_io(&mut self, num_inputs: usize, num_outputs: usize) -> Result<()> {
        if self.state == Lifecycle::Activated {
            return Err(BridgeError::LayoutLocked);
        }
        BufferRegions::check_fits(1, num_inputs, num_outputs)?;
        self.io = AudioIO::new(num_inputs, num_outputs);
        Ok(())
    }

    /// Queue a MIDI event for the next block. Returns `false` when the queue
    /// is full and the event was dropped.
    pub fn enqueue_midi_event(&mut self, event: MidiEvent) -> bool {
        if self.midi.len() >= MIDI_QUEUE_CAPACITY {
            return false;
        }
        self.midi.push(event);
        true
    }

    pub fn queued_midi_events(&self) -> usize {
        self.midi.len()
    }

    /// Process `frames` frames already present in the input region.
    ///
    /// RT-safe: no allocation, no locking, no logging.
    pub fn run(&mut self, frames: usize) -> Result<()> {
        if self.state != Lifecycle::Activated {
            return Err(BridgeError::NotActivated { state: self.state });
        }

        let mut block = self
            .regions
            .views(frames, self.io.inputs, self.io.outputs)?;
        self.plugin.run(&mut block, &self.midi, &mut self.host);
        self.midi.clear();
        Ok(())
    }

    /// Copy host channels into the input region, run, and copy the output
    /// region back.
    pub fn process(
        &mut self,
        frames: usize,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
    ) -> Result<()> {
        if inputs.len() != self.io.inputs {
            return Err(BridgeError::ChannelMismatch {
                expected: self.io.inputs,
                actual: inputs.len(),
            });
        }
        if outputs.len() != self.io.outputs {
            return Err(BridgeError::ChannelMismatch {
                expected: self.io.outputs,
                actual: outputs.len(),
            });
        }

        let shortest = inputs
            .iter()
            .map(|ch| ch.len())
            .chain(outputs.iter().map(|ch| ch.len()))
            .min()
            .unwrap_or(frames);
        if shortest < frames {
            return Err(BridgeError::ShortChannel {
                expected: frames,
                actual: shortest,
            });
        }

        BufferRegions::check_fits(frames, self.io.inputs, self.io.outputs)?;
        for (ch, data) in inputs.iter().enumerate() {
            self.regions.write_input_channel(ch, &data[..frames])?;
        }

        self.run(frames)?;

        for (ch, data) in outputs.iter_mut().enumerate() {
            self.regions.read_output_channel_into(ch, frames, data)?;
        }
        Ok(())
    }
}
