//! Bridge tests through the exported C ABI and the dispatcher.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::TEST_BLOCK_FRAMES;
use approx::assert_abs_diff_eq;
use std::ffi::{c_char, CStr};
use webdsp::bridge::{
    sconst, version, AudioBlock, BridgeError, Dispatcher, DspPlugin, Host, Lifecycle, MidiEvent,
    ParameterDescriptor, ParameterHints, PluginMetadata, StateEntry, StaticHost, REGION_SAMPLES,
};

const PARAM_LEVEL: u32 = 0;
const PARAM_NOTES: u32 = 1;
const PROGRAMS: [(&str, f32); 2] = [("Unity", 1.0), ("Half", 0.5)];

/// Stereo fader that counts incoming note-ons.
struct Fader {
    level: f32,
    mode: String,
    notes: u32,
}

impl Default for Fader {
    fn default() -> Self {
        Self {
            level: 1.0,
            mode: "clean".to_string(),
            notes: 0,
        }
    }
}

impl DspPlugin for Fader {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("Fader")
            .maker("webdsp tests")
            .license("MIT")
            .version(1, 2, 3)
            .unique_id(sconst("fadr").unwrap_or_default())
            .audio_io(2, 2)
    }

    fn parameter_count(&self) -> u32 {
        2
    }

    fn init_parameter(&self, index: u32) -> Option<ParameterDescriptor> {
        match index {
            PARAM_LEVEL => Some(ParameterDescriptor::new(PARAM_LEVEL, "Level").ranges(1.0, 0.0, 1.0)),
            PARAM_NOTES => Some(
                ParameterDescriptor::new(PARAM_NOTES, "Notes")
                    .hints(ParameterHints::OUTPUT | ParameterHints::INTEGER)
                    .ranges(0.0, 0.0, 127.0),
            ),
            _ => None,
        }
    }

    fn parameter_value(&self, index: u32) -> f32 {
        match index {
            PARAM_LEVEL => self.level,
            _ => self.notes as f32,
        }
    }

    fn set_parameter_value(&mut self, index: u32, value: f32) {
        if index == PARAM_LEVEL {
            self.level = value;
        }
    }

    fn state_count(&self) -> u32 {
        1
    }

    fn init_state(&self, _index: u32) -> Option<StateEntry> {
        Some(StateEntry::new("mode", "clean"))
    }

    fn set_state(&mut self, key: &str, value: &str) {
        if key == "mode" {
            self.mode = value.to_string();
        }
    }

    fn get_state(&self, key: &str) -> Option<String> {
        (key == "mode").then(|| self.mode.clone())
    }

    fn program_count(&self) -> u32 {
        PROGRAMS.len() as u32
    }

    fn init_program_name(&self, index: u32) -> Option<String> {
        PROGRAMS.get(index as usize).map(|(name, _)| name.to_string())
    }

    fn load_program(&mut self, index: u32) {
        if let Some((_, level)) = PROGRAMS.get(index as usize) {
            self.level = *level;
        }
    }

    fn run(&mut self, block: &mut AudioBlock<'_>, midi: &[MidiEvent], _host: &mut dyn Host) {
        self.notes += midi.iter().filter(|event| event.is_note_on()).count() as u32;
        let level = self.level;
        for channel in 0..block.num_outputs() {
            let (input, output) = block.io_mut(channel);
            for (out, sample) in output.iter_mut().zip(input) {
                *out = sample * level;
            }
        }
    }
}

webdsp::export_plugin!(Fader);

use __webdsp_exports::*;

fn c_string(ptr: *const c_char) -> String {
    assert!(!ptr.is_null());
    // SAFETY: points into a live, null-terminated return slot.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn slot_str(slot: usize) -> String {
    // SAFETY: the return slots live as long as this thread's dispatcher.
    unsafe { (*dpf_return_slots()).str(slot).to_string() }
}

fn slot_int(slot: usize) -> i32 {
    // SAFETY: as above.
    unsafe { (*dpf_return_slots()).int(slot) }
}

fn slot_float(slot: usize) -> f32 {
    // SAFETY: as above.
    unsafe { (*dpf_return_slots()).float(slot) }
}

fn write_arg(index: u32, value: &str) {
    let cell = dpf_string_arg(index);
    assert!(!cell.is_null());
    // SAFETY: argument cells hold 1024 bytes; test strings are short.
    unsafe {
        std::ptr::copy_nonoverlapping(value.as_ptr(), cell, value.len());
        *cell.add(value.len()) = 0;
    }
}

fn write_input(channel: usize, frames: usize, value: f32) {
    // SAFETY: channel * frames + frames stays inside the input region.
    let region = unsafe { std::slice::from_raw_parts_mut(dpf_input_block(), REGION_SAMPLES) };
    region[channel * frames..(channel + 1) * frames].fill(value);
}

fn read_output(channel: usize, frames: usize) -> Vec<f32> {
    // SAFETY: as above, for the output region.
    let region = unsafe { std::slice::from_raw_parts(dpf_output_block(), REGION_SAMPLES) };
    region[channel * frames..(channel + 1) * frames].to_vec()
}

#[test]
fn test_abi_identification() {
    assert_eq!(c_string(dpf_get_label()), "Fader");
    assert_eq!(c_string(dpf_get_maker()), "webdsp tests");
    assert_eq!(c_string(dpf_get_license()), "MIT");
    assert_eq!(dpf_get_version(), version(1, 2, 3));
    assert_eq!(dpf_get_version(), 0x0001_0203);
    assert_eq!(dpf_get_unique_id(), 0x6661_6472);
}

#[test]
fn test_abi_parameter_enumeration() {
    dpf_init_parameter(PARAM_LEVEL);
    assert_eq!(slot_int(0), ParameterHints::AUTOMATABLE.bits() as i32);
    assert_eq!(slot_str(0), "Level");
    assert_abs_diff_eq!(slot_float(0), 1.0);
    assert_abs_diff_eq!(slot_float(1), 0.0);
    assert_abs_diff_eq!(slot_float(2), 1.0);

    dpf_init_parameter(PARAM_NOTES);
    assert_eq!(slot_int(0), 0x14);
    assert_eq!(slot_str(0), "Notes");
    assert_abs_diff_eq!(slot_float(2), 127.0);

    // past the last parameter: empty name terminates enumeration
    dpf_init_parameter(2);
    assert_eq!(slot_str(0), "");

    dpf_set_parameter_value(PARAM_LEVEL, 0.25);
    assert_abs_diff_eq!(dpf_get_parameter_value(PARAM_LEVEL), 0.25);
    dpf_set_parameter_value(9, 0.5);
    assert_abs_diff_eq!(dpf_get_parameter_value(9), 0.0);
}

#[test]
fn test_abi_state_through_string_args() {
    dpf_init_state(0);
    assert_eq!(slot_str(0), "mode");
    assert_eq!(slot_str(1), "clean");

    write_arg(0, "mode");
    write_arg(1, "warm");
    dpf_set_state();

    write_arg(0, "mode");
    assert_eq!(c_string(dpf_get_state()), "warm");

    write_arg(0, "unknown");
    assert_eq!(c_string(dpf_get_state()), "");

    assert!(dpf_string_arg(7).is_null());
}

#[test]
fn test_abi_programs() {
    assert_eq!(c_string(dpf_init_program_name(1)), "Half");
    assert_eq!(c_string(dpf_init_program_name(5)), "");

    dpf_load_program(1);
    assert_abs_diff_eq!(dpf_get_parameter_value(PARAM_LEVEL), 0.5);
}

#[test]
fn test_abi_run_lifecycle() {
    let frames = TEST_BLOCK_FRAMES;
    let not_activated = BridgeError::NotActivated {
        state: Lifecycle::Uninitialized,
    };
    assert_eq!(dpf_run(frames as u32), not_activated.code());

    dpf_activate();
    dpf_set_parameter_value(PARAM_LEVEL, 0.5);
    write_input(0, frames, 1.0);
    write_input(1, frames, -0.5);
    assert_eq!(dpf_run(frames as u32), 0);

    for sample in read_output(0, frames) {
        assert_abs_diff_eq!(sample, 0.5, epsilon = FLOAT_EPSILON);
    }
    for sample in read_output(1, frames) {
        assert_abs_diff_eq!(sample, -0.25, epsilon = FLOAT_EPSILON);
    }

    // layout is fixed while activated
    assert_eq!(dpf_set_io(1, 1), BridgeError::LayoutLocked.code());
    assert_eq!(dpf_num_inputs(), 2);

    dpf_deactivate();
    assert_eq!(dpf_set_io(1, 1), 0);
    assert_eq!(dpf_num_inputs(), 1);
    assert_eq!(dpf_num_outputs(), 1);

    dpf_activate();
    assert_eq!(dpf_run(REGION_SAMPLES as u32), 0);
    let too_large = BridgeError::BlockTooLarge {
        frames: 0,
        channels: 0,
        capacity: 0,
    };
    assert_eq!(dpf_run(REGION_SAMPLES as u32 + 1), too_large.code());
}

#[test]
fn test_abi_midi_queue() {
    dpf_activate();
    let note = MidiEvent::note_on(3, 0, 60, 100);
    assert_eq!(dpf_enqueue_midi_event(note.frame, note.packed()), 1);
    assert_eq!(dpf_enqueue_midi_event(5, MidiEvent::note_off(5, 0, 60).packed()), 1);

    assert_eq!(dpf_run(TEST_BLOCK_FRAMES as u32), 0);
    assert_abs_diff_eq!(dpf_get_parameter_value(PARAM_NOTES), 1.0);

    // the queue is drained by each run
    assert_eq!(dpf_run(TEST_BLOCK_FRAMES as u32), 0);
    assert_abs_diff_eq!(dpf_get_parameter_value(PARAM_NOTES), 1.0);
}

#[test]
fn test_dispatcher_process_multiple_blocks() {
    let mut dispatcher = Dispatcher::new(Fader::default(), StaticHost::new(44100.0));
    dispatcher.activate();
    dispatcher.set_parameter_value(PARAM_LEVEL, 0.5);

    let left: Vec<f32> = (0..TEST_BLOCK_FRAMES).map(|i| i as f32).collect();
    let right = vec![2.0f32; TEST_BLOCK_FRAMES];
    let mut out_left = vec![0.0f32; TEST_BLOCK_FRAMES];
    let mut out_right = vec![0.0f32; TEST_BLOCK_FRAMES];

    for _ in 0..4 {
        dispatcher
            .process(
                TEST_BLOCK_FRAMES,
                &[&left[..], &right[..]],
                &mut [&mut out_left[..], &mut out_right[..]],
            )
            .unwrap();
    }

    for (i, sample) in out_left.iter().enumerate() {
        assert_abs_diff_eq!(*sample, i as f32 * 0.5, epsilon = FLOAT_EPSILON);
    }
    assert!(out_right.iter().all(|s| (*s - 1.0).abs() < FLOAT_EPSILON));

    let params = dispatcher.parameters();
    assert_eq!(params.len(), 2);
    assert_eq!(params[1].name, "Notes");
    assert!(params[1].hints.contains(ParameterHints::OUTPUT));
}

/// Declares parameters whose bounds are NaN or inverted.
struct Miswired;

impl DspPlugin for Miswired {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("Miswired").audio_io(0, 0)
    }

    fn parameter_count(&self) -> u32 {
        3
    }

    fn init_parameter(&self, index: u32) -> Option<ParameterDescriptor> {
        let param = ParameterDescriptor::new(index, "Broken");
        match index {
            0 => Some(param.ranges(0.5, f32::NAN, 1.0)),
            1 => Some(param.ranges(0.5, 0.0, f32::NAN)),
            2 => Some(param.ranges(0.5, 1.0, 0.0)),
            _ => None,
        }
    }

    fn run(&mut self, _block: &mut AudioBlock<'_>, _midi: &[MidiEvent], _host: &mut dyn Host) {}
}

#[test]
fn test_dispatcher_survives_broken_ranges() {
    let mut dispatcher = Dispatcher::new(Miswired, StaticHost::new(48000.0));

    let nan_min = dispatcher.init_parameter(0);
    assert!(nan_min.ranges.def.is_nan());
    assert!(dispatcher.slots().float(1).is_nan());

    let nan_max = dispatcher.init_parameter(1);
    assert_eq!(nan_max.ranges.def, 0.0);
    assert_eq!(dispatcher.slots().float(0), 0.0);
    assert!(dispatcher.slots().float(2).is_nan());

    let inverted = dispatcher.init_parameter(2);
    assert_eq!(inverted.ranges.def, 1.0);
    assert_eq!(dispatcher.slots().str(0), "Broken");

    assert_eq!(dispatcher.parameters().len(), 3);
}
