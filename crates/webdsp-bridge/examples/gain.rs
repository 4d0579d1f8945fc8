//! Demonstration gain plugin exported through the bridge ABI.
//!
//! Build as a sandboxed module:
//!
//! ```text
//! cargo build -p webdsp-bridge --example gain --target wasm32-unknown-unknown --release
//! ```

use webdsp_bridge::{
    sconst, AudioBlock, DspPlugin, Host, MidiEvent, ParameterDescriptor, ParameterHints,
    PluginMetadata, StateEntry,
};

const PARAM_GAIN: u32 = 0;

struct Gain {
    gain: f32,
    label: String,
}

impl Default for Gain {
    fn default() -> Self {
        Self {
            gain: 1.0,
            label: "default".to_string(),
        }
    }
}

impl DspPlugin for Gain {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("WebGain")
            .maker("webdsp")
            .license("ISC")
            .version(1, 0, 0)
            .unique_id(sconst("wGai").unwrap_or_default())
            .audio_io(1, 1)
    }

    fn parameter_count(&self) -> u32 {
        1
    }

    fn init_parameter(&self, index: u32) -> Option<ParameterDescriptor> {
        (index == PARAM_GAIN).then(|| {
            ParameterDescriptor::new(PARAM_GAIN, "Gain")
                .hints(ParameterHints::AUTOMATABLE)
                .ranges(1.0, 0.0, 2.0)
        })
    }

    fn parameter_value(&self, _index: u32) -> f32 {
        self.gain
    }

    fn set_parameter_value(&mut self, _index: u32, value: f32) {
        self.gain = value;
    }

    fn state_count(&self) -> u32 {
        1
    }

    fn init_state(&self, _index: u32) -> Option<StateEntry> {
        Some(StateEntry::new("label", "default"))
    }

    fn set_state(&mut self, key: &str, value: &str) {
        if key == "label" {
            self.label = value.to_string();
        }
    }

    fn get_state(&self, key: &str) -> Option<String> {
        (key == "label").then(|| self.label.clone())
    }

    fn run(&mut self, block: &mut AudioBlock<'_>, _midi: &[MidiEvent], _host: &mut dyn Host) {
        let gain = self.gain;
        let (input, output) = block.io_mut(0);
        for (out, sample) in output.iter_mut().zip(input) {
            *out = sample * gain;
        }
    }
}

webdsp_bridge::export_plugin!(Gain);
