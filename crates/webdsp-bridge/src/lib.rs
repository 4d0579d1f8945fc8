//! Allocation-free bridge between a native audio host and a sandboxed DSP unit
//!
//! The host drives a fixed set of entry points ([`Dispatcher`]) that delegate
//! into one long-lived [`DspPlugin`]. Audio crosses through two pre-allocated
//! block regions ([`BufferRegions`]); multi-valued results are returned as
//! plain structs and mirrored into [`ReturnSlots`] for hosts on the far side
//! of a module boundary.
//!
//! ## Usage
//!
//! ```
//! use webdsp_bridge::{AudioBlock, Dispatcher, DspPlugin, Host, MidiEvent, PluginMetadata, StaticHost};
//!
//! #[derive(Default)]
//! struct Silence;
//!
//! impl DspPlugin for Silence {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("silence").audio_io(0, 2)
//!     }
//!
//!     fn run(&mut self, block: &mut AudioBlock<'_>, _midi: &[MidiEvent], _host: &mut dyn Host) {
//!         block.clear_outputs();
//!     }
//! }
//!
//! let mut bridge = Dispatcher::new(Silence, StaticHost::new(48000.0));
//! bridge.activate();
//! bridge.run(256).unwrap();
//! ```
//!
//! For module builds, [`export_plugin!`] emits the `dpf_*` C ABI.

pub mod error;
pub use error::{BridgeError, Lifecycle, Result};

mod buffer;
pub use buffer::{AudioBlock, BufferRegions, BLOCK_REGION_BYTES, BYTES_PER_SAMPLE, REGION_SAMPLES};

mod slots;
pub use slots::{ReturnSlots, SLOT_COUNT, STRING_SLOT_BYTES};

mod descriptor;
pub use descriptor::{ParameterDescriptor, ParameterHints, ParameterRanges, StateEntry};

mod midi;
pub use midi::{MidiEvent, MidiEventVec, MIDI_QUEUE_CAPACITY};

mod version;
pub use version::{cconst, sconst, unpack_version, version};

mod metadata;
pub use metadata::{AudioIO, PluginMetadata};

mod plugin;
pub use plugin::{DspPlugin, Host, StaticHost};

mod dispatcher;
pub use dispatcher::Dispatcher;

#[doc(hidden)]
pub mod export;
