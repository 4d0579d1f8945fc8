//! # webdsp - Web-technology audio plugins
//!
//! Umbrella crate over the two halves of a plugin whose DSP runs in a
//! sandboxed module and whose UI talks to the host over a message channel.
//!
//! - **webdsp-bridge** - Fixed-capacity buffer regions, return slots, the
//!   descriptor dispatcher and the exported C ABI for plugin modules
//! - **webdsp-channel** - Promise-style calls between UI and host over
//!   native, WebSocket or stub transports, plus gesture and resize helpers
//!
//! ## Quick Start
//!
//! ```ignore
//! use webdsp::prelude::*;
//!
//! let mut dispatcher = Dispatcher::new(MyPlugin::default(), StaticHost::new(48000.0));
//! dispatcher.activate();
//! dispatcher.run(128)?;
//!
//! let channel = MessageChannel::connect(Environment::from_env(), ChannelConfig::from_env(), callbacks)?;
//! channel.set_parameter_value(0, 0.5)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Both subsystems
//! - `bridge` - DSP/host bridge
//! - `channel` - UI message channel

pub mod error;

pub use error::{Error, Result};

/// DSP/host bridge
#[cfg(feature = "bridge")]
pub use webdsp_bridge as bridge;

/// UI message channel
#[cfg(feature = "channel")]
pub use webdsp_channel as channel;

#[cfg(feature = "bridge")]
pub use webdsp_bridge::export_plugin;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Error, Result};

    // Bridge
    #[cfg(feature = "bridge")]
    pub use crate::bridge::{
        AudioBlock, AudioIO, Dispatcher, DspPlugin, Host, MidiEvent, ParameterDescriptor,
        ParameterHints, ParameterRanges, PluginMetadata, StateEntry, StaticHost,
    };

    // Channel
    #[cfg(feature = "channel")]
    pub use crate::channel::{
        ChannelConfig, ChannelObserver, ControlEvent, Environment, GestureTracker,
        MessageChannel, PointerInput, ResizeConfig, ResizeHandle, Size, UiCallbacks, Value,
    };
}
