//! Static description of a DSP unit.
//!
//! This is what the host reads once through the label/maker/license/version/id
//! entry points before enumerating parameters.

use crate::version::{unpack_version, version};
use serde::{Deserialize, Serialize};

/// Audio I/O configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioIO {
    pub inputs: usize,
    pub outputs: usize,
}

impl AudioIO {
    pub fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }

    /// Stereo in, stereo out
    pub fn stereo() -> Self {
        Self::new(2, 2)
    }

    /// Channel count the block regions must accommodate.
    pub fn max_channels(&self) -> usize {
        self.inputs.max(self.outputs)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Short machine-friendly label
    pub label: String,

    /// Vendor/author name
    pub maker: String,

    pub license: String,

    /// Packed `(major << 16) | (minor << 8) | micro`
    pub version: u32,

    /// Four-byte identifier packed big-endian
    pub unique_id: i64,

    pub audio_io: AudioIO,
}

impl PluginMetadata {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            maker: String::new(),
            license: String::new(),
            version: version(1, 0, 0),
            unique_id: 0,
            audio_io: AudioIO::stereo(),
        }
    }

    pub fn maker(mut self, maker: impl Into<String>) -> Self {
        self.maker = maker.into();
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = license.into();
        self
    }

    pub fn version(mut self, major: u8, minor: u8, micro: u8) -> Self {
        self.version = version(major, minor, micro);
        self
    }

    pub fn unique_id(mut self, unique_id: i64) -> Self {
        self.unique_id = unique_id;
        self
    }

    pub fn audio_io(mut self, inputs: usize, outputs: usize) -> Self {
        self.audio_io = AudioIO::new(inputs, outputs);
        self
    }

    pub fn version_triple(&self) -> (u8, u8, u8) {
        unpack_version(self.version)
    }
}
