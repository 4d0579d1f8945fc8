//! Error types for the DSP/host bridge

use thiserror::Error;

/// Lifecycle of a bridged plugin instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Activated,
    Deactivated,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "uninitialized"),
            Lifecycle::Activated => write!(f, "activated"),
            Lifecycle::Deactivated => write!(f, "deactivated"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Block of {frames} frames x {channels} channels exceeds region capacity of {capacity} bytes")]
    BlockTooLarge {
        frames: usize,
        channels: usize,
        capacity: usize,
    },

    #[error("run() is only legal while activated (plugin is {state})")]
    NotActivated { state: Lifecycle },

    #[error("Audio I/O layout cannot change while activated")]
    LayoutLocked,

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Channel buffer holds {actual} frames, block needs {expected}")]
    ShortChannel { expected: usize, actual: usize },

    #[error("Invalid range for parameter {index}: min {min}, default {def}, max {max}")]
    InvalidRange {
        index: u32,
        min: f32,
        def: f32,
        max: f32,
    },
}

impl BridgeError {
    /// Nonzero status code returned through the C ABI.
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::BlockTooLarge { .. } => 1,
            BridgeError::NotActivated { .. } => 2,
            BridgeError::LayoutLocked => 3,
            BridgeError::ChannelMismatch { .. } => 4,
            BridgeError::ShortChannel { .. } => 5,
            BridgeError::InvalidRange { .. } => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
