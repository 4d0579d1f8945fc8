//! Centralized error type for the webdsp umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "bridge")]
    #[error("Bridge: {0}")]
    Bridge(#[from] webdsp_bridge::BridgeError),

    #[cfg(feature = "channel")]
    #[error("Channel: {0}")]
    Channel(#[from] webdsp_channel::ChannelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
