//! Transport selection.
//!
//! Exactly one backend carries a channel, chosen from the environment at
//! construction:
//!
//! | plugin | network | transport |
//! |---|---|---|
//! | yes | no | [`TransportKind::Native`] |
//! | any | yes | [`TransportKind::Socket`] |
//! | no | no | [`TransportKind::Stub`] |

mod native;
mod socket;
mod stub;

pub use native::{NativeEndpoint, NativeHost};

use crate::codec::Envelope;
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::shared::Shared;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const ENV_PLUGIN: &str = "WEBDSP_PLUGIN";
pub const ENV_NETWORK: &str = "WEBDSP_NETWORK";
pub const ENV_DEV: &str = "WEBDSP_DEV";

/// Runtime signals the transport is selected from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Embedded in a plugin host's web view
    pub plugin: bool,
    /// Served to a remote client over the network
    pub network: bool,
    /// Development build without a host
    pub dev: bool,
}

impl Environment {
    pub fn plugin() -> Self {
        Self {
            plugin: true,
            ..Self::default()
        }
    }

    pub fn network() -> Self {
        Self {
            network: true,
            ..Self::default()
        }
    }

    pub fn dev() -> Self {
        Self {
            dev: true,
            ..Self::default()
        }
    }

    /// Flags from `WEBDSP_PLUGIN`, `WEBDSP_NETWORK` and `WEBDSP_DEV`.
    pub fn from_env() -> Self {
        Self {
            plugin: env_flag(ENV_PLUGIN),
            network: env_flag(ENV_NETWORK),
            dev: env_flag(ENV_DEV),
        }
    }

    pub fn transport_kind(&self) -> TransportKind {
        if self.network {
            TransportKind::Socket
        } else if self.plugin {
            TransportKind::Native
        } else {
            TransportKind::Stub
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// In-process post/listen primitive provided by the host
    Native,
    /// WebSocket to the host's network endpoint
    Socket,
    /// No transport; calls resolve immediately with no result
    Stub,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Native => write!(f, "native"),
            TransportKind::Socket => write!(f, "socket"),
            TransportKind::Stub => write!(f, "stub"),
        }
    }
}

/// Start the transport task for `kind` on `runtime`.
pub(crate) fn spawn(
    runtime: &Handle,
    kind: TransportKind,
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedReceiver<Envelope>,
    config: &ChannelConfig,
    native: Option<NativeEndpoint>,
) -> Result<JoinHandle<()>> {
    let handle = match kind {
        TransportKind::Native => {
            let endpoint = native.ok_or_else(|| {
                ChannelError::ConnectionFailed("native transport needs a host endpoint".to_string())
            })?;
            runtime.spawn(native::run(shared, outbound, endpoint))
        }
        TransportKind::Socket => {
            let url = config.url().ok_or_else(|| {
                ChannelError::ConnectionFailed("no network endpoint configured".to_string())
            })?;
            runtime.spawn(socket::run(shared, outbound, url))
        }
        TransportKind::Stub => runtime.spawn(stub::run(shared, outbound)),
    };
    Ok(handle)
}
