//! Channel configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the host (`host:port` or a full `ws://` URL).
pub const ENV_HOST: &str = "WEBDSP_HOST";

/// Environment variable holding a per-call reply timeout in milliseconds.
pub const ENV_CALL_TIMEOUT_MS: &str = "WEBDSP_CALL_TIMEOUT_MS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Host to connect to in network mode
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Delay before reconnecting a closed socket
    pub reconnect_ms: u64,

    /// Latency probe interval
    pub ping_ms: u64,

    /// Delay between losing the channel and showing the offline indicator
    pub offline_grace_ms: u64,

    /// Reply timeout. Unanswered calls stay pending until the channel closes
    /// when unset.
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect_ms: 3000,
            ping_ms: 10_000,
            offline_grace_ms: 1000,
            call_timeout_ms: None,
        }
    }
}

impl ChannelConfig {
    /// Defaults overridden by `WEBDSP_HOST` and `WEBDSP_CALL_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var(ENV_HOST) {
            if !host.is_empty() {
                config.endpoint = Some(host);
            }
        }
        if let Ok(ms) = std::env::var(ENV_CALL_TIMEOUT_MS) {
            match ms.parse() {
                Ok(ms) => config.call_timeout_ms = Some(ms),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_CALL_TIMEOUT_MS, ms, e),
            }
        }
        config
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn reconnect_period(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_millis(self.ping_ms.max(1))
    }

    pub fn offline_grace(&self) -> Duration {
        Duration::from_millis(self.offline_grace_ms)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// WebSocket URL for the endpoint. Bare hosts get a `ws://` scheme.
    pub fn url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim();
        if endpoint.is_empty() {
            return None;
        }
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            Some(endpoint.to_string())
        } else {
            Some(format!("ws://{}", endpoint))
        }
    }
}
