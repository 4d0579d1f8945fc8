//! Error types for the UI message channel

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Message channel closed: {0}")]
    ChannelClosed(String),

    #[error("Timeout after {duration_ms}ms waiting for reply to {function}")]
    Timeout { function: String, duration_ms: u64 },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Unexpected reply to {function}: {reason}")]
    UnexpectedReply { function: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON encode error: {0}")]
    BsonEncode(#[from] bson::ser::Error),

    #[error("BSON decode error: {0}")]
    BsonDecode(#[from] bson::de::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    pub(crate) fn timeout(function: &str, after: Duration) -> Self {
        ChannelError::Timeout {
            function: function.to_string(),
            duration_ms: after.as_millis() as u64,
        }
    }

    pub(crate) fn unexpected(function: &str, reason: impl Into<String>) -> Self {
        ChannelError::UnexpectedReply {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the channel going away rather than by a
    /// malformed message.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            ChannelError::ChannelClosed(_)
                | ChannelError::ConnectionFailed(_)
                | ChannelError::WebSocket(_)
                | ChannelError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
