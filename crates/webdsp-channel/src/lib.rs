//! # webdsp-channel
//!
//! Promise-style remote calls between a plugin UI and its host.
//!
//! A [`MessageChannel`] carries `[function, ...args]` envelopes over one of
//! three transports picked from the runtime [`Environment`]: the host's
//! in-process post/listen primitive, a WebSocket for UIs served over the
//! network, or a stub for running without a host. Over a socket the wire
//! format (JSON text or BSON binary) follows whatever the host sends first.
//!
//! ```no_run
//! use std::sync::Arc;
//! use webdsp_channel::{ChannelConfig, Environment, MessageChannel, NoCallbacks};
//!
//! # async fn demo() -> webdsp_channel::Result<()> {
//! let config = ChannelConfig::default().endpoint("127.0.0.1:49999");
//! let channel = MessageChannel::connect(Environment::network(), config, Arc::new(NoCallbacks))?;
//!
//! let width = channel.get_width().await?;
//! channel.set_parameter_value(0, 0.5)?;
//! # let _ = width;
//! # Ok(())
//! # }
//! ```

pub mod error;

mod channel;
mod codec;
mod config;
mod dispatch;
mod gesture;
mod hash;
mod observer;
mod pending;
mod resize;
mod shared;
mod transport;
mod value;

pub use channel::{ChannelBuilder, MessageChannel, BROADCAST};
pub use codec::{decode, encode, Envelope, Frame, FunctionId, Protocol};
pub use config::{ChannelConfig, ENV_CALL_TIMEOUT_MS, ENV_HOST};
pub use dispatch::{
    FunctionTable, Handler, PARAMETER_CHANGED, PROGRAM_LOADED, SAMPLE_RATE_CHANGED, SIZE_CHANGED,
    STATE_CHANGED,
};
pub use error::{ChannelError, Result};
pub use gesture::{
    ControlEvent, GestureTracker, InputKind, MouseButton, Point, PointerInput, WHEEL_END_DELAY,
};
pub use hash::{djb2, FunctionKey};
pub use observer::{ChannelObserver, NoCallbacks, OfflineIndicator, OfflineView, UiCallbacks};
pub use pending::{PendingCall, PendingCalls};
pub use resize::{ResizeConfig, ResizeHandle, Size};
pub use transport::{
    Environment, NativeEndpoint, NativeHost, TransportKind, ENV_DEV, ENV_NETWORK, ENV_PLUGIN,
};
pub use value::Value;
