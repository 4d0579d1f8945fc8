//! In-process transport backed by the host's post/listen primitive.
//!
//! Messages cross as raw `[function, ...args]` value lists; the host never
//! sees encoded frames, so the text protocol is always in effect.

use crate::codec::Envelope;
use crate::shared::Shared;
use crate::value::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Message sink provided by the embedding host.
pub trait NativeHost: Send + Sync + 'static {
    fn post_message(&self, message: Vec<Value>);
}

/// Both directions of the host primitive.
pub struct NativeEndpoint {
    host: Arc<dyn NativeHost>,
    inbound: mpsc::UnboundedReceiver<Vec<Value>>,
}

impl NativeEndpoint {
    pub fn new(host: Arc<dyn NativeHost>, inbound: mpsc::UnboundedReceiver<Vec<Value>>) -> Self {
        Self { host, inbound }
    }

    /// Endpoint plus the sender the host uses to deliver messages to the UI.
    pub fn pair(host: Arc<dyn NativeHost>) -> (Self, mpsc::UnboundedSender<Vec<Value>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(host, rx), tx)
    }
}

pub(super) async fn run(
    shared: Arc<Shared>,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    endpoint: NativeEndpoint,
) {
    let NativeEndpoint { host, mut inbound } = endpoint;

    host.post_message(vec![Value::from("ready")]);
    // let the constructor return before observers hear about it
    tokio::task::yield_now().await;
    shared.set_open();

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(envelope) => host.post_message(envelope.into_values()),
                None => break,
            },
            message = inbound.recv() => match message {
                Some(values) => match Envelope::from_values(values) {
                    Ok(envelope) => shared.dispatch(envelope),
                    Err(e) => tracing::warn!("Dropping malformed host message: {}", e),
                },
                None => {
                    tracing::debug!("Host closed the native message channel");
                    break;
                }
            },
        }
    }

    shared.connection_lost("native host detached");
}
