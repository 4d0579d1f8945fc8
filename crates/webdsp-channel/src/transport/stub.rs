//! Transport for running the UI with no host attached.

use crate::codec::Envelope;
use crate::shared::Shared;
use std::sync::Arc;
use tokio::sync::mpsc;

pub(super) async fn run(shared: Arc<Shared>, mut outbound: mpsc::UnboundedReceiver<Envelope>) {
    tokio::task::yield_now().await;
    shared.set_open();

    while let Some(envelope) = outbound.recv().await {
        tracing::debug!(
            "No host attached, dropping {} ({} args)",
            envelope.function,
            envelope.args.len()
        );
    }
}
