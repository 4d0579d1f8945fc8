//! WebSocket transport for UIs served over the network.
//!
//! The wire mode is unknown until the host's first frame arrives; until then
//! outbound envelopes go out as text. The channel counts as open once that
//! first frame is in, or right away on reconnect when the mode is already
//! known. A lost connection rejects every pending call, discards anything
//! still queued for the dead connection and retries after the reconnect
//! period. Nothing is queued while disconnected: calls and posts fail
//! immediately until the next connection is up.

use crate::codec::{Envelope, Frame};
use crate::error::Result;
use crate::shared::{Shared, PING};
use futures_util::{Sink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};

enum SessionEnd {
    /// Connection dropped; reconnect
    Lost(String),
    /// Channel handle went away
    Shutdown,
}

pub(super) async fn run(
    shared: Arc<Shared>,
    mut outbound: mpsc::UnboundedReceiver<Envelope>,
    url: String,
) {
    loop {
        let attempt = tokio::select! {
            result = tokio_tungstenite::connect_async(url.as_str()) => Some(result),
            _ = dropped(&mut outbound) => None,
        };
        let reason = match attempt {
            None => break,
            Some(Ok((stream, _response))) => {
                tracing::info!("Connected to {}", url);
                shared.set_connected();
                let (sink, source) = stream.split();
                match session(&shared, &mut outbound, sink, source).await {
                    SessionEnd::Lost(reason) => reason,
                    SessionEnd::Shutdown => break,
                }
            }
            Some(Err(e)) => format!("connecting to {} failed: {}", url, e),
        };

        shared.connection_lost(&reason);
        discard_queued(&mut outbound);

        let period = shared.config.reconnect_period();
        tracing::debug!("Reconnecting in {:?}", period);
        let handle_alive = tokio::select! {
            _ = tokio::time::sleep(period) => true,
            _ = dropped(&mut outbound) => false,
        };
        if !handle_alive {
            break;
        }
    }
    shared.connection_lost("channel dropped");
}

/// Drop envelopes queued before the connection went down. Their calls were
/// already rejected.
fn discard_queued(outbound: &mut mpsc::UnboundedReceiver<Envelope>) {
    let mut discarded = 0;
    while let Ok(envelope) = outbound.try_recv() {
        tracing::trace!("Discarding {} queued for a lost connection", envelope.function);
        discarded += 1;
    }
    if discarded > 0 {
        tracing::debug!("Discarded {} envelopes queued for a lost connection", discarded);
    }
}

/// Resolves once the channel handle is gone. Nothing is sent while
/// disconnected, so anything received here is dropped.
async fn dropped(outbound: &mut mpsc::UnboundedReceiver<Envelope>) {
    while let Some(envelope) = outbound.recv().await {
        tracing::debug!("Not connected, dropping {}", envelope.function);
    }
}

async fn session<W, R>(
    shared: &Shared,
    outbound: &mut mpsc::UnboundedReceiver<Envelope>,
    mut sink: W,
    mut source: R,
) -> SessionEnd
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
    R: futures_util::Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    if shared.is_probed() {
        shared.set_open();
    }

    let mut ping = tokio::time::interval(shared.config.ping_period());
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ping.tick() => {
                shared.mark_ping();
                if let Err(e) = send(shared, &mut sink, &Envelope::new(PING, vec![])).await {
                    return SessionEnd::Lost(e.to_string());
                }
            }
            message = source.next() => match message {
                Some(Ok(message)) => match into_frame(message) {
                    Some(frame) => receive(shared, &frame),
                    None => continue,
                },
                Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                None => return SessionEnd::Lost("closed by host".to_string()),
            },
            envelope = outbound.recv() => match envelope {
                Some(envelope) => {
                    if let Err(e) = send(shared, &mut sink, &envelope).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
            },
        }
    }
}

fn receive(shared: &Shared, frame: &Frame) {
    if !shared.is_probed() {
        shared.probe(frame);
        shared.set_open();
    }
    shared.receive_frame(frame);
}

async fn send<W>(shared: &Shared, sink: &mut W, envelope: &Envelope) -> Result<()>
where
    W: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = match shared.encode(envelope) {
        Ok(frame) => frame,
        Err(e) => {
            // drop the envelope, keep the connection
            tracing::warn!("Dropping {}: {}", envelope.function, e);
            return Ok(());
        }
    };
    sink.send(into_message(frame)).await?;
    Ok(())
}

/// Data frames only; control frames are answered by the websocket layer.
fn into_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(bytes) => Some(Frame::Binary(bytes)),
        Message::Close(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    }
}
