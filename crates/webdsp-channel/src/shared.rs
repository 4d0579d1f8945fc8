//! State shared between a [`MessageChannel`](crate::MessageChannel) handle and
//! its transport task.

use crate::codec::{self, Envelope, Frame, FunctionId, Protocol};
use crate::config::ChannelConfig;
use crate::dispatch::FunctionTable;
use crate::hash::FunctionKey;
use crate::error::{ChannelError, Result};
use crate::observer::{ChannelObserver, UiCallbacks};
use crate::pending::PendingCalls;
use crate::transport::TransportKind;
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) const PING: &str = "ping";
pub(crate) const PONG: &str = "pong";

pub(crate) struct Shared {
    pub(crate) config: ChannelConfig,
    pub(crate) kind: TransportKind,
    pub(crate) pending: PendingCalls,
    protocol: Mutex<Option<Protocol>>,
    table: RwLock<FunctionTable>,
    callbacks: Arc<dyn UiCallbacks>,
    observers: Mutex<Vec<Arc<dyn ChannelObserver>>>,
    /// Whether outbound traffic can reach the host right now. Held while a
    /// call is registered and queued so a connection loss cannot split them.
    link: Mutex<bool>,
    open: AtomicBool,
    ping_sent: Mutex<Option<Instant>>,
    latency: Mutex<Option<Duration>>,
}

impl Shared {
    pub(crate) fn new(
        config: ChannelConfig,
        kind: TransportKind,
        table: FunctionTable,
        callbacks: Arc<dyn UiCallbacks>,
        observers: Vec<Arc<dyn ChannelObserver>>,
    ) -> Self {
        Self {
            config,
            kind,
            pending: PendingCalls::new(),
            protocol: Mutex::new(None),
            table: RwLock::new(table),
            callbacks,
            observers: Mutex::new(observers),
            // native and stub transports are usable from the start
            link: Mutex::new(kind != TransportKind::Socket),
            open: AtomicBool::new(false),
            ping_sent: Mutex::new(None),
            latency: Mutex::new(None),
        }
    }

    /// Wire mode, text until the first received frame says otherwise.
    pub(crate) fn protocol(&self) -> Protocol {
        self.protocol.lock().unwrap_or(Protocol::Text)
    }

    pub(crate) fn is_probed(&self) -> bool {
        self.protocol.lock().is_some()
    }

    /// Lock the wire mode to that of `frame` if not yet decided.
    pub(crate) fn probe(&self, frame: &Frame) {
        let mut protocol = self.protocol.lock();
        if protocol.is_some() {
            return;
        }
        let detected = Protocol::probe(frame);
        *protocol = Some(detected);
        drop(protocol);

        tracing::debug!("Detected {} protocol", detected);
        if detected == Protocol::Binary {
            self.table.write().index_by_hash();
        }
    }

    /// Pending-call key for an outbound call to `name`. Binary replies only
    /// carry the hash, text replies carry the full name.
    pub(crate) fn call_id(&self, name: &str) -> FunctionId {
        match self.protocol.lock().as_ref() {
            Some(Protocol::Binary) => FunctionId::Hash(FunctionKey::of(name)),
            _ => FunctionId::Name(name.to_string()),
        }
    }

    pub(crate) fn encode(&self, envelope: &Envelope) -> Result<Frame> {
        codec::encode(envelope, self.protocol())
    }

    pub(crate) fn receive_frame(&self, frame: &Frame) {
        match codec::decode(frame) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => tracing::warn!("Dropping undecodable {}-byte frame: {}", frame.len(), e),
        }
    }

    /// Route one inbound envelope: latency probe reply, pending call,
    /// registered function, then the catch-all callback.
    pub(crate) fn dispatch(&self, envelope: Envelope) {
        let Envelope { function, args } = envelope;

        if function.matches(PONG) {
            self.record_pong();
            return;
        }

        let args = match self.pending.resolve(&function, args) {
            Ok(_) => return,
            Err(args) => args,
        };

        let handler = self.table.read().lookup(&function);
        match handler {
            Some(handler) => handler(&args),
            None => {
                tracing::trace!("Unclaimed message {} with {} args", function, args.len());
                self.callbacks.message_received(&function, &args);
            }
        }
    }

    pub(crate) fn register(&self, name: &str, handler: impl Fn(&[Value]) + Send + Sync + 'static) {
        self.table.write().register(name, handler);
    }

    pub(crate) fn subscribe(&self, observer: Arc<dyn ChannelObserver>) {
        self.observers.lock().push(observer);
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn set_open(&self) {
        if self.open.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Message channel open ({})", self.kind);
        for observer in self.observers() {
            observer.channel_open();
        }
    }

    /// Run `send` only while connected. Fails without running it otherwise.
    pub(crate) fn while_connected<T>(&self, send: impl FnOnce() -> Result<T>) -> Result<T> {
        let link = self.link.lock();
        if !*link {
            return Err(ChannelError::ChannelClosed("not connected".to_string()));
        }
        send()
    }

    pub(crate) fn set_connected(&self) {
        *self.link.lock() = true;
    }

    /// Refuse further traffic, reject everything in flight and tell observers
    /// the channel closed.
    pub(crate) fn connection_lost(&self, reason: &str) {
        let rejected = {
            let mut link = self.link.lock();
            *link = false;
            self.pending.reject_all(reason)
        };
        *self.ping_sent.lock() = None;

        let was_open = self.open.swap(false, Ordering::AcqRel);
        if !was_open {
            return;
        }
        tracing::warn!(
            "Message channel closed: {} ({} pending calls rejected)",
            reason,
            rejected
        );
        for observer in self.observers() {
            observer.channel_closed();
        }
    }

    pub(crate) fn mark_ping(&self) {
        *self.ping_sent.lock() = Some(Instant::now());
    }

    pub(crate) fn network_latency(&self) -> Option<Duration> {
        *self.latency.lock()
    }

    fn record_pong(&self) {
        let Some(sent) = self.ping_sent.lock().take() else {
            tracing::trace!("Ignoring unsolicited pong");
            return;
        };
        let latency = sent.elapsed() / 2;
        *self.latency.lock() = Some(latency);

        tracing::trace!("Network latency {:?}", latency);
        for observer in self.observers() {
            observer.network_latency_changed(latency);
        }
    }

    fn observers(&self) -> Vec<Arc<dyn ChannelObserver>> {
        self.observers.lock().clone()
    }
}
