//! The UI side of the message channel.
//!
//! A [`MessageChannel`] owns one transport task. Remote functions are called
//! with [`MessageChannel::call`], which returns a future resolving with the
//! host's reply; fire-and-forget messages go through [`MessageChannel::post`].
//! Everything the host sends that is not a reply is routed to registered
//! functions or, failing that, to [`UiCallbacks::message_received`].

use crate::codec::{Envelope, Protocol};
use crate::config::ChannelConfig;
use crate::dispatch::{FunctionTable, Handler};
use crate::error::{ChannelError, Result};
use crate::observer::{ChannelObserver, NoCallbacks, OfflineIndicator, OfflineView, UiCallbacks};
use crate::pending::PendingCall;
use crate::shared::Shared;
use crate::transport::{self, Environment, NativeEndpoint, TransportKind};
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Function the host relays to every connected network client.
pub const BROADCAST: &str = "broadcast";

/// Handle to a running message channel.
///
/// Dropping the handle stops the transport task.
pub struct MessageChannel {
    shared: Arc<Shared>,
    environment: Environment,
    outbound: Option<mpsc::UnboundedSender<Envelope>>,
    task: Option<JoinHandle<()>>,
}

impl MessageChannel {
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::default()
    }

    /// Start a channel for `environment`. Must be called from within a tokio
    /// runtime.
    pub fn connect(
        environment: Environment,
        config: ChannelConfig,
        callbacks: Arc<dyn UiCallbacks>,
    ) -> Result<Self> {
        Self::builder()
            .environment(environment)
            .config(config)
            .callbacks(callbacks)
            .connect()
    }

    pub fn kind(&self) -> TransportKind {
        self.shared.kind
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    /// Wire mode; text until the host's first frame shows otherwise.
    pub fn protocol(&self) -> Protocol {
        self.shared.protocol()
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    /// Half the last measured ping round trip. Only the socket transport
    /// measures latency.
    pub fn network_latency(&self) -> Option<Duration> {
        self.shared.network_latency()
    }

    /// Calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn subscribe(&self, observer: Arc<dyn ChannelObserver>) {
        self.shared.subscribe(observer);
    }

    /// Make `name` callable by the host.
    pub fn register(&self, name: &str, handler: impl Fn(&[Value]) + Send + Sync + 'static) {
        self.shared.register(name, handler);
    }

    /// Call a remote function. The returned future resolves with the reply
    /// arguments, or fails when the channel closes first.
    ///
    /// The request is sent immediately; awaiting is only needed for the
    /// reply. A call made while the socket transport is disconnected fails
    /// right away and is never delivered.
    pub fn call(&self, name: &str, args: Vec<Value>) -> PendingCall {
        if self.kind() == TransportKind::Stub {
            let _ = self.send(Envelope::new(name, args));
            return PendingCall::ready(name, Ok(Vec::new()));
        }

        let queued = self.shared.while_connected(|| {
            let rx = self.shared.pending.register(self.shared.call_id(name));
            self.enqueue(Envelope::new(name, args))?;
            Ok(rx)
        });
        match queued {
            Ok(rx) => PendingCall::waiting(name, rx, self.shared.config.reply_timeout()),
            Err(e) => PendingCall::ready(name, Err(e)),
        }
    }

    /// Send a message without waiting for a reply. Fails while the socket
    /// transport is disconnected.
    pub fn post(&self, name: &str, args: Vec<Value>) -> Result<()> {
        self.send(Envelope::new(name, args))
    }

    /// Send a raw `[function, ...args]` list.
    pub fn post_message(&self, message: Vec<Value>) -> Result<()> {
        self.send(Envelope::from_values(message)?)
    }

    /// Ask the host to relay `args` to every connected client.
    pub fn broadcast_message(&self, args: Vec<Value>) -> Result<()> {
        self.post(BROADCAST, args)
    }

    /// Stop the transport, letting the socket close cleanly.
    pub async fn close(mut self) {
        self.outbound.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, envelope: Envelope) -> Result<()> {
        self.shared.while_connected(|| self.enqueue(envelope))
    }

    fn enqueue(&self, envelope: Envelope) -> Result<()> {
        tracing::trace!("-> {} ({} args)", envelope.function, envelope.args.len());
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| ChannelError::ChannelClosed("channel shut down".to_string()))?;
        outbound
            .send(envelope)
            .map_err(|_| ChannelError::ChannelClosed("transport task stopped".to_string()))
    }

    fn call_value(&self, name: &'static str) -> impl Future<Output = Result<Value>> + Send + 'static {
        let call = self.call(name, Vec::new());
        async move {
            let mut reply = call.await?;
            if reply.is_empty() {
                return Err(ChannelError::unexpected(name, "empty reply"));
            }
            Ok(reply.swap_remove(0))
        }
    }

    fn call_f64(&self, name: &'static str) -> impl Future<Output = Result<f64>> + Send + 'static {
        let value = self.call_value(name);
        async move {
            let value = value.await?;
            value.as_f64().ok_or_else(|| {
                ChannelError::unexpected(name, format!("expected a number, got {}", value))
            })
        }
    }

    fn call_bool(&self, name: &'static str) -> impl Future<Output = Result<bool>> + Send + 'static {
        let value = self.call_value(name);
        async move {
            let value = value.await?;
            value
                .as_bool()
                .or_else(|| value.as_f64().map(|n| n != 0.0))
                .ok_or_else(|| {
                    ChannelError::unexpected(name, format!("expected a boolean, got {}", value))
                })
        }
    }

    fn call_string(&self, name: &'static str) -> impl Future<Output = Result<String>> + Send + 'static {
        let value = self.call_value(name);
        async move {
            match value.await? {
                Value::String(s) => Ok(s),
                other => Err(ChannelError::unexpected(
                    name,
                    format!("expected a string, got {}", other),
                )),
            }
        }
    }

    /// Functions only an embedding plugin host implements.
    fn post_plugin_only(&self, name: &str, args: Vec<Value>) -> Result<()> {
        if !self.environment.plugin {
            tracing::debug!("{} is only available inside a plugin host", name);
            return Ok(());
        }
        self.post(name, args)
    }
}

/// Remote functions the host implements.
///
/// Value-returning functions send their request immediately; the returned
/// future only waits for the reply.
impl MessageChannel {
    pub fn get_width(&self) -> impl Future<Output = Result<f64>> + Send + 'static {
        self.call_f64("getWidth")
    }

    pub fn get_height(&self) -> impl Future<Output = Result<f64>> + Send + 'static {
        self.call_f64("getHeight")
    }

    pub fn set_width(&self, width: u32) -> Result<()> {
        self.post("setWidth", vec![width.into()])
    }

    pub fn set_height(&self, height: u32) -> Result<()> {
        self.post("setHeight", vec![height.into()])
    }

    pub fn is_resizable(&self) -> impl Future<Output = Result<bool>> + Send + 'static {
        self.call_bool("isResizable")
    }

    pub fn set_size(&self, width: u32, height: u32) -> Result<()> {
        self.post_plugin_only("setSize", vec![width.into(), height.into()])
    }

    pub fn send_note(&self, channel: u8, note: u8, velocity: u8) -> Result<()> {
        self.post("sendNote", vec![channel.into(), note.into(), velocity.into()])
    }

    pub fn get_sample_rate(&self) -> impl Future<Output = Result<f64>> + Send + 'static {
        self.call_f64("getSampleRate")
    }

    /// Start or end a host-side automation gesture on a parameter.
    pub fn edit_parameter(&self, index: u32, started: bool) -> Result<()> {
        self.post("editParameter", vec![index.into(), started.into()])
    }

    pub fn set_parameter_value(&self, index: u32, value: f64) -> Result<()> {
        self.post("setParameterValue", vec![index.into(), value.into()])
    }

    pub fn set_state(&self, key: &str, value: &str) -> Result<()> {
        self.post("setState", vec![key.into(), value.into()])
    }

    pub fn is_standalone(&self) -> impl Future<Output = Result<bool>> + Send + 'static {
        self.call_bool("isStandalone")
    }

    pub fn set_keyboard_focus(&self, focus: bool) -> Result<()> {
        self.post_plugin_only("setKeyboardFocus", vec![focus.into()])
    }

    pub fn open_system_web_browser(&self, url: &str) -> Result<()> {
        self.post_plugin_only("openSystemWebBrowser", vec![url.into()])
    }

    /// UI width in CSS pixels at initialization time.
    pub fn get_init_width_css(&self) -> impl Future<Output = Result<f64>> + Send + 'static {
        self.call_f64("getInitWidthCSS")
    }

    /// UI height in CSS pixels at initialization time.
    pub fn get_init_height_css(&self) -> impl Future<Output = Result<f64>> + Send + 'static {
        self.call_f64("getInitHeightCSS")
    }

    /// Ask the host to deliver messages it queued before the UI was ready.
    pub fn flush_init_message_queue(&self) -> Result<()> {
        self.post("flushInitMessageQueue", Vec::new())
    }

    /// Copy `data` into the host's shared memory region at `offset`.
    pub fn write_shared_memory(&self, data: &[u8], offset: u32) -> Result<()> {
        self.post("writeSharedMemory", vec![data.to_vec().into(), offset.into()])
    }

    pub fn get_public_url(&self) -> impl Future<Output = Result<String>> + Send + 'static {
        self.call_string("getPublicUrl")
    }

    pub fn is_zeroconf_published(&self) -> impl Future<Output = Result<bool>> + Send + 'static {
        self.call_bool("isZeroconfPublished")
    }

    pub fn set_zeroconf_published(&self, published: bool) -> Result<()> {
        self.post("setZeroconfPublished", vec![published.into()])
    }

    pub fn get_zeroconf_id(&self) -> impl Future<Output = Result<String>> + Send + 'static {
        self.call_string("getZeroconfId")
    }

    pub fn get_zeroconf_name(&self) -> impl Future<Output = Result<String>> + Send + 'static {
        self.call_string("getZeroconfName")
    }

    pub fn set_zeroconf_name(&self, name: &str) -> Result<()> {
        self.post("setZeroconfName", vec![name.into()])
    }
}

impl Drop for MessageChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Default)]
pub struct ChannelBuilder {
    environment: Option<Environment>,
    config: Option<ChannelConfig>,
    callbacks: Option<Arc<dyn UiCallbacks>>,
    native: Option<NativeEndpoint>,
    handlers: Vec<(String, Handler)>,
    observers: Vec<Arc<dyn ChannelObserver>>,
    offline_view: Option<Arc<dyn OfflineView>>,
}

impl ChannelBuilder {
    /// Defaults to [`Environment::from_env`].
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Defaults to [`ChannelConfig::from_env`].
    pub fn config(mut self, config: ChannelConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn callbacks(mut self, callbacks: Arc<dyn UiCallbacks>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    /// Host primitive for the native transport.
    pub fn native(mut self, endpoint: NativeEndpoint) -> Self {
        self.native = Some(endpoint);
        self
    }

    pub fn handler(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&[Value]) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.push((name.into(), Arc::new(handler)));
        self
    }

    /// Observers added here see the very first open notification.
    pub fn observer(mut self, observer: Arc<dyn ChannelObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Show `view` while the channel has been closed for longer than the
    /// configured grace period.
    pub fn offline_view(mut self, view: Arc<dyn OfflineView>) -> Self {
        self.offline_view = Some(view);
        self
    }

    pub fn connect(self) -> Result<MessageChannel> {
        let runtime = Handle::try_current()
            .map_err(|e| ChannelError::ConnectionFailed(format!("no async runtime: {}", e)))?;

        let environment = self.environment.unwrap_or_else(Environment::from_env);
        let config = self.config.unwrap_or_else(ChannelConfig::from_env);
        let kind = environment.transport_kind();
        let callbacks = self.callbacks.unwrap_or_else(|| Arc::new(NoCallbacks));

        let mut table = FunctionTable::with_ui_callbacks(Arc::clone(&callbacks));
        for (name, handler) in self.handlers {
            table.register(name, move |args| handler(args));
        }

        let mut observers = self.observers;
        if let Some(view) = self.offline_view {
            observers.push(Arc::new(OfflineIndicator::new(view, config.offline_grace())));
        }

        tracing::debug!("Starting {} message channel", kind);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(config, kind, table, callbacks, observers));
        let task = transport::spawn(
            &runtime,
            kind,
            Arc::clone(&shared),
            outbound_rx,
            &shared.config,
            self.native,
        )?;

        Ok(MessageChannel {
            shared,
            environment,
            outbound: Some(outbound_tx),
            task: Some(task),
        })
    }
}
