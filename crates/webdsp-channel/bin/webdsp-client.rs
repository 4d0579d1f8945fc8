//! Network UI client entry point
//!
//! Connects to a running host, logs everything the host sends and reports
//! latency until interrupted.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use webdsp_channel::{
    ChannelConfig, ChannelObserver, Environment, FunctionId, MessageChannel, Result, UiCallbacks,
    Value,
};

struct LogCallbacks;

impl UiCallbacks for LogCallbacks {
    fn parameter_changed(&self, index: u32, value: f64) {
        tracing::info!("Parameter {} = {}", index, value);
    }

    fn state_changed(&self, key: &str, value: &str) {
        tracing::info!("State {} = {:?}", key, value);
    }

    fn size_changed(&self, width: f64, height: f64) {
        tracing::info!("Size {}x{}", width, height);
    }

    fn program_loaded(&self, index: u32) {
        tracing::info!("Program {} loaded", index);
    }

    fn sample_rate_changed(&self, rate: f64) {
        tracing::info!("Sample rate {} Hz", rate);
    }

    fn message_received(&self, function: &FunctionId, args: &[Value]) {
        tracing::info!("Message {} {:?}", function, args);
    }
}

struct LogObserver {
    opened: Arc<Notify>,
}

impl ChannelObserver for LogObserver {
    fn channel_open(&self) {
        tracing::info!("Channel open");
        self.opened.notify_one();
    }

    fn channel_closed(&self) {
        tracing::warn!("Channel closed");
    }

    fn network_latency_changed(&self, latency: Duration) {
        tracing::info!("Latency {:?}", latency);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = ChannelConfig::from_env();
    if let Some(endpoint) = env::args().nth(1) {
        config = config.endpoint(endpoint);
    }

    let opened = Arc::new(Notify::new());
    let channel = MessageChannel::builder()
        .environment(Environment::network())
        .config(config)
        .callbacks(Arc::new(LogCallbacks))
        .observer(Arc::new(LogObserver {
            opened: opened.clone(),
        }))
        .connect()?;

    tracing::info!("Connecting to {}", channel.config().url().unwrap_or_default());
    // calls fail until a connection is up
    opened.notified().await;

    match channel.get_public_url().await {
        Ok(url) => tracing::info!("Host UI served at {}", url),
        Err(e) => tracing::warn!("Could not query public URL: {}", e),
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Client shutting down");
    channel.close().await;

    Ok(())
}
