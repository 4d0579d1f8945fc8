//! Message channel tests over the native and stub transports.

use crate::helpers::{settle, wait_until, RecordingHost, RecordingUi};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use webdsp::channel::{
    ChannelConfig, ChannelError, Environment, MessageChannel, NativeEndpoint, OfflineView,
    TransportKind, Value,
};

fn native_channel(
    config: ChannelConfig,
) -> (MessageChannel, Arc<RecordingHost>, Arc<RecordingUi>, UnboundedSender<Vec<Value>>) {
    let host = Arc::new(RecordingHost::default());
    let ui = Arc::new(RecordingUi::default());
    let (endpoint, to_ui) = NativeEndpoint::pair(host.clone());
    let channel = MessageChannel::builder()
        .environment(Environment::plugin())
        .config(config)
        .callbacks(ui.clone())
        .observer(ui.clone())
        .native(endpoint)
        .connect()
        .unwrap();
    (channel, host, ui, to_ui)
}

fn message(function: &str, args: Vec<Value>) -> Vec<Value> {
    let mut values = vec![Value::from(function)];
    values.extend(args);
    values
}

#[tokio::test]
async fn test_native_host_notifications_reach_ui() {
    let (channel, host, ui, to_ui) = native_channel(ChannelConfig::default());
    settle().await;
    assert!(channel.is_open());
    assert_eq!(ui.opened(), 1);
    assert_eq!(host.functions(), vec!["ready"]);

    to_ui.send(message("parameterChanged", vec![0.into(), 0.5.into()])).unwrap();
    to_ui.send(message("stateChanged", vec!["mode".into(), "warm".into()])).unwrap();
    to_ui.send(message("sizeChanged", vec![800.into(), 600.into()])).unwrap();
    to_ui.send(message("programLoaded", vec![2.into()])).unwrap();
    to_ui.send(message("sampleRateChanged", vec![48000.into()])).unwrap();
    to_ui.send(message("meter", vec![(-6.0).into(), (-7.5).into()])).unwrap();
    settle().await;

    assert_eq!(
        ui.events(),
        vec![
            "parameterChanged 0 0.5",
            "stateChanged mode warm",
            "sizeChanged 800 600",
            "programLoaded 2",
            "sampleRateChanged 48000",
            "message meter 2",
        ]
    );
}

#[tokio::test]
async fn test_overlapping_calls_resolve_in_order() {
    let (channel, host, ui, to_ui) = native_channel(ChannelConfig::default());

    let first = channel.call("getWidth", vec![]);
    let second = channel.call("getWidth", vec![]);
    let height = channel.call("getHeight", vec![]);
    assert_eq!(channel.pending_calls(), 3);
    settle().await;
    assert_eq!(host.functions(), vec!["ready", "getWidth", "getWidth", "getHeight"]);

    // replies for different functions may interleave
    to_ui.send(message("getHeight", vec![300.into()])).unwrap();
    to_ui.send(message("getWidth", vec![100.into()])).unwrap();
    to_ui.send(message("getWidth", vec![200.into()])).unwrap();

    assert_eq!(first.await.unwrap(), vec![Value::from(100)]);
    assert_eq!(second.await.unwrap(), vec![Value::from(200)]);
    assert_eq!(height.await.unwrap(), vec![Value::from(300)]);
    assert_eq!(channel.pending_calls(), 0);

    // nothing pending: the same function is an ordinary message
    to_ui.send(message("getWidth", vec![400.into()])).unwrap();
    settle().await;
    assert_eq!(ui.events(), vec!["message getWidth 1"]);
}

#[tokio::test]
async fn test_typed_helpers_over_native() {
    let (channel, host, _ui, to_ui) = native_channel(ChannelConfig::default());

    let sample_rate = channel.get_sample_rate();
    let standalone = channel.is_standalone();
    let zeroconf_name = channel.get_zeroconf_name();
    settle().await;

    to_ui.send(message("getSampleRate", vec![44100.into()])).unwrap();
    to_ui.send(message("isStandalone", vec![0.into()])).unwrap();
    to_ui.send(message("getZeroconfName", vec!["Studio".into()])).unwrap();

    assert_eq!(sample_rate.await.unwrap(), 44100.0);
    assert!(!standalone.await.unwrap());
    assert_eq!(zeroconf_name.await.unwrap(), "Studio");

    // a reply of the wrong type fails the typed helper only
    let url = channel.get_public_url();
    settle().await;
    to_ui.send(message("getPublicUrl", vec![7.into()])).unwrap();
    assert!(matches!(url.await, Err(ChannelError::UnexpectedReply { .. })));

    channel.send_note(0, 60, 127).unwrap();
    channel.edit_parameter(1, true).unwrap();
    channel.set_state("mode", "warm").unwrap();
    channel.set_keyboard_focus(true).unwrap();
    channel.broadcast_message(vec!["hello".into()]).unwrap();
    channel.flush_init_message_queue().unwrap();
    settle().await;

    let posted = host.posted.lock().clone();
    let tail = &posted[posted.len() - 6..];
    assert_eq!(tail[0], message("sendNote", vec![0.into(), 60.into(), 127.into()]));
    assert_eq!(tail[1], message("editParameter", vec![1.into(), true.into()]));
    assert_eq!(tail[2], message("setState", vec!["mode".into(), "warm".into()]));
    assert_eq!(tail[3], message("setKeyboardFocus", vec![true.into()]));
    assert_eq!(tail[4], message("broadcast", vec!["hello".into()]));
    assert_eq!(tail[5], message("flushInitMessageQueue", vec![]));
}

#[tokio::test]
async fn test_registered_function_and_passthrough() {
    let (channel, host, ui, to_ui) = native_channel(ChannelConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    channel.register("levels", move |args| sink.lock().extend_from_slice(args));

    to_ui.send(message("levels", vec![0.25.into(), 0.5.into()])).unwrap();
    settle().await;
    assert_eq!(*seen.lock(), vec![Value::from(0.25), Value::from(0.5)]);
    assert!(ui.events().is_empty());

    channel
        .post_message(vec!["custom".into(), 1.into(), "two".into()])
        .unwrap();
    assert!(matches!(channel.post_message(vec![]), Err(ChannelError::Protocol(_))));
    settle().await;
    assert_eq!(
        host.posted.lock().last().cloned(),
        Some(message("custom", vec![1.into(), "two".into()]))
    );
}

#[tokio::test]
async fn test_host_detach_rejects_pending_and_closes() {
    let (channel, _host, ui, to_ui) = native_channel(ChannelConfig::default());
    let width = channel.call("getWidth", vec![]);
    settle().await;
    assert_eq!(ui.opened(), 1);

    drop(to_ui);
    let err = width.await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(wait_until(|| ui.closed() == 1).await);
    assert!(!channel.is_open());
    assert_eq!(channel.pending_calls(), 0);
}

#[derive(Default)]
struct CountingView {
    shown: AtomicUsize,
    hidden: AtomicUsize,
}

impl OfflineView for CountingView {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_offline_view_after_grace() {
    let view = Arc::new(CountingView::default());
    let host = Arc::new(RecordingHost::default());
    let (endpoint, to_ui) = NativeEndpoint::pair(host);
    let config = ChannelConfig {
        offline_grace_ms: 20,
        ..ChannelConfig::default()
    };
    let channel = MessageChannel::builder()
        .environment(Environment::plugin())
        .config(config)
        .native(endpoint)
        .offline_view(view.clone())
        .connect()
        .unwrap();
    settle().await;
    assert!(channel.is_open());

    drop(to_ui);
    assert!(wait_until(|| view.shown.load(Ordering::SeqCst) == 1).await);
    assert_eq!(view.hidden.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stub_channel_without_host() {
    let ui = Arc::new(RecordingUi::default());
    let channel = MessageChannel::builder()
        .environment(Environment::dev())
        .config(ChannelConfig::default())
        .observer(ui.clone())
        .connect()
        .unwrap();
    assert_eq!(channel.kind(), TransportKind::Stub);

    assert!(channel.call("anything", vec![1.into()]).await.unwrap().is_empty());
    assert!(channel.get_height().await.is_err());

    // plugin-only functions are silently skipped
    channel.set_size(640, 480).unwrap();
    channel.open_system_web_browser("https://example.com").unwrap();
    channel.set_zeroconf_published(true).unwrap();

    settle().await;
    assert!(channel.is_open());
    assert_eq!(ui.opened(), 1);
    channel.close().await;
}
