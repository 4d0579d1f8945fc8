//! WebSocket transport against a scripted local host.

use crate::helpers::{local_listener, wait_until, RecordingUi, SOCKET_TIMEOUT};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use webdsp::channel::{
    decode, encode, ChannelConfig, Envelope, Environment, Frame, FunctionId, FunctionKey,
    MessageChannel, Protocol, Value,
};

type HostSocket = WebSocketStream<TcpStream>;

/// Every envelope the host received, with the wire mode it arrived in.
#[derive(Default)]
struct HostLog {
    received: Mutex<Vec<(Protocol, Envelope)>>,
}

impl HostLog {
    fn saw(&self, protocol: Protocol, function: &FunctionId) -> bool {
        self.received
            .lock()
            .iter()
            .any(|(p, envelope)| *p == protocol && envelope.function == *function)
    }
}

async fn accept(listener: &TcpListener) -> HostSocket {
    let (stream, _) = listener.accept().await.expect("accept failed");
    accept_async(stream).await.expect("websocket handshake failed")
}

async fn host_send(ws: &mut HostSocket, protocol: Protocol, envelope: Envelope) {
    let message = match encode(&envelope, protocol).expect("encode failed") {
        Frame::Text(text) => Message::Text(text),
        Frame::Binary(bytes) => Message::Binary(bytes),
    };
    ws.send(message).await.expect("host send failed");
}

/// Frame assembled without the crate's codec, as a foreign host would.
async fn host_send_raw(ws: &mut HostSocket, message: Message) {
    ws.send(message).await.expect("host send failed");
}

/// Answer `ping`, `getWidth` and `echo` until the client leaves. Drops the
/// connection without a close handshake when `hang_up_on` arrives.
async fn serve(
    mut ws: HostSocket,
    protocol: Protocol,
    log: Arc<HostLog>,
    width: i32,
    hang_up_on: Option<&'static str>,
) {
    while let Some(Ok(message)) = ws.next().await {
        let (mode, frame) = match message {
            Message::Text(text) => (Protocol::Text, Frame::Text(text)),
            Message::Binary(bytes) => (Protocol::Binary, Frame::Binary(bytes)),
            _ => continue,
        };
        let Ok(envelope) = decode(&frame) else {
            continue;
        };
        log.received.lock().push((mode, envelope.clone()));

        if hang_up_on.is_some_and(|name| envelope.function.matches(name)) {
            return;
        }
        if envelope.function.matches("ping") {
            host_send(&mut ws, protocol, Envelope::new("pong", vec![])).await;
        } else if envelope.function.matches("getWidth") {
            host_send(&mut ws, protocol, Envelope::new("getWidth", vec![width.into()])).await;
        } else if envelope.function.matches("echo") {
            host_send(&mut ws, protocol, Envelope::new("echo", envelope.args)).await;
        }
    }
}

fn network_channel(endpoint: String, ui: Arc<RecordingUi>, config: ChannelConfig) -> MessageChannel {
    MessageChannel::builder()
        .environment(Environment::network())
        .config(config.endpoint(endpoint))
        .callbacks(ui.clone())
        .observer(ui)
        .connect()
        .unwrap()
}

#[tokio::test]
async fn test_text_host_round_trip() {
    let (listener, endpoint) = local_listener().await;
    let log = Arc::new(HostLog::default());
    let host_log = log.clone();
    let host = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let greeting = serde_json::json!(["sampleRateChanged", 48000]);
        host_send_raw(&mut ws, Message::Text(greeting.to_string())).await;
        serve(ws, Protocol::Text, host_log, 640, None).await;
    });

    let ui = Arc::new(RecordingUi::default());
    let channel = network_channel(endpoint, ui.clone(), ChannelConfig::default());
    assert!(wait_until(|| channel.is_open()).await);
    assert_eq!(channel.protocol(), Protocol::Text);

    assert_eq!(channel.get_width().await.unwrap(), 640.0);
    assert!(wait_until(|| channel.network_latency().is_some()).await);
    assert_eq!(ui.events(), vec!["sampleRateChanged 48000"]);
    assert_eq!(ui.opened(), 1);

    assert!(log.saw(Protocol::Text, &FunctionId::from("ping")));
    assert!(log.saw(Protocol::Text, &FunctionId::from("getWidth")));

    channel.close().await;
    assert_eq!(ui.closed(), 1);
    tokio::time::timeout(SOCKET_TIMEOUT, host)
        .await
        .expect("host did not see the close")
        .unwrap();
}

#[tokio::test]
async fn test_binary_host_switches_wire_mode() {
    let (listener, endpoint) = local_listener().await;
    let log = Arc::new(HostLog::default());
    let host_log = log.clone();
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let function = FunctionKey::of("parameterChanged").to_wire();
        let greeting = bson::doc! { "0": function, "1": 3, "2": 0.5 };
        let mut bytes = Vec::new();
        greeting.to_writer(&mut bytes).expect("bson write failed");
        host_send_raw(&mut ws, Message::Binary(bytes)).await;
        serve(ws, Protocol::Binary, host_log, 320, None).await;
    });

    let ui = Arc::new(RecordingUi::default());
    let channel = network_channel(endpoint, ui.clone(), ChannelConfig::default());
    assert!(wait_until(|| channel.is_open()).await);
    assert_eq!(channel.protocol(), Protocol::Binary);

    // hashed identifiers resolve to the named UI callback
    assert!(wait_until(|| !ui.events().is_empty()).await);
    assert_eq!(ui.events(), vec!["parameterChanged 3 0.5"]);

    assert_eq!(channel.get_width().await.unwrap(), 320.0);
    let hashed = FunctionId::Hash(FunctionKey::of("getWidth"));
    assert!(log.saw(Protocol::Binary, &hashed));
    assert!(!log.saw(Protocol::Text, &FunctionId::from("getWidth")));

    channel
        .post("writeSharedMemory", vec![Value::Binary(vec![1, 2, 3]), 0.into()])
        .unwrap();
    let blob = FunctionId::Hash(FunctionKey::of("writeSharedMemory"));
    assert!(wait_until(|| log.saw(Protocol::Binary, &blob)).await);
    let args = log
        .received
        .lock()
        .iter()
        .find(|(_, envelope)| envelope.function == blob)
        .map(|(_, envelope)| envelope.args.clone());
    assert_eq!(args, Some(vec![Value::Binary(vec![1, 2, 3]), Value::from(0)]));
}

#[tokio::test]
async fn test_lost_connection_rejects_and_reconnects() {
    let (listener, endpoint) = local_listener().await;
    let log = Arc::new(HostLog::default());
    let host_log = log.clone();
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        host_send(&mut ws, Protocol::Text, Envelope::new("programLoaded", vec![1.into()])).await;
        serve(ws, Protocol::Text, host_log.clone(), 100, Some("getWidth")).await;

        // second session: no greeting, the client already knows the wire mode
        let ws = accept(&listener).await;
        serve(ws, Protocol::Text, host_log, 200, None).await;
    });

    let ui = Arc::new(RecordingUi::default());
    let config = ChannelConfig {
        reconnect_ms: 50,
        ..ChannelConfig::default()
    };
    let channel = network_channel(endpoint, ui.clone(), config);
    assert!(wait_until(|| channel.is_open()).await);

    let err = channel.get_width().await.unwrap_err();
    assert!(err.is_disconnect());
    assert!(wait_until(|| ui.closed() == 1).await);
    assert_eq!(channel.pending_calls(), 0);

    assert!(wait_until(|| ui.opened() == 2).await);
    assert_eq!(channel.get_width().await.unwrap(), 200.0);
    assert_eq!(ui.events(), vec!["programLoaded 1"]);
}

#[tokio::test]
async fn test_unreachable_host_keeps_retrying() {
    let (listener, endpoint) = local_listener().await;
    drop(listener);

    let ui = Arc::new(RecordingUi::default());
    let config = ChannelConfig {
        reconnect_ms: 20,
        ..ChannelConfig::default()
    };
    let channel = network_channel(endpoint, ui.clone(), config);
    let width = channel.get_width();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(!channel.is_open());
    // never opened, so never reported closed
    assert_eq!(ui.closed(), 0);
    assert!(width.await.unwrap_err().is_disconnect());
}

#[tokio::test]
async fn test_calls_while_disconnected_are_never_delivered() {
    let (listener, endpoint) = local_listener().await;
    drop(listener);

    let ui = Arc::new(RecordingUi::default());
    let config = ChannelConfig {
        reconnect_ms: 100,
        ..ChannelConfig::default()
    };
    let channel = network_channel(endpoint.clone(), ui.clone(), config);

    let before_connect = channel.call("echo", vec![1.into()]);
    assert!(before_connect.await.unwrap_err().is_disconnect());

    // the first attempt is refused; this lands during the back-off
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    let backing_off = channel.call("echo", vec![2.into()]);
    assert!(backing_off.await.unwrap_err().is_disconnect());
    assert!(channel.post("echo", vec![3.into()]).unwrap_err().is_disconnect());
    assert_eq!(channel.pending_calls(), 0);

    let listener = TcpListener::bind(endpoint.as_str()).await.unwrap();
    let log = Arc::new(HostLog::default());
    let host_log = log.clone();
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let greeting = serde_json::json!(["programLoaded", 0]);
        host_send_raw(&mut ws, Message::Text(greeting.to_string())).await;
        serve(ws, Protocol::Text, host_log, 0, None).await;
    });

    assert!(wait_until(|| channel.is_open()).await);
    let reply = channel.call("echo", vec![4.into()]).await.unwrap();
    assert_eq!(reply, vec![Value::from(4)]);

    let echoed: Vec<Vec<Value>> = log
        .received
        .lock()
        .iter()
        .filter(|(_, envelope)| envelope.function.matches("echo"))
        .map(|(_, envelope)| envelope.args.clone())
        .collect();
    assert_eq!(echoed, vec![vec![Value::from(4)]]);
    assert_eq!(ui.events(), vec!["programLoaded 0"]);
}

#[tokio::test]
async fn test_colliding_names_keep_their_replies_in_text_mode() {
    // "bC" and "cb" share a djb2 hash
    assert_eq!(FunctionKey::of("bC"), FunctionKey::of("cb"));

    let (listener, endpoint) = local_listener().await;
    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let greeting = serde_json::json!(["programLoaded", 0]);
        host_send_raw(&mut ws, Message::Text(greeting.to_string())).await;

        let mut asked = Vec::new();
        while asked.len() < 2 {
            let Some(Ok(Message::Text(text))) = ws.next().await else {
                return;
            };
            let envelope = decode(&Frame::Text(text)).expect("decode failed");
            if envelope.function.matches("bC") || envelope.function.matches("cb") {
                asked.push(envelope.function);
            }
        }
        // answer in reverse order, by full name
        for function in asked.into_iter().rev() {
            let name = function.name().unwrap_or_default().to_string();
            let reply = serde_json::json!([name, name]);
            host_send_raw(&mut ws, Message::Text(reply.to_string())).await;
        }
        while ws.next().await.is_some() {}
    });

    let ui = Arc::new(RecordingUi::default());
    let channel = network_channel(endpoint, ui.clone(), ChannelConfig::default());
    assert!(wait_until(|| channel.is_open()).await);

    let first = channel.call("bC", vec![]);
    let second = channel.call("cb", vec![]);
    assert_eq!(first.await.unwrap(), vec![Value::from("bC")]);
    assert_eq!(second.await.unwrap(), vec![Value::from("cb")]);
    assert_eq!(channel.pending_calls(), 0);
}
