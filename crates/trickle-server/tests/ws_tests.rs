//! End-to-end tests for the channel sockets.
//!
//! Each test binds a real listener through `trickle_server::serve` and
//! talks to it with a `tokio-tungstenite` client, so the upgrade handler
//! and the connection loop run exactly as in production.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use trickle_corpus::{Corpus, CorpusStore, Topic};
use trickle_server::state::AppState;
use trickle_stream::{JitterDelay, RegistryConfig, StartPolicy};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn make_test_state() -> Arc<AppState> {
    let gifs: Vec<Value> = (1..=8).map(|n| json!({"id": n})).collect();
    let corpora = CorpusStore::new([
        Corpus::from_value(Topic::Gifs, json!({ "gifs": gifs })).unwrap(),
    ]);
    let registry = RegistryConfig {
        default_cursor_start: 5,
        delay: JitterDelay::fixed(Duration::from_millis(10)),
        policy: StartPolicy::Stack,
    };
    Arc::new(AppState::new(corpora, registry, 64))
}

/// Serve `state` on an ephemeral port. The server runs until the returned
/// sender is dropped.
async fn spawn_server(state: &Arc<AppState>) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(trickle_server::serve(listener, Arc::clone(state), async {
        let _ = rx.await;
    }));
    (addr, tx)
}

async fn connect(addr: SocketAddr, channel: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{channel}")).await.unwrap();
    ws
}

async fn send_json(ws: &mut Client, text: &str) {
    ws.send(Message::text(text.to_owned())).await.unwrap();
}

/// Next text frame, parsed. Control frames are skipped.
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Next event satisfying `pred`, skipping streamed records and anything
/// else in between.
async fn next_matching(ws: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    loop {
        let event = next_json(ws).await;
        if pred(&event) {
            return event;
        }
    }
}

fn is_record(event: &Value) -> bool {
    event["event"] == "message" && event["payload"].get("idx").is_some()
}

async fn wait_for_emitter_count(state: &AppState, expected: usize) {
    timeout(RECV_TIMEOUT, async {
        while state.registry.count() != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn data_channel_streams_records_and_survives_bad_frames() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;
    let mut ws = connect(addr, "gifs").await;

    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["event"], "message");
    assert!(
        greeting["payload"]["data"]
            .as_str()
            .unwrap()
            .starts_with("Connected: Gifs sid: ")
    );

    send_json(&mut ws, r#"{"event": "start"}"#).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"event": "message", "payload": {"data": "Starting Stream: Gifs"}})
    );
    assert_eq!(
        next_json(&mut ws).await,
        json!({"event": "message", "payload": {"data": {"id": 6}, "idx": 5}})
    );

    send_json(&mut ws, "this is not json").await;
    let error = next_matching(&mut ws, |e| e["event"] == "error").await;
    assert_eq!(error["payload"]["kind"], "invalid_message");

    send_json(&mut ws, r#"{"event": "start", "cursor_start": -1}"#).await;
    let error = next_matching(&mut ws, |e| e["event"] == "error").await;
    assert_eq!(error["payload"]["kind"], "invalid_offset");

    // The connection is still usable after both rejections.
    send_json(&mut ws, r#"{"event": "start", "data": {"cursor_start": 0}}"#).await;
    let started = next_matching(&mut ws, |e| !is_record(e)).await;
    assert_eq!(started["payload"]["data"], "Starting Stream: Gifs");
    let first = next_matching(&mut ws, |e| is_record(e) && e["payload"]["idx"] == 0).await;
    assert_eq!(first["payload"]["data"], json!({"id": 1}));

    assert_eq!(state.registry.count(), 2);
}

#[tokio::test]
async fn dropped_connection_stops_its_emitters() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;
    let mut ws = connect(addr, "gifs").await;
    next_json(&mut ws).await;

    send_json(&mut ws, r#"{"event": "start", "cursor_start": 0}"#).await;
    send_json(&mut ws, r#"{"event": "start", "cursor_start": 3}"#).await;
    next_matching(&mut ws, is_record).await;
    assert_eq!(state.registry.count(), 2);

    drop(ws);
    wait_for_emitter_count(&state, 0).await;
}

#[tokio::test]
async fn close_frame_stops_its_emitters() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;
    let mut ws = connect(addr, "gifs").await;
    next_json(&mut ws).await;

    send_json(&mut ws, r#"{"event": "start"}"#).await;
    next_matching(&mut ws, is_record).await;
    assert_eq!(state.registry.count(), 1);

    ws.close(None).await.unwrap();
    wait_for_emitter_count(&state, 0).await;
}

#[tokio::test]
async fn stop_command_leaves_other_clients_running() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;
    let mut stopper = connect(addr, "gifs").await;
    let mut other = connect(addr, "gifs").await;
    next_json(&mut stopper).await;
    next_json(&mut other).await;

    send_json(&mut stopper, r#"{"event": "start", "cursor_start": 0}"#).await;
    send_json(&mut other, r#"{"event": "start", "cursor_start": 0}"#).await;
    next_matching(&mut stopper, |e| !is_record(e)).await;
    next_matching(&mut other, |e| !is_record(e)).await;
    assert_eq!(state.registry.count(), 2);

    send_json(&mut stopper, r#"{"event": "stop"}"#).await;
    let stopped = next_matching(&mut stopper, |e| !is_record(e)).await;
    assert_eq!(stopped["payload"]["data"], "Stopped Stream: Gifs");
    assert_eq!(state.registry.count(), 1);
}

#[tokio::test]
async fn protocol_pings_get_pongs() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;
    let mut ws = connect(addr, "gifs").await;
    next_json(&mut ws).await;

    ws.send(Message::Ping(b"hb".to_vec().into())).await.unwrap();
    loop {
        let msg = timeout(RECV_TIMEOUT, ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Pong(data) = msg {
            assert_eq!(&data[..], b"hb");
            break;
        }
    }
}

#[tokio::test]
async fn keepalive_channel_answers_ping_only() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;
    let mut ws = connect(addr, "keepalive").await;

    let greeting = next_json(&mut ws).await;
    assert!(
        greeting["payload"]["data"]
            .as_str()
            .unwrap()
            .starts_with("Connected: Keepalive sid: ")
    );

    send_json(&mut ws, r#"{"event": "ping"}"#).await;
    assert_eq!(next_json(&mut ws).await, json!({"event": "pong"}));

    send_json(&mut ws, r#"{"event": "start"}"#).await;
    let error = next_json(&mut ws).await;
    assert_eq!(error["payload"]["kind"], "unsupported_command");
    assert_eq!(state.registry.count(), 0);
}

#[tokio::test]
async fn unknown_channel_refuses_the_handshake() {
    let state = make_test_state();
    let (addr, _shutdown) = spawn_server(&state).await;

    let result = connect_async(format!("ws://{addr}/ws/weather")).await;
    assert!(matches!(
        result,
        Err(WsError::Http(ref response)) if response.status().as_u16() == 404
    ));
}
