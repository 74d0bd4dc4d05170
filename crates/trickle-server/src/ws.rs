//! `WebSocket` handler for channel connections.
//!
//! Clients connect to `GET /ws/{channel}` where `{channel}` is one of
//! `travel`, `reviews`, `gifs` or `keepalive`. Unknown channels are
//! refused with `404` before the upgrade.
//!
//! A data-channel connection subscribes to its topic's broadcast, so it
//! receives every record published on that topic. Commands from the
//! client are handed to [`ChannelSession`]. If a client falls behind,
//! lagged records are skipped and it resumes from the most recent one.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use trickle_stream::StreamEvent;

use crate::channel::Channel;
use crate::dispatch::ChannelSession;
use crate::protocol::ServerEvent;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection on a channel.
///
/// # Route
///
/// `GET /ws/{channel}`
pub async fn ws_channel(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let channel = match name.parse::<Channel>() {
        Ok(channel) => channel,
        Err(e) => return e.into_response(),
    };
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_ws(socket, channel, state))
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

/// Drive one connection until the client leaves.
///
/// The session is dropped when this returns, which stops the client's
/// emitters no matter which branch ended the loop.
async fn handle_ws(mut socket: WebSocket, channel: Channel, state: Arc<AppState>) {
    let session = ChannelSession::open(channel, state);

    if send_event(&mut socket, &session.greeting()).await.is_err() {
        debug!(client = %session.client(), "WebSocket client disconnected (greeting failed)");
        return;
    }

    let mut records = session.subscribe();

    loop {
        tokio::select! {
            // Receive a record published on this channel's topic.
            result = next_record(&mut records) => {
                match result {
                    Ok(event) => {
                        if send_event(&mut socket, &ServerEvent::record(event)).await.is_err() {
                            debug!(client = %session.client(), "WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(client = %session.client(), skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Topic channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Commands, pings and disconnects from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(client = %session.client(), "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = session.handle_text(text.as_str())
                            && send_event(&mut socket, &reply).await.is_err()
                        {
                            debug!(client = %session.client(), "WebSocket client disconnected (reply failed)");
                            return;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(client = %session.client(), "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(client = %session.client(), "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Binary frames and unsolicited pongs carry no commands.
                    }
                }
            }
        }
    }
}

/// Wait for the next record, or forever on channels without a topic.
async fn next_record(
    records: &mut Option<broadcast::Receiver<Arc<StreamEvent>>>,
) -> Result<Arc<StreamEvent>, RecvError> {
    match records {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Serialize and send one event. Serialization failures are logged and
/// skipped; only a dead socket is reported as an error.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let json = match event.to_json() {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize server event: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
