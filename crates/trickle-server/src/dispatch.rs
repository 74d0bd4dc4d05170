//! Per-connection dispatch of client commands.
//!
//! [`ChannelSession`] is the transport-independent half of a socket
//! connection: it knows which channel the client joined, turns inbound
//! commands into registry calls, and produces the events to send back.
//! The `WebSocket` plumbing lives in [`crate::ws`].
//!
//! A session owns the client's [`ClientSession`], so dropping it (which
//! happens however the connection task ends) stops every emitter the
//! client started.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use trickle_stream::cursor::parse_cursor_start;
use trickle_stream::{ClientId, ClientSession, StreamEvent};

use crate::channel::Channel;
use crate::protocol::{ClientCommand, ErrorKind, ServerEvent};
use crate::state::AppState;

/// One client's connection to one channel.
#[derive(Debug)]
pub struct ChannelSession {
    channel: Channel,
    session: ClientSession,
    state: Arc<AppState>,
}

impl ChannelSession {
    /// Register a newly connected client on `channel`.
    pub fn open(channel: Channel, state: Arc<AppState>) -> Self {
        let session = state.registry.open_session();
        info!(client = %session.client(), %channel, "client connected");
        Self {
            channel,
            session,
            state,
        }
    }

    /// The connected client.
    pub const fn client(&self) -> ClientId {
        self.session.client()
    }

    /// Acknowledgement sent right after the connection is accepted.
    pub fn greeting(&self) -> ServerEvent {
        ServerEvent::status(format!(
            "Connected: {} sid: {}",
            self.channel.display_name(),
            self.client()
        ))
    }

    /// Subscribe to the channel's record stream. `None` for keepalive.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Arc<StreamEvent>>> {
        self.channel.topic().map(|topic| self.state.hub.subscribe(topic))
    }

    /// Handle one inbound text frame.
    ///
    /// Returns the event to send back, if any. Malformed frames produce
    /// an error event; they never close the connection.
    pub fn handle_text(&self, text: &str) -> Option<ServerEvent> {
        match ClientCommand::parse(text) {
            Ok(command) => self.handle_command(&command),
            Err(e) => {
                debug!(client = %self.client(), error = %e, "unparseable client message");
                Some(ServerEvent::error(
                    ErrorKind::InvalidMessage,
                    format!("invalid message: {e}"),
                ))
            }
        }
    }

    /// Handle one parsed command.
    pub fn handle_command(&self, command: &ClientCommand) -> Option<ServerEvent> {
        debug!(client = %self.client(), channel = %self.channel, ?command, "client command");
        match (self.channel, command) {
            (Channel::Keepalive, ClientCommand::Ping) => {
                debug!(client = %self.client(), "pong");
                Some(ServerEvent::Pong)
            }
            (Channel::Data(topic), ClientCommand::Start { .. }) => {
                let offset = match parse_cursor_start(command.cursor_start()) {
                    Ok(offset) => offset,
                    Err(e) => {
                        warn!(client = %self.client(), %topic, error = %e, "start rejected");
                        return Some(ServerEvent::error(
                            ErrorKind::InvalidOffset,
                            e.to_string(),
                        ));
                    }
                };
                self.session
                    .start(self.state.corpus(topic), self.state.channel(topic), offset);
                Some(ServerEvent::status(format!(
                    "Starting Stream: {}",
                    topic.display_name()
                )))
            }
            (Channel::Data(topic), ClientCommand::Stop) => {
                let stopped = self.session.stop_all();
                debug!(client = %self.client(), %topic, stopped, "stop requested");
                Some(ServerEvent::status(format!(
                    "Stopped Stream: {}",
                    topic.display_name()
                )))
            }
            (channel, command) => Some(ServerEvent::error(
                ErrorKind::UnsupportedCommand,
                format!("{} is not supported on the {channel} channel", command_name(command)),
            )),
        }
    }

    /// Number of emitters this client currently owns.
    pub fn emitter_count(&self) -> usize {
        self.session.emitter_count()
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        info!(client = %self.client(), channel = %self.channel, "client disconnected");
    }
}

const fn command_name(command: &ClientCommand) -> &'static str {
    match command {
        ClientCommand::Start { .. } => "start",
        ClientCommand::Stop => "stop",
        ClientCommand::Ping => "ping",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};
    use trickle_corpus::{Corpus, CorpusStore, RecordId, Topic};
    use trickle_stream::{JitterDelay, RegistryConfig, StartPolicy};

    use super::*;

    fn state() -> Arc<AppState> {
        let travel: Vec<Value> = (1..=6).map(|n| json!({"id_str": n.to_string()})).collect();
        let gifs: Vec<Value> = (1..=30).map(|n| json!({"id": n})).collect();
        let corpora = CorpusStore::new([
            Corpus::from_value(Topic::Travel, json!({ "tfl": travel })).unwrap(),
            Corpus::from_value(Topic::Gifs, json!({ "gifs": gifs })).unwrap(),
        ]);
        let registry = RegistryConfig {
            default_cursor_start: 5,
            delay: JitterDelay::fixed(Duration::from_secs(4)),
            policy: StartPolicy::Stack,
        };
        Arc::new(AppState::new(corpora, registry, 64))
    }

    fn to_json(event: Option<ServerEvent>) -> Value {
        serde_json::to_value(event.unwrap()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn greeting_names_channel_and_client() {
        let session = ChannelSession::open(Channel::Data(Topic::Travel), state());
        let greeting = to_json(Some(session.greeting()));
        assert_eq!(
            greeting["payload"]["data"],
            json!(format!("Connected: Travel sid: {}", session.client()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn default_start_streams_from_index_five() {
        let session = ChannelSession::open(Channel::Data(Topic::Travel), state());
        let mut rx = session.subscribe().unwrap();

        let reply = to_json(session.handle_text(r#"{"event": "start"}"#));
        assert_eq!(reply["payload"]["data"], json!("Starting Stream: Travel"));
        assert_eq!(session.emitter_count(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.idx, 5);
        assert_eq!(event.data.id(), Some(&RecordId::new("6")));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_zero_offset_is_honored() {
        let session = ChannelSession::open(Channel::Data(Topic::Gifs), state());
        let mut rx = session.subscribe().unwrap();

        session.handle_text(r#"{"event": "start", "data": {"cursor_start": 0}}"#);
        assert_eq!(rx.recv().await.unwrap().idx, 0);
        assert_eq!(rx.recv().await.unwrap().idx, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_offset_is_reported_not_started() {
        let session = ChannelSession::open(Channel::Data(Topic::Gifs), state());
        let reply = to_json(session.handle_text(r#"{"event": "start", "cursor_start": -3}"#));

        assert_eq!(reply["event"], json!("error"));
        assert_eq!(reply["payload"]["kind"], json!("invalid_offset"));
        assert_eq!(session.emitter_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frame_gets_error_event() {
        let session = ChannelSession::open(Channel::Data(Topic::Gifs), state());
        let reply = to_json(session.handle_text("not json"));
        assert_eq!(reply["payload"]["kind"], json!("invalid_message"));
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_only_answers_ping() {
        let state = state();
        let session = ChannelSession::open(Channel::Keepalive, Arc::clone(&state));
        assert!(session.subscribe().is_none());

        assert_eq!(to_json(session.handle_text(r#"{"event": "ping"}"#)), json!({"event": "pong"}));

        let reply = to_json(session.handle_text(r#"{"event": "start"}"#));
        assert_eq!(reply["payload"]["kind"], json!("unsupported_command"));
        assert_eq!(state.registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_command_stops_this_clients_streams() {
        let state = state();
        let session = ChannelSession::open(Channel::Data(Topic::Gifs), Arc::clone(&state));
        session.handle_text(r#"{"event": "start"}"#);
        session.handle_text(r#"{"event": "start", "cursor_start": 2}"#);
        assert_eq!(state.registry.count(), 2);

        let reply = to_json(session.handle_text(r#"{"event": "stop"}"#));
        assert_eq!(reply["payload"]["data"], json!("Stopped Stream: Gifs"));
        assert_eq!(state.registry.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_stops_only_that_client() {
        let state = state();
        let leaving = ChannelSession::open(Channel::Data(Topic::Gifs), Arc::clone(&state));
        let staying = ChannelSession::open(Channel::Data(Topic::Gifs), Arc::clone(&state));
        leaving.handle_text(r#"{"event": "start"}"#);
        leaving.handle_text(r#"{"event": "start"}"#);
        staying.handle_text(r#"{"event": "start"}"#);
        assert_eq!(state.registry.count(), 3);

        drop(leaving);
        assert_eq!(state.registry.count(), 1);
        assert_eq!(staying.emitter_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn records_fan_out_to_every_client_on_the_topic() {
        let state = state();
        let starter = ChannelSession::open(Channel::Data(Topic::Travel), Arc::clone(&state));
        let watcher = ChannelSession::open(Channel::Data(Topic::Travel), Arc::clone(&state));
        let mut watcher_rx = watcher.subscribe().unwrap();

        starter.handle_text(r#"{"event": "start", "cursor_start": 4}"#);
        assert_eq!(watcher_rx.recv().await.unwrap().idx, 4);
        assert_eq!(watcher.emitter_count(), 0);
    }
}
