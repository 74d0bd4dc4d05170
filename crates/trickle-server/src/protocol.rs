//! JSON message shapes exchanged over channel sockets.
//!
//! Every frame is a text frame holding one JSON object with an `event`
//! field.
//!
//! Inbound:
//!
//! ```json
//! {"event": "start", "cursor_start": 7}
//! {"event": "start", "data": {"cursor_start": 7}}
//! {"event": "stop"}
//! {"event": "ping"}
//! ```
//!
//! Outbound:
//!
//! ```json
//! {"event": "message", "payload": {"data": {...record...}, "idx": 7}}
//! {"event": "message", "payload": {"data": "Starting Stream: Travel"}}
//! {"event": "pong"}
//! {"event": "error", "payload": {"kind": "invalid_offset", "error": "..."}}
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trickle_stream::StreamEvent;

/// A control message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start streaming the channel's topic.
    Start {
        /// Start offset at the top level of the message.
        #[serde(default)]
        cursor_start: Option<Value>,
        /// Start offset nested under `data`.
        #[serde(default)]
        data: Option<StartData>,
    },
    /// Stop every stream this client started.
    Stop,
    /// Liveness probe.
    Ping,
}

impl ClientCommand {
    /// Parse a text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the frame is not a known command.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The requested start offset, wherever the client put it.
    ///
    /// A top-level `cursor_start` wins over one nested under `data`.
    pub fn cursor_start(&self) -> Option<&Value> {
        match self {
            Self::Start { cursor_start, data } => cursor_start
                .as_ref()
                .or_else(|| data.as_ref().and_then(|d| d.cursor_start.as_ref())),
            Self::Stop | Self::Ping => None,
        }
    }
}

/// The nested form of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartData {
    /// Start offset.
    #[serde(default)]
    pub cursor_start: Option<Value>,
}

/// An event sent to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A status line or a streamed record.
    Message(MessagePayload),
    /// Reply to `ping`.
    Pong,
    /// A request from this client was rejected.
    Error(ErrorPayload),
}

impl ServerEvent {
    /// A human-readable status message.
    pub fn status(text: impl Into<String>) -> Self {
        Self::Message(MessagePayload::Status { data: text.into() })
    }

    /// A streamed record.
    pub fn record(event: Arc<StreamEvent>) -> Self {
        Self::Message(MessagePayload::Record(event))
    }

    /// A rejected request.
    pub fn error(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            kind,
            error: error.into(),
        })
    }

    /// Serialize to the JSON text sent on the socket.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if a record body fails to serialize.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of a `message` event.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MessagePayload {
    /// `{"data": "<text>"}`.
    Status {
        /// The status text.
        data: String,
    },
    /// `{"data": <record>, "idx": <index>}`.
    Record(Arc<StreamEvent>),
}

/// Body of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub error: String,
}

/// Category of a rejected client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The frame was not a known command.
    InvalidMessage,
    /// `cursor_start` was negative or not an integer.
    InvalidOffset,
    /// The command is not available on this channel.
    UnsupportedCommand,
}
