//! HTTP + `WebSocket` server for the Trickle record streamer.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **Channel sockets** (`/ws/travel`, `/ws/reviews`, `/ws/gifs`,
//!   `/ws/keepalive`) that accept `start`, `stop` and `ping` commands
//!   and push records as emitters publish them
//! - **Query endpoints** (`/websocket_ct`, `/sync`, `/threads`,
//!   `/emitters`, `/star`) answered from the in-memory corpora and the
//!   emitter registry
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Each socket connection owns a [`ChannelSession`]. Commands are parsed
//! into [`ClientCommand`]s and dispatched to the shared
//! [`EmitterRegistry`](trickle_stream::EmitterRegistry); records reach the
//! socket through the topic's broadcast channel. Dropping the session
//! stops every emitter the connection started.

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use channel::Channel;
pub use config::{ConfigError, TrickleConfig};
pub use dispatch::ChannelSession;
pub use error::ApiError;
pub use protocol::{ClientCommand, ServerEvent};
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::AppState;
