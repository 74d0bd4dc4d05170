//! Axum router construction for the Trickle server.
//!
//! Assembles the query API and the channel sockets into a single
//! [`Router`] with CORS enabled for browser clients on other origins.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/{channel}` -- `WebSocket` for `travel`, `reviews`, `gifs`, `keepalive`
/// - `GET /websocket_ct` -- socket server discovery
/// - `GET /sync` -- first records of each corpus
/// - `GET /threads` -- tracked emitter count
/// - `GET /emitters` -- tracked emitters
/// - `POST /star` -- record id lookup
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/{channel}", get(ws::ws_channel))
        // Query API
        .route("/websocket_ct", get(handlers::websocket_ct))
        .route("/sync", get(handlers::sync))
        .route("/threads", get(handlers::threads))
        .route("/emitters", get(handlers::emitters))
        .route("/star", post(handlers::star))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
