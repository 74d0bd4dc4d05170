//! REST API endpoint handlers for the Trickle server.
//!
//! All handlers are pure reads over the corpora and the emitter registry.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/websocket_ct` | Socket server URL and channel paths |
//! | `GET` | `/sync` | First five records of each corpus |
//! | `GET` | `/threads` | Number of tracked emitters |
//! | `GET` | `/emitters` | Per-emitter diagnostics |
//! | `POST` | `/star` | Check that a record id exists |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::{Html, IntoResponse};
use serde_json::{Map, Value};
use trickle_corpus::{RecordId, Topic, UnknownTopic};

use crate::channel::Channel;
use crate::error::ApiError;
use crate::state::AppState;

/// Number of records per corpus returned by `/sync`.
pub const SYNC_SAMPLE_SIZE: usize = 5;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing corpus sizes and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let travel = state.corpora.get(Topic::Travel).len();
    let reviews = state.corpora.get(Topic::Reviews).len();
    let gifs = state.corpora.get(Topic::Gifs).len();
    let emitters = state.registry.count();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Trickle</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        code {{ color: #7ee787; }}
    </style>
</head>
<body>
    <h1>Trickle</h1>
    <p class="subtitle">Static record streamer</p>

    <div>
        <div class="metric">
            <div class="label">Travel</div>
            <div class="value">{travel}</div>
        </div>
        <div class="metric">
            <div class="label">Reviews</div>
            <div class="value">{reviews}</div>
        </div>
        <div class="metric">
            <div class="label">Gifs</div>
            <div class="value">{gifs}</div>
        </div>
        <div class="metric">
            <div class="label">Emitters</div>
            <div class="value">{emitters}</div>
        </div>
    </div>

    <h2>API Endpoints</h2>
    <ul>
        <li><code>GET</code> <a href="/websocket_ct">/websocket_ct</a> -- Socket server and channels</li>
        <li><code>GET</code> <a href="/sync">/sync</a> -- First five records of each corpus</li>
        <li><code>GET</code> <a href="/threads">/threads</a> -- Active emitter count</li>
        <li><code>GET</code> <a href="/emitters">/emitters</a> -- Active emitters</li>
        <li><code>POST</code> /star -- Check a record id</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/travel</code></li>
        <li><code>ws://host:port/ws/reviews</code></li>
        <li><code>ws://host:port/ws/gifs</code></li>
        <li><code>ws://host:port/ws/keepalive</code></li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /websocket_ct -- socket server discovery
// ---------------------------------------------------------------------------

/// Return the socket server root and the path of every channel.
///
/// The server root is taken from the request's `Host` header.
pub async fn websocket_ct(headers: HeaderMap) -> impl IntoResponse {
    let socket_server = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map_or_else(|| "/".to_owned(), |host| format!("http://{host}/"));

    let mut namespaces = Map::new();
    for channel in Channel::ALL {
        let key = match channel {
            Channel::Keepalive => "keepalive_namespace",
            Channel::Data(Topic::Travel) => "travel_namespace",
            Channel::Data(Topic::Reviews) => "review_namespace",
            Channel::Data(Topic::Gifs) => "gif_namespace",
        };
        namespaces.insert(key.to_owned(), Value::String(channel.path()));
    }

    Json(serde_json::json!({
        "socket_server": socket_server,
        "namespaces": namespaces,
    }))
}

// ---------------------------------------------------------------------------
// GET /sync -- first records of each corpus
// ---------------------------------------------------------------------------

/// Return the first [`SYNC_SAMPLE_SIZE`] records of every corpus.
pub async fn sync(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let mut body = Map::new();
    for topic in Topic::ALL {
        let head = state.corpora.get(topic).head(SYNC_SAMPLE_SIZE);
        body.insert(topic.as_str().to_owned(), serde_json::to_value(head)?);
    }
    Ok(Json(Value::Object(body)))
}

// ---------------------------------------------------------------------------
// GET /threads, GET /emitters -- emitter diagnostics
// ---------------------------------------------------------------------------

/// Return the number of emitters currently tracked by the registry.
pub async fn threads(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "threads": state.registry.count() }))
}

/// Return one entry per tracked emitter.
pub async fn emitters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let emitters = state.registry.summaries();
    Json(serde_json::json!({
        "count": emitters.len(),
        "emitters": emitters,
    }))
}

// ---------------------------------------------------------------------------
// POST /star -- record existence check
// ---------------------------------------------------------------------------

/// Check that a record id exists in the named corpus.
///
/// # Body
///
/// `{"data_type": "travel" | "reviews" | "gifs", "data_id": <string or integer>}`
///
/// # Errors
///
/// - `400` if the body is missing, not a JSON object, or either field is
///   null, `false`, zero or empty
/// - `400` if `data_type` is not the name of a known topic
/// - `404` if the id is not in the corpus
pub async fn star(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(ApiError::BadRequest("No data was supplied".to_owned())),
    };

    let data_type = request.get("data_type").filter(|v| is_supplied(v));
    let data_id = request.get("data_id").filter(|v| is_supplied(v));
    let (Some(data_type), Some(data_id)) = (data_type, data_id) else {
        return Err(ApiError::BadRequest(
            "No data type or no data id supplied".to_owned(),
        ));
    };

    let topic: Topic = match data_type {
        Value::String(name) => name
            .parse()
            .map_err(|e: UnknownTopic| ApiError::UnknownDataType(e.0))?,
        other => return Err(ApiError::UnknownDataType(other.to_string())),
    };

    let Some(id) = RecordId::from_value(data_id) else {
        return Err(ApiError::BadRequest(format!(
            "data id must be a string or an integer, got {data_id}"
        )));
    };

    if state.corpora.get(topic).exists(&id) {
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(ApiError::NotFound(format!("id: {id} not found")))
    }
}

/// Whether a JSON field counts as supplied. Null, `false`, zero and
/// empty strings, arrays and objects do not.
fn is_supplied(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(true) => true,
    }
}
