//! Error types for the HTTP and `WebSocket` API.
//!
//! [`ApiError`] unifies all request-level failure modes into a single enum
//! that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! variant except [`ApiError::Serialization`] is a client error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A socket was requested on a channel that does not exist.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// A query named a data type that does not exist.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// The requested record is not in the corpus.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or parameters are missing or malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A response body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownChannel(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnknownDataType(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::UnknownChannel(name) => format!("Channel not found: {name}"),
            Self::UnknownDataType(_) => "Data type not found".to_owned(),
            Self::NotFound(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::Serialization(e) => format!("JSON error: {e}"),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
