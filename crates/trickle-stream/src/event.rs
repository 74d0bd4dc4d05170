//! The event published for every emitted record.

use std::sync::Arc;

use serde::Serialize;
use trickle_corpus::Record;

/// One record published on a topic channel, with its corpus index.
///
/// Serializes as `{"data": <record>, "idx": <index>}`.
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    /// The record body.
    pub data: Arc<Record>,
    /// Position of the record in its corpus.
    pub idx: usize,
}
