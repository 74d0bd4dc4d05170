//! Error types for corpus loading.
//!
//! Every variant is fatal at startup: the server must not come up with
//! an incomplete corpus.

use std::path::PathBuf;

use crate::topic::Topic;

/// Errors that can occur while loading a corpus.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The source file could not be read.
    #[error("failed to read {topic} corpus from {}: {source}", path.display())]
    Io {
        /// Topic being loaded.
        topic: Topic,
        /// Path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The source file is not valid JSON.
    #[error("malformed {topic} corpus in {}: {source}", path.display())]
    Json {
        /// Topic being loaded.
        topic: Topic,
        /// Path that was parsed.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// The document has no array under the expected top-level key.
    #[error("{topic} corpus is missing top-level key `{key}`")]
    MissingKey {
        /// Topic being loaded.
        topic: Topic,
        /// The key that was expected.
        key: &'static str,
    },

    /// The top-level key exists but does not hold an array.
    #[error("{topic} corpus key `{key}` is not an array")]
    NotAnArray {
        /// Topic being loaded.
        topic: Topic,
        /// The offending key.
        key: &'static str,
    },

    /// An element of the record array is not a JSON object.
    #[error("{topic} corpus entry {index} is not an object")]
    NotAnObject {
        /// Topic being loaded.
        topic: Topic,
        /// Position of the offending entry.
        index: usize,
    },
}
