//! Error types for the streaming layer.

/// Errors raised when configuring or starting emitters.
///
/// None of these are fatal to a running emitter: they are reported to the
/// client that triggered them and no emitter is created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// A start offset was negative, fractional, or not a number.
    #[error("invalid cursor_start: {0}")]
    InvalidOffset(String),

    /// Cadence parameters cannot describe a delay distribution.
    #[error("invalid emit interval (mean {mean}s, std dev {std_dev}s): {reason}")]
    InvalidDelay {
        /// Requested mean, in seconds.
        mean: f64,
        /// Requested standard deviation, in seconds.
        std_dev: f64,
        /// Why the pair was rejected.
        reason: String,
    },
}
