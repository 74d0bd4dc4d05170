//! Validation of client-supplied start offsets.

use serde_json::Value;

use crate::error::StreamError;

/// Interpret a `cursor_start` value sent by a client.
///
/// `None` and JSON `null` mean "use the default offset". Any
/// non-negative integer is accepted as-is, including `0`. Negative
/// numbers, fractions, strings and every other JSON type are rejected
/// rather than wrapped or coerced.
///
/// # Errors
///
/// Returns [`StreamError::InvalidOffset`] for anything that is not a
/// non-negative integer.
pub fn parse_cursor_start(value: Option<&Value>) -> Result<Option<usize>, StreamError> {
    let Some(value) = value else {
        return Ok(None);
    };

    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let raw = n.as_u64().ok_or_else(|| {
                StreamError::InvalidOffset(format!("{n} is not a non-negative integer"))
            })?;
            usize::try_from(raw)
                .map(Some)
                .map_err(|e| StreamError::InvalidOffset(format!("{raw} is out of range: {e}")))
        }
        other => Err(StreamError::InvalidOffset(format!(
            "expected an integer, got {other}"
        ))),
    }
}
