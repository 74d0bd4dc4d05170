//! Opaque JSON records and their identifiers.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A record identifier, normalized to its string form.
///
/// Source files mix string ids (`"id_str": "5581..."`) and integer ids
/// (`"id": 42`). Both are stored as strings so that a lookup for `42`
/// and a lookup for `"42"` agree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create an identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Normalize a JSON value into an identifier.
    ///
    /// Returns `None` for anything other than a string or an integer.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// One static record: a JSON object plus its extracted identifier.
///
/// The body is never inspected beyond the identifier field and is
/// serialized back out unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: Option<RecordId>,
    body: Map<String, Value>,
}

impl Record {
    /// Wrap a JSON object, extracting the identifier from `id_field`.
    pub fn new(body: Map<String, Value>, id_field: &str) -> Self {
        let id = body.get(id_field).and_then(RecordId::from_value);
        Self { id, body }
    }

    /// The record's identifier, if the identifier field was present.
    pub const fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}
