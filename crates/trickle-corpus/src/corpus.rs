//! An ordered, immutable sequence of records with an identifier index.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::LoadError;
use crate::record::{Record, RecordId};
use crate::topic::Topic;

/// The records of one topic, in source order.
///
/// The identifier set is built once from the records and is exactly the
/// projection of the topic's id field across them. There is no way to
/// mutate a corpus after construction, so the two cannot drift apart.
///
/// Records are held behind [`Arc`] so emitters can publish them without
/// copying the JSON body.
#[derive(Debug)]
pub struct Corpus {
    topic: Topic,
    records: Vec<Arc<Record>>,
    ids: HashSet<RecordId>,
}

impl Corpus {
    /// Build a corpus from already-extracted records.
    pub fn from_records(topic: Topic, records: Vec<Record>) -> Self {
        let mut missing_ids: usize = 0;
        let mut ids = HashSet::with_capacity(records.len());
        for record in &records {
            match record.id() {
                Some(id) => {
                    ids.insert(id.clone());
                }
                None => missing_ids = missing_ids.saturating_add(1),
            }
        }

        if missing_ids > 0 {
            warn!(
                %topic,
                missing_ids,
                id_field = topic.id_field(),
                "records without an identifier will stream but cannot be looked up"
            );
        }

        Self {
            topic,
            records: records.into_iter().map(Arc::new).collect(),
            ids,
        }
    }

    /// Build a corpus from a parsed source document.
    ///
    /// The document must be an object holding an array of objects under
    /// the topic's [`source_key`](Topic::source_key).
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::MissingKey`], [`LoadError::NotAnArray`] or
    /// [`LoadError::NotAnObject`] when the document has the wrong shape.
    pub fn from_value(topic: Topic, document: Value) -> Result<Self, LoadError> {
        let key = topic.source_key();
        let Value::Object(mut root) = document else {
            return Err(LoadError::MissingKey { topic, key });
        };
        let entries = match root.remove(key) {
            None | Some(Value::Null) => return Err(LoadError::MissingKey { topic, key }),
            Some(Value::Array(entries)) => entries,
            Some(_) => return Err(LoadError::NotAnArray { topic, key }),
        };

        let id_field = topic.id_field();
        let records = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(body) => Ok(Record::new(body, id_field)),
                _ => Err(LoadError::NotAnObject { topic, index }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_records(topic, records))
    }

    /// Read and parse a corpus source file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the file cannot be read,
    /// [`LoadError::Json`] if it is not valid JSON, or any shape error
    /// from [`from_value`](Self::from_value).
    pub fn load(topic: Topic, path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            topic,
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value = serde_json::from_slice(&bytes).map_err(|source| LoadError::Json {
            topic,
            path: path.to_path_buf(),
            source,
        })?;
        let corpus = Self::from_value(topic, document)?;

        info!(
            %topic,
            path = %path.display(),
            records = corpus.len(),
            ids = corpus.ids.len(),
            "corpus loaded"
        );
        Ok(corpus)
    }

    /// The topic this corpus belongs to.
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Number of records.
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus holds no records.
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record at `idx`, if in range.
    pub fn get(&self, idx: usize) -> Option<&Arc<Record>> {
        self.records.get(idx)
    }

    /// Iterate over all records in source order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Record>> {
        self.records.iter()
    }

    /// The first `n` records (fewer if the corpus is shorter).
    pub fn head(&self, n: usize) -> &[Arc<Record>] {
        let end = n.min(self.records.len());
        self.records.get(..end).unwrap_or_default()
    }

    /// Whether `id` identifies some record in this corpus.
    pub fn exists(&self, id: &RecordId) -> bool {
        self.ids.contains(id)
    }

    /// Whether a raw JSON id (string or integer) identifies some record.
    pub fn contains_value(&self, id: &Value) -> bool {
        RecordId::from_value(id).is_some_and(|id| self.exists(&id))
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Arc<Record>;
    type IntoIter = std::slice::Iter<'a, Arc<Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
