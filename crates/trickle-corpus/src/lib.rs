//! Static record corpora for the Trickle streaming server.
//!
//! Three corpora are loaded once at process start and never change
//! afterwards: travel updates, business reviews and GIF metadata. Each
//! corpus keeps its records in source order together with a derived
//! identifier set, so "is this id known" checks are O(1).
//!
//! # Modules
//!
//! - [`topic`] -- The closed set of data topics and their source layout.
//! - [`record`] -- Opaque JSON records and normalized [`RecordId`]s.
//! - [`corpus`] -- An ordered, immutable [`Corpus`] with its id index.
//! - [`store`] -- [`CorpusStore`], the three corpora loaded from disk.
//! - [`error`] -- [`LoadError`], fatal at startup.

pub mod corpus;
pub mod error;
pub mod record;
pub mod store;
pub mod topic;

pub use corpus::Corpus;
pub use error::LoadError;
pub use record::{Record, RecordId};
pub use store::{CorpusFiles, CorpusStore};
pub use topic::{Topic, UnknownTopic};
