//! The three corpora, loaded together at startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::corpus::Corpus;
use crate::error::LoadError;
use crate::topic::Topic;

/// Source file locations for each topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFiles {
    /// Travel updates file.
    pub travel: PathBuf,
    /// Business reviews file.
    pub reviews: PathBuf,
    /// GIF metadata file.
    pub gifs: PathBuf,
}

impl CorpusFiles {
    /// The configured file for `topic`.
    pub fn path_for(&self, topic: Topic) -> &Path {
        match topic {
            Topic::Travel => &self.travel,
            Topic::Reviews => &self.reviews,
            Topic::Gifs => &self.gifs,
        }
    }
}

impl Default for CorpusFiles {
    fn default() -> Self {
        Self {
            travel: PathBuf::from(Topic::Travel.default_file()),
            reviews: PathBuf::from(Topic::Reviews.default_file()),
            gifs: PathBuf::from(Topic::Gifs.default_file()),
        }
    }
}

/// All corpora, shared read-only between the query API and emitters.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    travel: Arc<Corpus>,
    reviews: Arc<Corpus>,
    gifs: Arc<Corpus>,
}

impl CorpusStore {
    /// Assemble a store from corpora built elsewhere.
    ///
    /// Each corpus is filed under the topic it reports, so passing them in
    /// the wrong order is harmless. A topic with no corpus gets an empty
    /// one.
    pub fn new(corpora: impl IntoIterator<Item = Corpus>) -> Self {
        let mut travel = None;
        let mut reviews = None;
        let mut gifs = None;
        for corpus in corpora {
            let slot = match corpus.topic() {
                Topic::Travel => &mut travel,
                Topic::Reviews => &mut reviews,
                Topic::Gifs => &mut gifs,
            };
            *slot = Some(Arc::new(corpus));
        }

        let empty = |topic| Arc::new(Corpus::from_records(topic, Vec::new()));
        Self {
            travel: travel.unwrap_or_else(|| empty(Topic::Travel)),
            reviews: reviews.unwrap_or_else(|| empty(Topic::Reviews)),
            gifs: gifs.unwrap_or_else(|| empty(Topic::Gifs)),
        }
    }

    /// Load every corpus from `dir`, using the file names in `files`.
    ///
    /// Absolute paths in `files` are used as-is.
    ///
    /// # Errors
    ///
    /// Returns the first [`LoadError`] encountered; no partial store is
    /// ever returned.
    pub fn load(dir: &Path, files: &CorpusFiles) -> Result<Self, LoadError> {
        let corpora = Topic::ALL
            .into_iter()
            .map(|topic| Corpus::load(topic, &dir.join(files.path_for(topic))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(corpora))
    }

    /// The corpus for `topic`.
    pub const fn get(&self, topic: Topic) -> &Arc<Corpus> {
        match topic {
            Topic::Travel => &self.travel,
            Topic::Reviews => &self.reviews,
            Topic::Gifs => &self.gifs,
        }
    }
}
