//! The data topics served by Trickle.
//!
//! Every topic is backed by one JSON file. The records live in an array
//! under a topic-specific top-level key, and each record carries its
//! identifier in a topic-specific field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A data topic. Each topic owns exactly one corpus and one publish channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Transport-for-London travel update tweets.
    Travel,
    /// Business reviews.
    Reviews,
    /// GIF metadata.
    Gifs,
}

impl Topic {
    /// All topics, in the order they are listed by the query API.
    pub const ALL: [Self; 3] = [Self::Travel, Self::Reviews, Self::Gifs];

    /// Lowercase wire name, as used in channel paths and `data_type` fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Travel => "travel",
            Self::Reviews => "reviews",
            Self::Gifs => "gifs",
        }
    }

    /// Human-readable name used in client status messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Travel => "Travel",
            Self::Reviews => "Reviews",
            Self::Gifs => "Gifs",
        }
    }

    /// Top-level JSON key holding the record array in the source file.
    pub const fn source_key(self) -> &'static str {
        match self {
            Self::Travel => "tfl",
            Self::Reviews => "businesses",
            Self::Gifs => "gifs",
        }
    }

    /// Record field holding the identifier.
    ///
    /// Tweets expose their id as a string in `id_str`; the numeric `id`
    /// overflows JSON consumers that parse numbers as doubles.
    pub const fn id_field(self) -> &'static str {
        match self {
            Self::Travel => "id_str",
            Self::Reviews | Self::Gifs => "id",
        }
    }

    /// Default source file name, relative to the data directory.
    pub const fn default_file(self) -> &'static str {
        match self {
            Self::Travel => "all_tfl_tweets.json",
            Self::Reviews => "yelp_data.json",
            Self::Gifs => "gifs.json",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string did not name any known [`Topic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "travel" => Ok(Self::Travel),
            "reviews" => Ok(Self::Reviews),
            "gifs" => Ok(Self::Gifs),
            other => Err(UnknownTopic(other.to_owned())),
        }
    }
}
