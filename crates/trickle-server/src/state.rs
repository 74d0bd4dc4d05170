//! Shared application state for the Trickle server.
//!
//! [`AppState`] is wrapped in [`Arc`] and injected into handlers via
//! Axum's `State` extractor. It holds the read-only corpora, the per-topic
//! broadcast channels that sockets subscribe to, and the emitter registry.

use std::sync::Arc;

use trickle_corpus::{Corpus, CorpusStore, Topic};
use trickle_stream::{ChannelHub, EmitterRegistry, RegistryConfig, TopicChannel};

use crate::config::{ConfigError, StreamConfig};

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The static corpora, loaded at startup.
    pub corpora: CorpusStore,
    /// One broadcast channel per topic.
    pub hub: ChannelHub,
    /// Every emitter started by a connected client.
    pub registry: Arc<EmitterRegistry>,
}

impl AppState {
    /// Assemble state from loaded corpora and registry settings.
    pub fn new(corpora: CorpusStore, registry: RegistryConfig, broadcast_capacity: usize) -> Self {
        Self {
            corpora,
            hub: ChannelHub::new(broadcast_capacity),
            registry: Arc::new(EmitterRegistry::new(registry)),
        }
    }

    /// Assemble state from the `stream` section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Stream`] if the cadence settings are invalid.
    pub fn from_config(corpora: CorpusStore, stream: &StreamConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            corpora,
            stream.registry_config()?,
            stream.broadcast_capacity,
        ))
    }

    /// The corpus for `topic`.
    pub fn corpus(&self, topic: Topic) -> Arc<Corpus> {
        Arc::clone(self.corpora.get(topic))
    }

    /// The publish channel for `topic`.
    pub const fn channel(&self, topic: Topic) -> &TopicChannel {
        self.hub.channel(topic)
    }
}
