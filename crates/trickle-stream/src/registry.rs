//! Tracking of running emitters by client.
//!
//! [`EmitterRegistry`] owns every [`EmitterHandle`]. A handle is added
//! when a client starts a stream and removed when the client stops it or
//! disconnects. The map is the only mutable state shared between
//! connections, and every mutation (including spawning the emitter task
//! that a new handle refers to) happens under a single mutex. A stop for
//! a client therefore either sees a concurrent start's handle and cancels
//! it, or runs entirely before it.
//!
//! [`ClientSession`] ties a client's emitters to the lifetime of its
//! connection: dropping the session stops them, so a connection task that
//! ends for any reason cannot leave emitters behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};
use trickle_corpus::{Corpus, Topic};

use crate::delay::JitterDelay;
use crate::emitter::{self, DEFAULT_CURSOR_START, EmitterOutcome};
use crate::hub::TopicChannel;
use crate::ids::{ClientId, EmitterId};

/// What a start does to a client's existing emitters on the same topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPolicy {
    /// Keep them running; every start adds another emitter.
    #[default]
    Stack,
    /// Stop them before starting the new one.
    Replace,
}

/// Settings applied to every emitter the registry starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryConfig {
    /// Offset used when a start request carries none.
    pub default_cursor_start: usize,
    /// Cadence of published records.
    pub delay: JitterDelay,
    /// Handling of repeated starts from one client.
    pub policy: StartPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_cursor_start: DEFAULT_CURSOR_START,
            delay: JitterDelay::default(),
            policy: StartPolicy::default(),
        }
    }
}

/// One running (or finished but not yet stopped) emitter.
#[derive(Debug)]
struct EmitterHandle {
    id: EmitterId,
    topic: Topic,
    start_offset: usize,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    task: JoinHandle<EmitterOutcome>,
}

impl EmitterHandle {
    fn summary(&self, client: ClientId) -> EmitterSummary {
        EmitterSummary {
            emitter: self.id,
            client,
            topic: self.topic,
            start_offset: self.start_offset,
            started_at: self.started_at,
            finished: self.task.is_finished(),
        }
    }
}

/// Diagnostic view of one tracked emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmitterSummary {
    /// Emitter identity.
    pub emitter: EmitterId,
    /// Client that started it.
    pub client: ClientId,
    /// Topic it publishes on.
    pub topic: Topic,
    /// Index it started from.
    pub start_offset: usize,
    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,
    /// Whether the task has already run to completion.
    pub finished: bool,
}

/// Registry of active emitters, keyed by the client that started them.
#[derive(Debug, Default)]
pub struct EmitterRegistry {
    clients: Mutex<HashMap<ClientId, Vec<EmitterHandle>>>,
    config: RegistryConfig,
}

impl EmitterRegistry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// The settings applied to new emitters.
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Open a session for a newly connected client.
    ///
    /// All emitters started through the session are stopped when it is
    /// dropped.
    pub fn open_session(self: &Arc<Self>) -> ClientSession {
        ClientSession {
            registry: Arc::clone(self),
            client: ClientId::new(),
        }
    }

    /// Start an emitter for `client` over `corpus`, publishing on `channel`.
    ///
    /// `offset` of `None` uses the configured default. The emitter runs on
    /// its own Tokio task, so this must be called from within a runtime.
    pub fn start(
        &self,
        client: ClientId,
        corpus: Arc<Corpus>,
        channel: &TopicChannel,
        offset: Option<usize>,
    ) -> EmitterId {
        let id = EmitterId::new();
        let topic = channel.topic();
        let start_offset = offset.unwrap_or(self.config.default_cursor_start);
        let cancel = CancellationToken::new();

        let mut clients = self.lock();
        let handles = clients.entry(client).or_default();

        if self.config.policy == StartPolicy::Replace {
            handles.retain(|handle| {
                if handle.topic == topic {
                    handle.cancel.cancel();
                    info!(%client, %topic, emitter = %handle.id, "emitter replaced");
                    false
                } else {
                    true
                }
            });
        }

        let span = info_span!("emitter", %client, %topic, emitter = %id);
        let task = tokio::spawn(
            emitter::run(
                corpus,
                channel.clone(),
                start_offset,
                cancel.clone(),
                self.config.delay.sampler(),
            )
            .instrument(span),
        );

        handles.push(EmitterHandle {
            id,
            topic,
            start_offset,
            started_at: Utc::now(),
            cancel,
            task,
        });

        info!(
            %client,
            %topic,
            emitter = %id,
            start_offset,
            client_emitters = handles.len(),
            "emitter registered"
        );
        id
    }

    /// Stop one emitter. Returns whether `client` owned it.
    pub fn stop(&self, client: ClientId, emitter: EmitterId) -> bool {
        let mut clients = self.lock();
        let Some(handles) = clients.get_mut(&client) else {
            return false;
        };
        let Some(pos) = handles.iter().position(|h| h.id == emitter) else {
            return false;
        };

        let handle = handles.swap_remove(pos);
        handle.cancel.cancel();
        if handles.is_empty() {
            clients.remove(&client);
        }
        info!(%client, %emitter, "emitter stopped");
        true
    }

    /// Stop and forget every emitter owned by `client`.
    ///
    /// Idempotent: a client with no emitters is a no-op. Returns how many
    /// emitters were stopped.
    pub fn stop_all(&self, client: ClientId) -> usize {
        let Some(handles) = self.lock().remove(&client) else {
            return 0;
        };
        for handle in &handles {
            handle.cancel.cancel();
        }
        info!(%client, stopped = handles.len(), "client emitters stopped");
        handles.len()
    }

    /// Stop every emitter of every client. Used on process shutdown.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let mut stopped: usize = 0;
        for (_, handles) in drained {
            for handle in handles {
                handle.cancel.cancel();
                stopped = stopped.saturating_add(1);
            }
        }
        info!(stopped, "all emitters stopped");
        stopped
    }

    /// Total number of tracked emitters across all clients.
    ///
    /// Emitters that ran to completion stay tracked until their client
    /// stops them or disconnects.
    pub fn count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Number of tracked emitters owned by `client`.
    pub fn client_count(&self, client: ClientId) -> usize {
        self.lock().get(&client).map_or(0, Vec::len)
    }

    /// Snapshot of every tracked emitter, oldest first.
    pub fn summaries(&self) -> Vec<EmitterSummary> {
        let clients = self.lock();
        let mut summaries: Vec<EmitterSummary> = clients
            .iter()
            .flat_map(|(client, handles)| handles.iter().map(|h| h.summary(*client)))
            .collect();
        drop(clients);
        summaries.sort_by_key(|s| s.started_at);
        summaries
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, Vec<EmitterHandle>>> {
        // Every critical section is a single insert, retain or remove.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A connected client's claim on the registry.
///
/// Dropping the session stops every emitter the client started.
#[derive(Debug)]
pub struct ClientSession {
    registry: Arc<EmitterRegistry>,
    client: ClientId,
}

impl ClientSession {
    /// The client this session belongs to.
    pub const fn client(&self) -> ClientId {
        self.client
    }

    /// Start an emitter owned by this client.
    pub fn start(
        &self,
        corpus: Arc<Corpus>,
        channel: &TopicChannel,
        offset: Option<usize>,
    ) -> EmitterId {
        self.registry.start(self.client, corpus, channel, offset)
    }

    /// Stop every emitter owned by this client.
    pub fn stop_all(&self) -> usize {
        self.registry.stop_all(self.client)
    }

    /// Number of emitters this client currently owns.
    pub fn emitter_count(&self) -> usize {
        self.registry.client_count(self.client)
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        let stopped = self.registry.stop_all(self.client);
        debug!(client = %self.client, stopped, "client session closed");
    }
}
