//! Record streaming for the Trickle server.
//!
//! This crate owns the only moving parts of the system: background
//! emitters that walk a static [`Corpus`] and publish one record at a
//! time on a topic channel, and the registry that tracks which client
//! started which emitter so they can all be stopped on disconnect.
//!
//! # Architecture
//!
//! ```text
//! client start --> EmitterRegistry::start --> tokio task (emitter::run)
//!                                                  |
//!                        sleep |N(mean, sd)| then publish {data, idx}
//!                                                  v
//!                                   ChannelHub (one broadcast per topic)
//!                                                  |
//!                                    every socket subscribed to the topic
//! ```
//!
//! Each emitter runs on its own Tokio task with its own RNG. Stopping is
//! cooperative through a [`CancellationToken`] held by the registry.
//!
//! [`Corpus`]: trickle_corpus::Corpus
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod cursor;
pub mod delay;
pub mod emitter;
pub mod error;
pub mod event;
pub mod hub;
pub mod ids;
pub mod registry;

pub use delay::{DelaySampler, JitterDelay};
pub use emitter::EmitterOutcome;
pub use error::StreamError;
pub use event::StreamEvent;
pub use hub::{ChannelHub, TopicChannel};
pub use ids::{ClientId, EmitterId};
pub use registry::{ClientSession, EmitterRegistry, EmitterSummary, RegistryConfig, StartPolicy};
