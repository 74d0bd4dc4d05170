//! Per-topic publish channels.
//!
//! Every data topic has one [`broadcast`] channel. Emitters publish into
//! it and every socket connected to that topic holds a receiver, so a
//! record emitted for one client is seen by all clients on the topic.
//!
//! If a subscriber falls behind by more than the channel capacity it
//! receives [`broadcast::error::RecvError::Lagged`] and skips ahead.

use std::sync::Arc;

use tokio::sync::broadcast;
use trickle_corpus::Topic;

use crate::event::StreamEvent;

/// Default capacity of each topic's broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// The publish side of one topic, cheap to clone into emitter tasks.
#[derive(Debug, Clone)]
pub struct TopicChannel {
    topic: Topic,
    tx: broadcast::Sender<Arc<StreamEvent>>,
}

impl TopicChannel {
    /// Create a channel for `topic`. A zero capacity is raised to one.
    pub fn new(topic: Topic, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { topic, tx }
    }

    /// The topic this channel carries.
    pub const fn topic(&self) -> Topic {
        self.topic
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StreamEvent>> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received it. Zero is not
    /// an error: it just means nobody is connected to the topic.
    pub fn publish(&self, event: StreamEvent) -> usize {
        self.tx.send(Arc::new(event)).unwrap_or(0)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One [`TopicChannel`] per data topic.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    travel: TopicChannel,
    reviews: TopicChannel,
    gifs: TopicChannel,
}

impl ChannelHub {
    /// Create all topic channels with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            travel: TopicChannel::new(Topic::Travel, capacity),
            reviews: TopicChannel::new(Topic::Reviews, capacity),
            gifs: TopicChannel::new(Topic::Gifs, capacity),
        }
    }

    /// The channel for `topic`.
    pub const fn channel(&self, topic: Topic) -> &TopicChannel {
        match topic {
            Topic::Travel => &self.travel,
            Topic::Reviews => &self.reviews,
            Topic::Gifs => &self.gifs,
        }
    }

    /// Subscribe to `topic`.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Arc<StreamEvent>> {
        self.channel(topic).subscribe()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}
