//! The per-topic emitter task.
//!
//! An emitter walks one corpus from a start offset to the end. Before
//! each record it checks for cancellation, pauses for a jittered
//! interval, then publishes `{data, idx}` on its topic channel. Records
//! go out in strictly increasing index order.
//!
//! Cancellation is cooperative. The token is polled at the top of every
//! iteration and raced against the pause, so a stop takes effect no later
//! than the end of the current pause and never interrupts a publish.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use trickle_corpus::Corpus;

use crate::delay::DelaySampler;
use crate::event::StreamEvent;
use crate::hub::TopicChannel;

/// Default index the first emitted record is taken from.
pub const DEFAULT_CURSOR_START: usize = 5;

/// How an emitter finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterOutcome {
    /// The corpus was exhausted.
    Completed {
        /// Number of records published.
        emitted: usize,
    },
    /// The emitter observed its cancellation token.
    Stopped {
        /// Number of records published before the stop.
        emitted: usize,
    },
}

impl EmitterOutcome {
    /// Number of records published, whichever way the emitter ended.
    pub const fn emitted(self) -> usize {
        match self {
            Self::Completed { emitted } | Self::Stopped { emitted } => emitted,
        }
    }
}

/// Stream `corpus[start_offset..]` onto `channel` until exhausted or cancelled.
///
/// An offset at or past the end of the corpus publishes nothing and
/// completes immediately.
pub async fn run(
    corpus: Arc<Corpus>,
    channel: TopicChannel,
    start_offset: usize,
    cancel: CancellationToken,
    mut delay: DelaySampler,
) -> EmitterOutcome {
    if start_offset >= corpus.len() {
        info!(
            start_offset,
            records = corpus.len(),
            "start offset is past the end of the corpus, nothing to emit"
        );
        return EmitterOutcome::Completed { emitted: 0 };
    }

    info!(start_offset, records = corpus.len(), "emitter started");

    let mut emitted: usize = 0;
    for (idx, record) in corpus.iter().enumerate().skip(start_offset) {
        if cancel.is_cancelled() {
            info!(emitted, "emitter stopped");
            return EmitterOutcome::Stopped { emitted };
        }

        let pause = delay.next_delay();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(emitted, "emitter stopped during pause");
                return EmitterOutcome::Stopped { emitted };
            }
            () = tokio::time::sleep(pause) => {}
        }

        let receivers = channel.publish(StreamEvent {
            data: Arc::clone(record),
            idx,
        });
        emitted = emitted.saturating_add(1);
        debug!(
            idx,
            id = record.id().map(ToString::to_string),
            receivers,
            "record emitted"
        );
    }

    info!(emitted, "emitter completed");
    EmitterOutcome::Completed { emitted }
}
