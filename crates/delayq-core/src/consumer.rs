//! The consumer polling-and-delivery loop.
//!
//! Each iteration fetches every entry due before the *next* poll, then sleeps
//! to each entry's exact deadline before handing it to the handler. One range
//! query per poll period covers any number of messages in that window.
//!
//! Delivery is at-least-once: an entry is removed only after its handler
//! succeeds, so a handler failure (or a crash between handling and removal)
//! leaves it in the store for the next loop. Fetch and remove are separate
//! store calls, so two loops consuming the same queue will both see, and both
//! deliver, the same entries. Run one consumer per queue if that matters.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ConsumerConfig;
use crate::error::{DequeueError, HandlerError};
use crate::message::{deadline_to_score, Message};
use crate::queue::Queue;
use crate::storage::ScoredMember;

/// Cooperative stop signal for [`Queue::dequeue`]. Clones share one flag.
///
/// The loop checks it once per iteration, before polling. A sleep or handler
/// call already in progress runs to completion first.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Queue {
    /// Deliver messages to `handler` as their deadlines are reached.
    ///
    /// Blocks the calling thread until the token is cancelled, the store
    /// fails, an entry cannot be decoded, or the handler returns an error.
    /// It never returns successfully; the returned value is the reason the
    /// loop stopped. A handler error is returned unchanged inside
    /// [`DequeueError::Handler`] and the entry it failed on stays queued.
    #[tracing::instrument(skip_all, fields(queue = %self.name))]
    pub fn dequeue<F, E>(
        &self,
        cancel: &CancellationToken,
        config: &ConsumerConfig,
        mut handler: F,
    ) -> DequeueError
    where
        F: FnMut(&Message) -> Result<(), E>,
        E: Into<HandlerError>,
    {
        info!(poll_period_ms = config.poll_period_ms, "consumer started");
        let err = match self.poll_loop(cancel, config, &mut handler) {
            Ok(never) => match never {},
            Err(err) => err,
        };
        info!(reason = %err, "consumer stopped");
        err
    }

    fn poll_loop<F, E>(
        &self,
        cancel: &CancellationToken,
        config: &ConsumerConfig,
        handler: &mut F,
    ) -> Result<Infallible, DequeueError>
    where
        F: FnMut(&Message) -> Result<(), E>,
        E: Into<HandlerError>,
    {
        let poll_period = config.poll_period();
        loop {
            if cancel.is_cancelled() {
                return Err(DequeueError::Cancelled);
            }

            let next_poll = self.clock.now() + poll_period;
            let entries = self
                .store
                .range_by_score(&self.name, 0.0, deadline_to_score(next_poll))?;
            debug!(count = entries.len(), "polled");

            for entry in &entries {
                self.deliver(entry, handler)?;
            }

            self.clock.sleep_until(next_poll);
        }
    }

    /// Wait for one entry's deadline, hand it over, then remove it.
    fn deliver<F, E>(&self, entry: &ScoredMember, handler: &mut F) -> Result<(), DequeueError>
    where
        F: FnMut(&Message) -> Result<(), E>,
        E: Into<HandlerError>,
    {
        let msg = Message::decode_member(&entry.member, entry.score).map_err(|source| {
            DequeueError::Decode {
                queue: self.name.clone(),
                source,
            }
        })?;

        self.clock.sleep_until(msg.deadline);

        self.metrics.record_delivered(&self.name);
        if let Err(err) = handler(&msg) {
            let err: HandlerError = err.into();
            self.metrics.record_handler_failure(&self.name);
            warn!(id = %msg.id, error = %err, "handler failed, message left for redelivery");
            return Err(DequeueError::Handler(err));
        }

        // The message is handled; if removal fails it will be delivered again.
        self.store.remove(&self.name, &entry.member)?;
        self.metrics.record_removed(&self.name);
        debug!(id = %msg.id, deadline_ns = entry.score, "message delivered");
        Ok(())
    }
}
