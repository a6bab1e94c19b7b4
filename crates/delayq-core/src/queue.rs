use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{EnqueueError, StorageError, StorageResult};
use crate::message::Message;
use crate::metrics::Metrics;
use crate::storage::OrderedStore;

/// A named delay queue over a shared ordered store.
///
/// The queue name is the store key; the queue has no other state, so any
/// number of `Queue` values (in any number of processes) may point at the
/// same name. Producers call [`Queue::add`] / [`Queue::add_msg`]; a consumer
/// calls [`Queue::dequeue`].
pub struct Queue {
    pub(crate) name: String,
    pub(crate) store: Arc<dyn OrderedStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Metrics,
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Queue {
    pub fn new(store: Arc<dyn OrderedStore>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store,
            clock: Arc::new(SystemClock),
            metrics: Metrics::new(),
        }
    }

    /// Replace the wall clock, e.g. with a [`crate::VirtualClock`] in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedule `data` to become due after `delay`.
    ///
    /// Returns the generated message ID (UUIDv7).
    pub fn add(&self, data: impl Into<Vec<u8>>, delay: Duration) -> Result<String, EnqueueError> {
        let id = Message::new_id();
        self.add_with_id(id.clone(), data, delay)?;
        Ok(id)
    }

    /// Like [`Queue::add`], with a caller-chosen message ID.
    pub fn add_with_id(
        &self,
        id: impl Into<String>,
        data: impl Into<Vec<u8>>,
        delay: Duration,
    ) -> Result<(), EnqueueError> {
        let deadline = self.deadline_after(delay)?;
        self.add_msg(&Message::new(id, data, deadline))
    }

    fn deadline_after(&self, delay: Duration) -> Result<SystemTime, EnqueueError> {
        self.clock
            .now()
            .checked_add(delay)
            .ok_or(EnqueueError::InvalidDelay(delay))
    }

    /// Admit a fully-formed message.
    ///
    /// Fails with [`EnqueueError::DuplicateEntry`] if a message with the same
    /// `id` and `data` is already scheduled, whatever its deadline; the
    /// existing entry keeps its original deadline.
    #[tracing::instrument(skip_all, fields(queue = %self.name, id = %msg.id))]
    pub fn add_msg(&self, msg: &Message) -> Result<(), EnqueueError> {
        let member = msg
            .encode_member()
            .map_err(|e| EnqueueError::Encode(e.to_string()))?;
        let score = msg.score();

        let inserted = self.store.insert_if_absent(&self.name, score, &member)?;
        if inserted == 0 {
            self.metrics.record_duplicate(&self.name);
            warn!("duplicate message rejected");
            return Err(EnqueueError::DuplicateEntry {
                queue: self.name.clone(),
                id: msg.id.clone(),
            });
        }

        self.metrics.record_added(&self.name);
        debug!(deadline_ns = score, "message scheduled");
        Ok(())
    }

    /// Every message currently stored for this queue, due or not, in
    /// delivery order.
    pub fn pending(&self) -> StorageResult<Vec<Message>> {
        self.store
            .range_by_score(&self.name, 0.0, f64::INFINITY)?
            .into_iter()
            .map(|entry| {
                Message::decode_member(&entry.member, entry.score)
                    .map_err(|e| StorageError::Corrupt(e.to_string()))
            })
            .collect()
    }
}
