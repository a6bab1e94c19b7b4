//! Deadline-ordered delay queue over a shared score-ordered store.
//!
//! Producers admit messages with [`Queue::add`] / [`Queue::add_msg`]; each
//! message is stored as a member whose score is its deadline. A consumer runs
//! [`Queue::dequeue`], which polls for entries due within the next poll period,
//! sleeps to each exact deadline, calls the handler and removes the entry on
//! success. Delivery is at-least-once.

pub mod clock;
pub mod config;
mod consumer;
pub mod error;
pub mod message;
pub mod metrics;
mod queue;
pub mod storage;
pub mod telemetry;

pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::{ConsumerConfig, DelayqConfig, StorageConfig};
pub use consumer::CancellationToken;
pub use error::{
    ConfigError, DequeueError, EnqueueError, HandlerError, StorageError, StorageResult,
};
pub use message::Message;
pub use metrics::Metrics;
pub use queue::Queue;
pub use storage::{MemoryStore, OrderedStore, RocksDbStore, ScoredMember};
