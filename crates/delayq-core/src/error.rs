/// Low-level storage errors (RocksDB, key encoding, poisoned locks).
/// This is the error type for the `OrderedStore` trait; store operations can
/// only fail with infrastructure errors, never queue semantics.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("rocksdb error: {0}")]
    RocksDb(String),

    #[error("corrupt store entry: {0}")]
    Corrupt(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid score: {0}")]
    InvalidScore(f64),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::RocksDb(err.into_string())
    }
}

/// Boxed error returned by consumer handlers, kept as-is for the caller.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

// --- Per-operation error types ---

#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    /// A member with identical `{id, data}` bytes is already scheduled.
    /// The existing entry and its deadline are left untouched.
    #[error("message already exists in queue {queue}: {id}")]
    DuplicateEntry { queue: String, id: String },

    /// `now + delay` is past the latest representable deadline.
    #[error("delay of {0:?} is out of range")]
    InvalidDelay(std::time::Duration),

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Terminal reason for a consumer loop. `Queue::dequeue` only ever returns
/// one of these.
#[derive(Debug, thiserror::Error)]
pub enum DequeueError {
    #[error("dequeue cancelled")]
    Cancelled,

    #[error("malformed entry in queue {queue}: {source}")]
    Decode {
        queue: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DequeueError {
    /// Downcast a handler failure back to the handler's own error type.
    pub fn handler_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            DequeueError::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
