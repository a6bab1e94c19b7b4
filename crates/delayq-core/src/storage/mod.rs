pub(crate) mod keys;
mod memory;
mod rocksdb;
mod traits;

pub use self::memory::MemoryStore;
pub use self::rocksdb::RocksDbStore;
pub use traits::{OrderedStore, ScoredMember};
