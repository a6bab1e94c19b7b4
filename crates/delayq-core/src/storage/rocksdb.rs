use std::path::Path;
use std::sync::Mutex;

use rocksdb::{
    ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options,
    WriteBatch,
};

use crate::error::{StorageError, StorageResult};
use crate::storage::keys;
use crate::storage::traits::{OrderedStore, ScoredMember};

const CF_MEMBERS: &str = "members";
const CF_SCORES: &str = "scores";

/// All column family names (excluding `default` which RocksDB creates automatically).
const COLUMN_FAMILIES: &[&str] = &[CF_MEMBERS, CF_SCORES];

type DB = DBWithThreadMode<MultiThreaded>;

/// RocksDB-backed ordered store.
///
/// `members` maps `{key}:{member}` to the encoded score and answers "is this
/// member present". `scores` holds `{key}:{score}:{member}` with an empty value
/// and answers range queries. Both are written in one batch.
///
/// Conditional insert is a read followed by a write, so mutations are
/// serialized through `write_lock`. This makes the store safe for any number of
/// threads in one process; it does not coordinate across processes.
pub struct RocksDbStore {
    db: DB,
    write_lock: Mutex<()>,
}

impl RocksDbStore {
    /// Open or create a RocksDB database at the given path with all column families.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> StorageResult<std::sync::Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::RocksDb(format!("column family not found: {name}")))
    }
}

impl OrderedStore for RocksDbStore {
    fn insert_if_absent(&self, key: &str, score: f64, member: &[u8]) -> StorageResult<u64> {
        keys::check_score(score)?;
        let prefix = keys::queue_prefix(key)?;
        let members = self.cf(CF_MEMBERS)?;
        let scores = self.cf(CF_SCORES)?;
        let member_key = keys::member_key(&prefix, member);

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        if self.db.get_pinned_cf(&members, &member_key)?.is_some() {
            return Ok(0);
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&members, &member_key, keys::encode_score(score));
        batch.put_cf(&scores, keys::score_key(&prefix, score, member), b"");
        self.db.write(batch)?;
        Ok(1)
    }

    fn remove(&self, key: &str, member: &[u8]) -> StorageResult<()> {
        let prefix = keys::queue_prefix(key)?;
        let members = self.cf(CF_MEMBERS)?;
        let scores = self.cf(CF_SCORES)?;
        let member_key = keys::member_key(&prefix, member);

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        let Some(encoded) = self.db.get_pinned_cf(&members, &member_key)? else {
            return Ok(());
        };
        let score = keys::decode_score(&encoded)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&members, &member_key);
        batch.delete_cf(&scores, keys::score_key(&prefix, score, member));
        self.db.write(batch)?;
        Ok(())
    }

    fn range_by_score(&self, key: &str, min: f64, max: f64) -> StorageResult<Vec<ScoredMember>> {
        keys::check_score(min)?;
        keys::check_score(max)?;
        let prefix = keys::queue_prefix(key)?;
        let scores = self.cf(CF_SCORES)?;
        let seek = keys::score_seek_key(&prefix, min);
        let upper = keys::sortable_score(max);

        let iter = self
            .db
            .iterator_cf(&scores, IteratorMode::From(seek.as_slice(), Direction::Forward));
        let mut results = Vec::new();
        for item in iter {
            let (raw, _) = item?;
            if !raw.starts_with(&prefix) {
                break;
            }
            let (score, member) = keys::parse_score_key(&raw[prefix.len()..])?;
            if keys::sortable_score(score) > upper {
                break;
            }
            results.push(ScoredMember {
                member: member.to_vec(),
                score,
            });
        }
        Ok(results)
    }
}
