use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::storage::keys;
use crate::storage::traits::{OrderedStore, ScoredMember};

/// One sorted set: member lookup plus a (sortable score, member) index.
#[derive(Default)]
struct SortedSet {
    scores: HashMap<Vec<u8>, f64>,
    ordered: BTreeSet<(u64, Vec<u8>)>,
}

/// In-process ordered store. Useful for tests and single-process embedding;
/// nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, SortedSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members stored under `key`.
    pub fn len(&self, key: &str) -> StorageResult<usize> {
        let sets = self.sets.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(sets.get(key).map_or(0, |set| set.scores.len()))
    }

    pub fn is_empty(&self, key: &str) -> StorageResult<bool> {
        Ok(self.len(key)? == 0)
    }
}

impl OrderedStore for MemoryStore {
    fn insert_if_absent(&self, key: &str, score: f64, member: &[u8]) -> StorageResult<u64> {
        keys::check_score(score)?;
        let mut sets = self.sets.lock().map_err(|_| StorageError::LockPoisoned)?;
        let set = sets.entry(key.to_string()).or_default();
        if set.scores.contains_key(member) {
            return Ok(0);
        }
        set.scores.insert(member.to_vec(), score);
        set.ordered
            .insert((keys::sortable_score(score), member.to_vec()));
        Ok(1)
    }

    fn remove(&self, key: &str, member: &[u8]) -> StorageResult<()> {
        let mut sets = self.sets.lock().map_err(|_| StorageError::LockPoisoned)?;
        let Some(set) = sets.get_mut(key) else {
            return Ok(());
        };
        if let Some(score) = set.scores.remove(member) {
            set.ordered
                .remove(&(keys::sortable_score(score), member.to_vec()));
        }
        if set.scores.is_empty() {
            sets.remove(key);
        }
        Ok(())
    }

    fn range_by_score(&self, key: &str, min: f64, max: f64) -> StorageResult<Vec<ScoredMember>> {
        keys::check_score(min)?;
        keys::check_score(max)?;
        let sets = self.sets.lock().map_err(|_| StorageError::LockPoisoned)?;
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };
        let (lower, upper) = (keys::sortable_score(min), keys::sortable_score(max));
        if lower > upper {
            return Ok(Vec::new());
        }
        Ok(set
            .ordered
            .range((lower, Vec::new())..)
            .take_while(|(score, _)| *score <= upper)
            .map(|(score, member)| ScoredMember {
                member: member.clone(),
                score: keys::score_from_sortable(*score),
            })
            .collect())
    }
}
