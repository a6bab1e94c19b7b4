use crate::error::StorageResult;

/// One entry returned by a range query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: Vec<u8>,
    pub score: f64,
}

/// Keyed, score-ordered set of byte members. Each call must be atomic on its
/// own; nothing is promised across calls. Implementations must be thread-safe.
pub trait OrderedStore: Send + Sync {
    /// Insert `member` under `key` with `score` only if the member is absent.
    /// Returns 1 if inserted, 0 if it was already present (its score is kept).
    fn insert_if_absent(&self, key: &str, score: f64, member: &[u8]) -> StorageResult<u64>;

    /// Remove `member` from `key`. Removing an absent member is not an error.
    fn remove(&self, key: &str, member: &[u8]) -> StorageResult<()>;

    /// All members under `key` with `min <= score <= max`, ascending by score
    /// and then by member bytes.
    fn range_by_score(&self, key: &str, min: f64, max: f64) -> StorageResult<Vec<ScoredMember>>;
}
