//! Key encoding for the ordered stores.
//!
//! Scores are encoded as 8 order-preserving big-endian bytes, so lexicographic
//! byte order equals numeric order. Composite keys use `:` (0x3A) as separator.
//! Queue names are length-prefixed with a big-endian u16.

use crate::error::{StorageError, StorageResult};

const SEPARATOR: u8 = b':';
const SIGN_BIT: u64 = 1 << 63;

/// Map an `f64` onto a `u64` whose natural order matches the float order.
/// `-0.0` is folded into `0.0`. NaN must be rejected before calling this.
pub fn sortable_score(score: f64) -> u64 {
    let score = if score == 0.0 { 0.0 } else { score };
    let bits = score.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

/// Inverse of [`sortable_score`].
pub fn score_from_sortable(val: u64) -> f64 {
    let bits = if val & SIGN_BIT != 0 {
        val & !SIGN_BIT
    } else {
        !val
    };
    f64::from_bits(bits)
}

/// Encode a score as 8 big-endian bytes.
pub fn encode_score(score: f64) -> [u8; 8] {
    sortable_score(score).to_be_bytes()
}

pub fn decode_score(bytes: &[u8]) -> StorageResult<f64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Corrupt(format!("score must be 8 bytes, got {}", bytes.len())))?;
    Ok(score_from_sortable(u64::from_be_bytes(raw)))
}

pub fn check_score(score: f64) -> StorageResult<()> {
    if score.is_nan() {
        return Err(StorageError::InvalidScore(score));
    }
    Ok(())
}

/// Encode a queue name with a 2-byte big-endian length prefix.
fn encode_string(s: &str) -> StorageResult<Vec<u8>> {
    let len = u16::try_from(s.len())
        .map_err(|_| StorageError::InvalidKey(format!("key exceeds 64 KiB ({} bytes)", s.len())))?;
    let mut buf = Vec::with_capacity(2 + s.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(buf)
}

/// Prefix shared by every entry of one queue: `{key}:`.
pub fn queue_prefix(key: &str) -> StorageResult<Vec<u8>> {
    let mut prefix = encode_string(key)?;
    prefix.push(SEPARATOR);
    Ok(prefix)
}

/// Member index key: `{key}:{member}`. Value is the encoded score.
pub fn member_key(prefix: &[u8], member: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + member.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(member);
    key
}

/// Score index key: `{key}:{score}:{member}`
///
/// Score-first layout after the queue prefix enables "scan from lowest score"
/// iteration; the trailing member bytes break ties.
pub fn score_key(prefix: &[u8], score: f64, member: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 9 + member.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(&encode_score(score));
    key.push(SEPARATOR);
    key.extend_from_slice(member);
    key
}

/// Lower bound for a score scan: `{key}:{score}`.
pub fn score_seek_key(prefix: &[u8], score: f64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&encode_score(score));
    key
}

/// Split a score index key (with the queue prefix already stripped) back into
/// its score and member.
pub fn parse_score_key(rest: &[u8]) -> StorageResult<(f64, &[u8])> {
    if rest.len() < 9 || rest[8] != SEPARATOR {
        return Err(StorageError::Corrupt(format!(
            "malformed score key of {} bytes",
            rest.len()
        )));
    }
    let score = decode_score(&rest[..8])?;
    Ok((score, &rest[9..]))
}
