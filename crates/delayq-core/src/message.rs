use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled payload. The deadline lives in the store entry's score, never
/// in the member bytes, so two messages with the same `id` and `data` collide
/// at admission whatever their deadlines are.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub data: Vec<u8>,
    pub deadline: SystemTime,
}

/// Member encoding: exactly `{id, data}`, fields in this order.
#[derive(Serialize)]
struct EnvelopeRef<'a> {
    id: &'a str,
    data: &'a [u8],
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    data: Vec<u8>,
}

impl Message {
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>, deadline: SystemTime) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            deadline,
        }
    }

    /// Generate a new UUIDv7 message ID.
    pub fn new_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Serialize `{id, data}` into the store member bytes. Equal messages
    /// always produce equal bytes.
    pub fn encode_member(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&EnvelopeRef {
            id: &self.id,
            data: &self.data,
        })
    }

    /// Rebuild a message from a store entry.
    pub fn decode_member(member: &[u8], score: f64) -> serde_json::Result<Self> {
        let Envelope { id, data } = serde_json::from_slice(member)?;
        Ok(Self {
            id,
            data,
            deadline: score_to_deadline(score),
        })
    }

    pub fn score(&self) -> f64 {
        deadline_to_score(self.deadline)
    }
}

/// Nanoseconds since the Unix epoch as an `f64` store score. Instants before
/// the epoch clamp to 0.
///
/// Current timestamps are around 1.7e18 ns, above the 2^53 range where `f64`
/// is exact, so a deadline may round by up to 256 ns.
pub fn deadline_to_score(deadline: SystemTime) -> f64 {
    deadline
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as f64)
        .unwrap_or(0.0)
}

/// Inverse of [`deadline_to_score`]. Negative and NaN scores map to the epoch.
pub fn score_to_deadline(score: f64) -> SystemTime {
    if score.is_nan() || score <= 0.0 {
        return UNIX_EPOCH;
    }
    let nanos = score as u64;
    UNIX_EPOCH
        .checked_add(Duration::from_nanos(nanos))
        .unwrap_or(UNIX_EPOCH)
}
