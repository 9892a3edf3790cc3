//! Containment filter over chunk metadata.
//!
//! A stored metadata object matches a filter when it is a superset of the
//! filter object: every key of the filter is present with a contained value.
//! Arrays contain another array when every element of the needle is contained
//! in some element of the haystack. Scalars compare by value, numbers
//! numerically (`1` contains `1.0`).

use serde::Serialize;
use serde_json::{json, Value};

use crate::room_db::ChunkMetadata;

/// Split number of the chunk that carries a document's title.
pub const FIRST_SPLIT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFilter {
    pub room_id: String,
    pub split_number: u32,
}

impl MetadataFilter {
    /// Filter selecting the first split of every document in a room.
    pub fn first_split(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            split_number: FIRST_SPLIT,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "roomId": self.room_id,
            "splitNumber": self.split_number,
        })
    }

    /// Containment test against a raw metadata object.
    pub fn matches(&self, metadata: &Value) -> bool {
        json_contains(metadata, &self.to_value())
    }

    /// Same test on the typed record.
    pub fn matches_metadata(&self, metadata: &ChunkMetadata) -> bool {
        metadata.room_id == self.room_id && metadata.split_number == self.split_number
    }
}

/// Whether `haystack` contains `needle`.
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(hay), Value::Object(need)) => need
            .iter()
            .all(|(key, want)| hay.get(key).map_or(false, |have| json_contains(have, want))),
        (Value::Array(hay), Value::Array(need)) => need
            .iter()
            .all(|want| hay.iter().any(|have| json_contains(have, want))),
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (a, b) => a == b,
    }
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
