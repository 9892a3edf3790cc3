//! Database schema definitions for rooms, messages and document chunks
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Default dimension of stored embedding vectors.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

/// A chat room. Messages and chunks hang off its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub details: RoomDetails,
}

/// Per-room presentation details persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    /// 1-based message positions after which earlier context is considered stale.
    #[serde(default)]
    pub truncate_indexes: Vec<usize>,
}

impl RoomDetails {
    /// Last recorded truncation point, 0 when none was recorded.
    pub fn truncation_point(&self) -> usize {
        self.truncate_indexes.last().copied().unwrap_or(0)
    }

    pub fn is_truncated_at(&self, position: usize) -> bool {
        self.truncate_indexes.contains(&position)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    User,
    System,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::User => "user",
            Persona::System => "system",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Persona::User),
            "system" => Ok(Persona::System),
            other => Err(anyhow::anyhow!("Unknown persona: {}", other)),
        }
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub room_id: String,
    pub time_stamp: DateTime<Utc>,
    pub persona: Persona,
    pub content: String,
    pub is_aborted: bool,
}

/// Metadata attached to a document chunk.
///
/// `roomId` and `splitNumber` are required; `title` is only expected on the
/// first split of a document. Anything else the ingestion process wrote is
/// kept in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub room_id: String,
    pub split_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChunkMetadata {
    pub fn new(room_id: impl Into<String>, split_number: u32) -> Self {
        Self {
            room_id: room_id.into(),
            split_number,
            title: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_first_split(&self) -> bool {
        self.split_number == 1
    }
}

/// A segment of an ingested document with its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddingChunk {
    pub id: String,
    pub created_time: DateTime<Utc>,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_rooms: i64,
    pub total_messages: i64,
    pub total_chunks: i64,
    pub database_size_bytes: i64,
}
