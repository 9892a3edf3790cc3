//! Document chunk storage: embeddings plus their JSON metadata
use crate::retrieval::json_contains;
use crate::room_db::schema::*;
use crate::room_db::{format_timestamp, parse_datetime_safe, RoomDbError};
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Row};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub dimension: usize,
}

/// A chunk as handed over by the ingestion process
pub struct NewChunk {
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

pub struct ChunkStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
    dimension: usize,
}

impl ChunkStore {
    pub fn new(pool: Arc<Pool<SqliteConnectionManager>>, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    fn get_conn(&self) -> anyhow::Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| anyhow::anyhow!("Failed to get connection from pool: {}", e))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Insert a chunk after checking the metadata invariants: the room must
    /// exist, the split number is 1-based and the vector has the configured
    /// dimension.
    pub fn insert_chunk(&self, chunk: NewChunk) -> anyhow::Result<EmbeddingChunk> {
        if chunk.metadata.split_number == 0 {
            return Err(RoomDbError::InvalidSplitNumber(chunk.metadata.split_number).into());
        }
        if chunk.embedding.len() != self.dimension {
            return Err(RoomDbError::DimensionMismatch {
                expected: self.dimension,
                actual: chunk.embedding.len(),
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let created_time = Utc::now();
        let embedding_bytes = bincode::serialize(&chunk.embedding)?;

        // Existence check and insert in one statement, so a concurrent room
        // delete cannot slip in between.
        let conn = self.get_conn()?;
        let inserted = conn.execute(
            "INSERT INTO embeddings (id, created_time, content, metadata, embedding)
             SELECT ?1, ?2, ?3, ?4, ?5 WHERE EXISTS (SELECT 1 FROM rooms WHERE id = ?6)",
            params![
                &id,
                format_timestamp(&created_time),
                &chunk.content,
                serde_json::to_string(&chunk.metadata)?,
                embedding_bytes,
                &chunk.metadata.room_id,
            ],
        )?;
        if inserted == 0 {
            return Err(RoomDbError::RoomNotFound(chunk.metadata.room_id.clone()).into());
        }

        debug!(
            "Stored chunk {} (room {}, split {})",
            id, chunk.metadata.room_id, chunk.metadata.split_number
        );
        Ok(EmbeddingChunk {
            id,
            created_time,
            content: chunk.content,
            metadata: chunk.metadata,
            embedding: chunk.embedding,
        })
    }

    pub fn get_chunk(&self, chunk_id: &str) -> anyhow::Result<Option<EmbeddingChunk>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_time, content, metadata, embedding FROM embeddings WHERE id = ?1",
        )?;
        let mut rows = stmt.query([chunk_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_chunk(row)?)),
            None => Ok(None),
        }
    }

    /// Full scan of the metadata column in natural row order, keeping the
    /// objects accepted by `predicate`.
    ///
    /// Rows whose metadata is not valid JSON are skipped with a warning.
    pub fn select_metadata_where<F>(&self, predicate: F) -> anyhow::Result<Vec<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, metadata FROM embeddings ORDER BY rowid")?;
        let mut rows = stmt.query([])?;

        let mut scanned = 0usize;
        let mut matches = Vec::new();
        while let Some(row) = rows.next()? {
            scanned += 1;
            let id: String = row.get(0)?;
            let raw: String = row.get(1)?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(metadata) => {
                    if predicate(&metadata) {
                        matches.push(metadata);
                    }
                }
                Err(e) => warn!("Skipping chunk {} with unreadable metadata: {}", id, e),
            }
        }

        debug!("Metadata scan: {} of {} chunks matched", matches.len(), scanned);
        Ok(matches)
    }

    /// Remove every chunk whose metadata points at `room_id`.
    pub fn delete_room_chunks(&self, room_id: &str) -> anyhow::Result<usize> {
        let conn = self.get_conn()?;
        delete_chunks_owned_by(&conn, room_id)
    }

    pub fn get_stats(&self) -> anyhow::Result<ChunkStats> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |row| row.get(0))?;
        Ok(ChunkStats {
            total_chunks: count as usize,
            dimension: self.dimension,
        })
    }
}

/// Delete the chunks whose raw metadata contains `{"roomId": room_id}`.
///
/// Ownership uses the same containment test as the document query, so every
/// chunk served for a room is removed with it.
pub(crate) fn delete_chunks_owned_by(conn: &Connection, room_id: &str) -> anyhow::Result<usize> {
    let owner = json!({ "roomId": room_id });
    let ids: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id, metadata FROM embeddings")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut ids = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(metadata) if json_contains(&metadata, &owner) => ids.push(id),
                Ok(_) => {}
                Err(e) => warn!("Chunk {} has unreadable metadata, owner unknown: {}", id, e),
            }
        }
        ids
    };

    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let query = format!("DELETE FROM embeddings WHERE id IN ({})", placeholders);
    let deleted = conn.execute(&query, rusqlite::params_from_iter(&ids))?;
    info!("Deleted {} chunks for room {}", deleted, room_id);
    Ok(deleted)
}

fn row_to_chunk(row: &Row) -> anyhow::Result<EmbeddingChunk> {
    let created_time = parse_datetime_safe(&row.get::<_, String>(1)?).unwrap_or_else(|| {
        warn!("Failed parse chunk created_time");
        Utc::now()
    });
    let metadata_json: String = row.get(3)?;
    let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| anyhow::anyhow!("Metadata JSON error: {}", e))?;
    let embedding_bytes: Vec<u8> = row.get(4)?;
    let embedding: Vec<f32> = bincode::deserialize(&embedding_bytes)
        .map_err(|e| anyhow::anyhow!("Deserialization error: {}", e))?;

    Ok(EmbeddingChunk {
        id: row.get(0)?,
        created_time,
        content: row.get(2)?,
        metadata,
        embedding,
    })
}
