//! Room database module - SQLite-based storage for rooms, messages and document chunks
pub mod chunk_store;
pub mod migration;
pub mod room_store;
pub mod schema;

pub use chunk_store::{ChunkStats, ChunkStore, NewChunk};
pub use migration::MigrationManager;
pub use room_store::{MessageParams, RoomStore};
pub use schema::*;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::TransactionBehavior;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Invariant violations detected by the stores
#[derive(Debug, thiserror::Error)]
pub enum RoomDbError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("split number must be 1-based, got {0}")]
    InvalidSplitNumber(u32),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("truncate index must be 1-based, got {0}")]
    InvalidTruncateIndex(usize),
}

pub struct RoomDatabase {
    pub rooms: RoomStore,
    pub chunks: ChunkStore,
    pool: Arc<Pool<SqliteConnectionManager>>,
}

impl RoomDatabase {
    pub fn new(db_path: &Path, pool_size: u32, embedding_dimension: usize) -> anyhow::Result<Self> {
        info!("Opening room database at: {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manager = SqliteConnectionManager::file(db_path)
            .with_flags(
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_FULL_MUTEX,
            )
            .with_init(|conn| {
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )
            });
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e| anyhow::anyhow!("Failed to create connection pool: {}", e))?;

        {
            let mut conn = pool.get()?;
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;",
            )?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }

        info!("Room database initialized successfully");
        Ok(Self::from_pool(Arc::new(pool), embedding_dimension))
    }

    /// Private in-memory database. A single pooled connection keeps every
    /// store on the same database.
    pub fn new_in_memory() -> anyhow::Result<Self> {
        Self::new_in_memory_with_dimension(DEFAULT_EMBEDDING_DIMENSION)
    }

    pub fn new_in_memory_with_dimension(embedding_dimension: usize) -> anyhow::Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;
        {
            let mut conn = pool.get()?;
            MigrationManager::new(&mut conn).initialize_database()?;
        }
        Ok(Self::from_pool(Arc::new(pool), embedding_dimension))
    }

    fn from_pool(pool: Arc<Pool<SqliteConnectionManager>>, embedding_dimension: usize) -> Self {
        Self {
            rooms: RoomStore::new(Arc::clone(&pool)),
            chunks: ChunkStore::new(Arc::clone(&pool), embedding_dimension),
            pool,
        }
    }

    /// Delete a room together with its messages and the chunks that reference it.
    ///
    /// Runs as one immediate transaction; chunk inserts for the room either
    /// land before it and are removed, or fail afterwards.
    pub fn delete_room(&self, room_id: &str) -> anyhow::Result<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let chunks = chunk_store::delete_chunks_owned_by(&tx, room_id)?;
        let rooms = room_store::delete_room_row(&tx, room_id)?;
        tx.commit()?;
        info!("Removed room {} ({} chunks)", room_id, chunks);
        Ok(rooms)
    }

    pub fn get_stats(&self) -> anyhow::Result<DatabaseStats> {
        let conn = self.pool.get()?;
        Ok(migration::get_database_stats(&conn)?)
    }
}

impl Drop for RoomDatabase {
    fn drop(&mut self) {
        if let Ok(conn) = self.pool.get() {
            let _ = conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
        }
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime_safe(datetime_str: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(datetime_str) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    None
}
