//! Where document rows come from.
//!
//! The handler only relies on the source returning a JSON array of
//! `{"metadata": {...}}` rows; anything else is reported as a malformed
//! response.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::retrieval::MetadataFilter;
use crate::room_db::RoomDatabase;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Rows whose metadata contains `filter`, in the store's natural order.
    async fn select_metadata(&self, filter: &MetadataFilter) -> anyhow::Result<Value>;
}

/// Reads chunk metadata from the room database.
pub struct SqliteDocumentSource {
    database: Arc<RoomDatabase>,
}

impl SqliteDocumentSource {
    pub fn new(database: Arc<RoomDatabase>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl DocumentSource for SqliteDocumentSource {
    async fn select_metadata(&self, filter: &MetadataFilter) -> anyhow::Result<Value> {
        let database = Arc::clone(&self.database);
        let filter = filter.clone();
        let rows = tokio::task::spawn_blocking(move || {
            database.chunks.select_metadata_where(|metadata| filter.matches(metadata))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Metadata scan task failed: {}", e))??;

        Ok(Value::Array(
            rows.into_iter().map(|metadata| json!({ "metadata": metadata })).collect(),
        ))
    }
}
