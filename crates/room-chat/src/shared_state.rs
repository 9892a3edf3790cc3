//! State shared by every API handler.
//!
//! Handlers reach the database and the document source through `Arc`s; no
//! request keeps mutable state beyond its own lifetime.

use std::sync::Arc;

use crate::{
    config::Config,
    retrieval::{DocumentSource, SqliteDocumentSource},
    room_db::RoomDatabase,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<RoomDatabase>,
    pub documents: Arc<dyn DocumentSource>,
}

impl AppState {
    pub fn new(config: Config, database: Arc<RoomDatabase>) -> Self {
        let documents: Arc<dyn DocumentSource> = Arc::new(SqliteDocumentSource::new(Arc::clone(&database)));
        Self {
            config: Arc::new(config),
            database,
            documents,
        }
    }

    /// Replace the document source, e.g. with a remote vector store.
    pub fn with_document_source(mut self, documents: Arc<dyn DocumentSource>) -> Self {
        self.documents = documents;
        self
    }
}
