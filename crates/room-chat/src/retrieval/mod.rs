//! Document retrieval for a room: containment filter over chunk metadata
//! followed by title extraction.

pub mod document_source;
pub mod metadata_filter;
pub mod title_extractor;

pub use document_source::{DocumentSource, SqliteDocumentSource};
pub use metadata_filter::{json_contains, MetadataFilter, FIRST_SPLIT};
pub use title_extractor::extract_titles;

use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DocumentQueryError {
    #[error("roomId is required")]
    MissingRoomId,
    #[error("document query returned a non-array result")]
    Malformed { result: Value },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Titles of the documents ingested into `room_id`.
///
/// An empty room id is rejected before the source is queried.
pub async fn fetch_document_titles(
    source: &dyn DocumentSource,
    room_id: &str,
) -> Result<Vec<String>, DocumentQueryError> {
    if room_id.is_empty() {
        return Err(DocumentQueryError::MissingRoomId);
    }

    let filter = MetadataFilter::first_split(room_id);
    let result = source.select_metadata(&filter).await?;

    let rows = match result {
        Value::Array(rows) => rows,
        other => return Err(DocumentQueryError::Malformed { result: other }),
    };

    let titles = extract_titles(&rows);
    debug!("Room {}: {} first-split rows, {} titles", room_id, rows.len(), titles.len());
    Ok(titles)
}
