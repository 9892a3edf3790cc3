//! Documents attached to a room: titles of every first-split chunk whose
//! metadata names the room.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{require_room_id, ApiError, RoomIdRequest};
use crate::metrics;
use crate::retrieval::fetch_document_titles;
use crate::shared_state::AppState;

pub const ROUTE: &str = "api/documents/get";

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentsGetResponse {
    pub documents: Vec<String>,
}

/// POST /api/documents/get
pub async fn get_documents(
    State(state): State<AppState>,
    payload: Result<Json<RoomIdRequest>, JsonRejection>,
) -> Result<Json<DocumentsGetResponse>, ApiError> {
    let result = documents_for_room(&state, payload).await;
    let status = result.as_ref().map_or_else(ApiError::status, |_| StatusCode::OK);
    metrics::inc_request(ROUTE, status);
    result
}

async fn documents_for_room(
    state: &AppState,
    payload: Result<Json<RoomIdRequest>, JsonRejection>,
) -> Result<Json<DocumentsGetResponse>, ApiError> {
    let room_id = require_room_id(payload)?;
    let documents = fetch_document_titles(state.documents.as_ref(), &room_id).await?;

    info!("Room {}: returning {} documents", room_id, documents.len());
    metrics::observe_documents(documents.len());
    Ok(Json(DocumentsGetResponse { documents }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{post_json, post_raw, test_state};
    use crate::retrieval::{DocumentSource, MetadataFilter};
    use crate::room_db::{ChunkMetadata, NewChunk};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct StaticSource(Value);

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn select_metadata(&self, _filter: &MetadataFilter) -> anyhow::Result<Value> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn select_metadata(&self, _filter: &MetadataFilter) -> anyhow::Result<Value> {
            Err(anyhow::anyhow!("connection refused: password authentication failed for user admin"))
        }
    }

    #[tokio::test]
    async fn test_returns_titles_for_room() {
        let state = test_state();
        let room = state.database.rooms.create_room(None).unwrap();
        let dimension = state.database.chunks.dimension();
        for (split, title) in [(1, "Roadmap"), (2, "Roadmap"), (1, "Budget")] {
            state
                .database
                .chunks
                .insert_chunk(NewChunk {
                    content: "...".into(),
                    metadata: ChunkMetadata::new(&room.id, split).with_title(title),
                    embedding: vec![0.0; dimension],
                })
                .unwrap();
        }

        let (status, body) = post_json(state, "/api/documents/get", json!({ "roomId": room.id })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "documents": ["Roadmap", "Budget"] }));
    }

    #[tokio::test]
    async fn test_missing_room_id_is_bad_request_with_empty_body() {
        let state = test_state().with_document_source(Arc::new(FailingSource));

        for payload in [json!({}), json!({ "roomId": "" }), json!({ "roomId": null })] {
            let (status, body) = post_json(state.clone(), "/api/documents/get", payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({}));
        }

        let (status, body) = post_raw(state, "/api/documents/get", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_non_array_store_response_is_echoed() {
        let malformed = json!({ "command": "SELECT", "rowCount": null });
        let state = test_state().with_document_source(Arc::new(StaticSource(malformed.clone())));

        let (status, body) = post_json(state, "/api/documents/get", json!({ "roomId": "r1" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["result"], malformed);
        assert_eq!(body["error"]["message"], "An unexpected error occurred");
    }

    #[tokio::test]
    async fn test_store_failure_does_not_leak_details() {
        let state = test_state().with_document_source(Arc::new(FailingSource));

        let (status, body) = post_json(state, "/api/documents/get", json!({ "roomId": "r1" })).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": { "message": "An unexpected error occurred" } }));
    }

    #[tokio::test]
    async fn test_room_without_documents_returns_empty_list() {
        let state = test_state();
        let (status, body) = post_json(state, "/api/documents/get", json!({ "roomId": "empty" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "documents": [] }));
    }
}
