//! API module - HTTP handlers for rooms, messages and documents

pub mod documents_api;
pub mod error;
pub mod messages_api;
pub mod room_api;

pub use documents_api::{get_documents, DocumentsGetResponse};
pub use error::ApiError;
pub use messages_api::{abort_message, get_messages, MessagesGetResponse};
pub use room_api::{get_room, truncate_room};

use axum::{extract::rejection::JsonRejection, Json};
use serde::Deserialize;

/// Body shared by the room-scoped endpoints: `{ "roomId": string }`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomIdRequest {
    #[serde(default)]
    pub room_id: Option<String>,
}

/// Extract a non-empty room id, mapping every failure to `BadRequest`.
pub(crate) fn require_room_id(payload: Result<Json<RoomIdRequest>, JsonRejection>) -> Result<String, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    req.room_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("roomId".to_string()))
}
