//! Room message endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{require_room_id, ApiError, RoomIdRequest};
use crate::metrics;
use crate::room_db::StoredMessage;
use crate::shared_state::AppState;

pub const ROUTE: &str = "api/chat/messages/get";
pub const ABORT_ROUTE: &str = "api/chat/messages/abort";

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesGetResponse {
    pub messages: Vec<StoredMessage>,
}

/// POST /api/chat/messages/get: messages of a room, oldest first
pub async fn get_messages(
    State(state): State<AppState>,
    payload: Result<Json<RoomIdRequest>, JsonRejection>,
) -> Result<Json<MessagesGetResponse>, ApiError> {
    let result = messages_for_room(&state, payload);
    let status = result.as_ref().map_or_else(ApiError::status, |_| StatusCode::OK);
    metrics::inc_request(ROUTE, status);
    result
}

fn messages_for_room(
    state: &AppState,
    payload: Result<Json<RoomIdRequest>, JsonRejection>,
) -> Result<Json<MessagesGetResponse>, ApiError> {
    let room_id = require_room_id(payload)?;

    if !state.database.rooms.room_exists(&room_id)? {
        info!("Messages requested for unknown room {}", room_id);
        return Err(ApiError::NotFound(format!("Room {}", room_id)));
    }

    let messages = state.database.rooms.get_room_messages(&room_id)?;
    info!("Room {}: returning {} messages", room_id, messages.len());
    Ok(Json(MessagesGetResponse { messages }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortMessageRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// POST /api/chat/messages/abort: flag a message whose generation was stopped
pub async fn abort_message(
    State(state): State<AppState>,
    payload: Result<Json<AbortMessageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let result = mark_aborted(&state, payload);
    let status = result.as_ref().map_or_else(ApiError::status, |_| StatusCode::OK);
    metrics::inc_request(ABORT_ROUTE, status);
    result
}

fn mark_aborted(
    state: &AppState,
    payload: Result<Json<AbortMessageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let room_id = req.room_id.filter(|id| !id.is_empty()).ok_or_else(|| ApiError::BadRequest("roomId".into()))?;
    let message_id = req
        .message_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("messageId".into()))?;

    if !state.database.rooms.mark_message_aborted(&room_id, &message_id)? {
        warn!("Abort requested for unknown message {} in room {}", message_id, room_id);
        return Err(ApiError::NotFound(format!("Message {}", message_id)));
    }

    info!("Marked message {} in room {} as aborted", message_id, room_id);
    Ok(Json(json!({ "success": true, "id": message_id })))
}
