//! Room details: summary and truncation points

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{require_room_id, ApiError, RoomIdRequest};
use crate::metrics;
use crate::room_db::{Room, RoomDetails};
use crate::shared_state::AppState;

pub const GET_ROUTE: &str = "api/chat/room/get";
pub const TRUNCATE_ROUTE: &str = "api/chat/room/truncate";

/// POST /api/chat/room/get
pub async fn get_room(
    State(state): State<AppState>,
    payload: Result<Json<RoomIdRequest>, JsonRejection>,
) -> Result<Json<Room>, ApiError> {
    let result = room_by_id(&state, payload);
    metrics::inc_request(GET_ROUTE, status_of(&result));
    result
}

fn room_by_id(state: &AppState, payload: Result<Json<RoomIdRequest>, JsonRejection>) -> Result<Json<Room>, ApiError> {
    let room_id = require_room_id(payload)?;
    match state.database.rooms.get_room(&room_id)? {
        Some(room) => Ok(Json(room)),
        None => Err(ApiError::NotFound(format!("Room {}", room_id))),
    }
}

fn status_of<T>(result: &Result<T, ApiError>) -> StatusCode {
    result.as_ref().map_or_else(ApiError::status, |_| StatusCode::OK)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncateRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    /// 1-based message position
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct TruncateResponse {
    pub details: RoomDetails,
}

/// POST /api/chat/room/truncate: mark earlier context as stale
pub async fn truncate_room(
    State(state): State<AppState>,
    payload: Result<Json<TruncateRequest>, JsonRejection>,
) -> Result<Json<TruncateResponse>, ApiError> {
    let result = record_truncation(&state, payload);
    metrics::inc_request(TRUNCATE_ROUTE, status_of(&result));
    result
}

fn record_truncation(
    state: &AppState,
    payload: Result<Json<TruncateRequest>, JsonRejection>,
) -> Result<Json<TruncateResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let room_id = req
        .room_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("roomId".into()))?;

    let details = state.database.rooms.append_truncate_index(&room_id, req.index)?;
    info!("Room {} truncated at {}", room_id, req.index);
    Ok(Json(TruncateResponse { details }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{post_json, test_state};
    use serde_json::json;

    #[tokio::test]
    async fn test_truncate_then_get_room() {
        let state = test_state();
        let room = state.database.rooms.create_room(Some("standup")).unwrap();

        let (status, body) = post_json(
            state.clone(),
            "/api/chat/room/truncate",
            json!({ "roomId": room.id, "index": 3 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["details"]["truncateIndexes"], json!([3]));

        let (status, body) = post_json(state, "/api/chat/room/get", json!({ "roomId": room.id })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], "standup");
        assert_eq!(body["details"]["truncateIndexes"], json!([3]));
    }

    #[tokio::test]
    async fn test_truncate_rejects_bad_input() {
        let state = test_state();
        let room = state.database.rooms.create_room(None).unwrap();

        let (status, _) = post_json(state.clone(), "/api/chat/room/truncate", json!({ "roomId": room.id, "index": 0 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(state.clone(), "/api/chat/room/truncate", json!({ "roomId": "ghost", "index": 1 })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = post_json(state, "/api/chat/room/get", json!({ "roomId": "ghost" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_room_routes_are_counted() {
        metrics::init_metrics();
        let state = test_state();
        let room = state.database.rooms.create_room(None).unwrap();
        let truncated = metrics::request_count(TRUNCATE_ROUTE, StatusCode::OK);
        let missing = metrics::request_count(GET_ROUTE, StatusCode::NOT_FOUND);

        post_json(state.clone(), "/api/chat/room/truncate", json!({ "roomId": room.id, "index": 2 })).await;
        post_json(state, "/api/chat/room/get", json!({ "roomId": "ghost" })).await;

        assert!(metrics::request_count(TRUNCATE_ROUTE, StatusCode::OK) > truncated);
        assert!(metrics::request_count(GET_ROUTE, StatusCode::NOT_FOUND) > missing);
    }
}
