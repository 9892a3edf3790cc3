//! Error taxonomy of the HTTP layer and its JSON bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::retrieval::DocumentQueryError;
use crate::room_db::RoomDbError;

pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or unusable request parameter. Answered with an empty object.
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    /// The store answered with something other than a row set.
    #[error("malformed store response")]
    MalformedUpstreamResponse { result: Value },
    #[error("store failure: {0}")]
    StoreFailure(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedUpstreamResponse { .. } | ApiError::StoreFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast_ref::<RoomDbError>() {
            Some(RoomDbError::RoomNotFound(id)) => ApiError::NotFound(format!("Room {}", id)),
            Some(RoomDbError::InvalidTruncateIndex(_)) => ApiError::BadRequest(e.to_string()),
            _ => ApiError::StoreFailure(e),
        }
    }
}

impl From<DocumentQueryError> for ApiError {
    fn from(e: DocumentQueryError) -> Self {
        match e {
            DocumentQueryError::MissingRoomId => ApiError::BadRequest("roomId".to_string()),
            DocumentQueryError::Malformed { result } => ApiError::MalformedUpstreamResponse { result },
            DocumentQueryError::Store(e) => ApiError::StoreFailure(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(_) => json!({}),
            ApiError::NotFound(what) => json!({ "error": { "message": format!("{} not found", what) } }),
            ApiError::MalformedUpstreamResponse { result } => {
                error!("Malformed response from document store: {}", result);
                json!({
                    "error": { "message": UNEXPECTED_ERROR_MESSAGE },
                    "result": result,
                })
            }
            // Store details stay in the log.
            ApiError::StoreFailure(e) => {
                error!("Store failure: {:#}", e);
                json!({ "error": { "message": UNEXPECTED_ERROR_MESSAGE } })
            }
        };
        (status, Json(body)).into_response()
    }
}
