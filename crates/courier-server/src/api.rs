//! Error envelope shared by every API handler.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_messages::MessageError;
use courier_types::ValidationError;
use courier_users::UserError;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    /// An extractor refused the request before the handler ran.
    #[error("rejected request ({0}): {1}")]
    Rejection(StatusCode, String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unprocessable entity: {0}")]
    UnprocessableEntity(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Rejection(status, msg) => (status, serde_json::json!({ "error": msg })),
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": err.to_string(),
                    "fields": err.fields,
                }),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, serde_json::json!({ "error": msg })),
            ApiError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::InternalServerError(msg) => {
                // Details stay in the log; clients get an opaque message.
                tracing::error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::NotFound(_) => ApiError::NotFound(e.to_string()),
            UserError::EmailTaken(_) => ApiError::Conflict(e.to_string()),
            UserError::Database(_) => ApiError::InternalServerError(e.to_string()),
        }
    }
}

impl From<MessageError> for ApiError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::NotFound(_) | MessageError::NotRecipient { .. } => {
                ApiError::NotFound(e.to_string())
            }
            MessageError::AlreadyRead { .. } => ApiError::Conflict(e.to_string()),
            MessageError::UnknownUser(_) => ApiError::UnprocessableEntity(e.to_string()),
            MessageError::Database(_) => ApiError::InternalServerError(e.to_string()),
            MessageError::User(user_error) => user_error.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                ApiError::BadRequest(rejection.body_text())
            }
            // Oversized bodies stay 413 and a missing content type stays 415.
            other => ApiError::Rejection(other.status(), other.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
