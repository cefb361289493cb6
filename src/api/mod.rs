//! HTTP API: routes, handlers, auth middleware, and error mapping.

pub mod auth;
pub mod routes;
pub mod tasks;
pub mod types;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::error::TaskError;
use types::ErrorBody;

/// Wraps [`TaskError`] so handlers can use `?` and get the right status code
/// and a JSON `{"error": ...}` body.
pub struct ApiError(pub TaskError);

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            TaskError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            TaskError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            TaskError::Storage(_) | TaskError::Serialize(_) | TaskError::Io(_) => {
                // Real cause goes to the log; callers get a generic message.
                tracing::error!("request failed: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
