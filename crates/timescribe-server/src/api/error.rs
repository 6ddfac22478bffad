use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use timescribe_core::JournalError;
use tracing::error;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

/// Error returned by every handler, rendered as `{ "error": "<message>" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        let status = match &err {
            JournalError::Validation(_) => StatusCode::BAD_REQUEST,
            JournalError::Storage(store) if store.is_unavailable() => StatusCode::BAD_GATEWAY,
            JournalError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            JournalError::AgentCreation(_) | JournalError::ExternalService(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "Request failed");
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
