use crate::error::BoardlogError;
use crate::trace::TraceId;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// An error returned from a handler, tagged with the request's trace id
#[derive(Debug)]
pub struct ApiError {
    pub error: BoardlogError,
    pub trace_id: TraceId,
}

impl ApiError {
    pub fn new(error: BoardlogError, trace_id: &TraceId) -> Self {
        Self {
            error,
            trace_id: trace_id.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            BoardlogError::InvalidQuery(_) | BoardlogError::UnknownLevel(_) => {
                StatusCode::BAD_REQUEST
            }
            BoardlogError::Unauthorized(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side details stay in the log file
        let message = if self.error.is_client_error() {
            self.error.to_string()
        } else {
            tracing::error!(trace_id = %self.trace_id, "request failed: {}", self.error);
            "An internal error occurred".to_string()
        };

        (
            status,
            Json(json!({
                "error": message,
                "trace_id": self.trace_id,
            })),
        )
            .into_response()
    }
}
