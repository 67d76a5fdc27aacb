//! Helper types and traits for cleaner route handlers.
//!
//! Every failure leaves a route as a status code plus a JSON body of the
//! form `{"error": "..."}`.

use axum::Json;
use axum::http::StatusCode;
use doc_merger_core::{Error, ErrorKind};
use serde::Serialize;
use tracing::error;

/// JSON error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error half of every route result.
pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// HTTP status for a core error class.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UnsupportedFormat | ErrorKind::CorruptInput | ErrorKind::NoInputs => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::RenderingFailed | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a core error to a response, logging it with the request id.
pub fn merge_error(request_id: &str, e: &Error) -> ApiError {
    error!("[{}] Merge failed: {}", request_id, e);
    api_error(status_for(e.kind()), e.to_string())
}

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 400 Bad Request error.
    fn or_bad_request(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_bad_request(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, msg))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
    }
}
