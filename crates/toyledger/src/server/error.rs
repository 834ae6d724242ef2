//! Mapping crate errors onto HTTP responses.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::Error;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// An error ready to be sent to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// The status code this error is sent with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else if err.is_unknown_user() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl ApiError {
    /// Replace the message of a body-limit rejection with one naming the
    /// limit.
    #[must_use]
    pub fn with_upload_limit(mut self, limit: usize) -> Self {
        if self.status == StatusCode::PAYLOAD_TOO_LARGE {
            self.message = format!("upload too large (limit {limit} bytes)");
        }
        self
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: format!("malformed upload: {}", err.body_text()),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        Self {
            status: err.status(),
            message: format!("malformed upload: {}", err.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        } else {
            tracing::debug!(status = %self.status, "{}", self.message);
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
