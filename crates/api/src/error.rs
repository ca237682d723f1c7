//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use camera_capture::CameraError;
use serde::Serialize;
use session::SessionError;
use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Frame rejected: {0}")]
    Frame(#[from] CameraError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(e) => match e {
                SessionError::CameraUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                SessionError::NotReady
                | SessionError::InvalidTransition { .. }
                | SessionError::Cancelled(_) => StatusCode::CONFLICT,
                SessionError::InvalidDuration => StatusCode::BAD_REQUEST,
                SessionError::MalformedDataset(_) | SessionError::EmptyDataset => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SessionError::ModelInference(_) | SessionError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Frame(CameraError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Frame(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Session(e) => match e {
                SessionError::CameraUnavailable(_) => "camera_unavailable",
                SessionError::ModelInference(_) => "model_inference",
                SessionError::NotReady => "not_ready",
                SessionError::MalformedDataset(_) => "malformed_dataset",
                SessionError::EmptyDataset => "empty_dataset",
                SessionError::Storage(_) => "storage",
                SessionError::InvalidTransition { .. } => "invalid_transition",
                SessionError::InvalidDuration => "invalid_duration",
                SessionError::Cancelled(_) => "cancelled",
            },
            ApiError::Frame(CameraError::Unavailable(_)) => "camera_unavailable",
            ApiError::Frame(_) => "invalid_frame",
            ApiError::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}
