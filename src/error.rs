use crate::savings::SavingsError;
use crate::segmentation::SegmentError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(config::ConfigError),
    InvalidRange(SegmentError),
    DataUnavailable(String),
    Aggregation(String),
    BadRequest(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "Configuration error: {}", err),
            AppError::InvalidRange(err) => write!(f, "{}", err),
            AppError::DataUnavailable(msg) => write!(f, "Data unavailable: {}", msg),
            AppError::Aggregation(msg) => write!(f, "Aggregation error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SegmentError> for AppError {
    fn from(err: SegmentError) -> Self {
        match err {
            SegmentError::InvalidRange { .. } => AppError::InvalidRange(err),
            SegmentError::TooManyChunks { .. } | SegmentError::OutOfRange(_) => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<SavingsError> for AppError {
    fn from(err: SavingsError) -> Self {
        match err {
            SavingsError::DataUnavailable => AppError::DataUnavailable(err.to_string()),
            SavingsError::Aggregation(msg) => AppError::Aggregation(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "Invalid date range"),
            AppError::DataUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Data has not been loaded yet")
            }
            AppError::Aggregation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error fetching device savings data",
            ),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
