#![cfg(feature = "web")]

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::saving::StoreError;
use crate::summarize::SummarizeError;
use crate::view::UnknownChartType;

/// Message returned for any AI provider failure
pub const UPSTREAM_FAILURE: &str = "Failed to communicate with the AI service.";

/// Error returned by request handlers
///
/// Every variant renders as `{ "message": ... }` with a matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// A required service is not configured
    #[error("{0}")]
    Unavailable(String),

    /// Unexpected failure; the message is passed to the caller
    #[error("{0}")]
    Internal(String),

    /// AI provider failure; the detail is logged and never returned
    #[error("{0}")]
    Upstream(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                detail.as_str()
            }
            ApiError::Upstream(detail) => {
                log::error!("Error calling AI service: {}", detail);
                UPSTREAM_FAILURE
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Unavailable(message) => message.as_str(),
        };

        (self.status(), Json(ErrorBody { message })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<UnknownChartType> for ApiError {
    fn from(err: UnknownChartType) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<SummarizeError> for ApiError {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::Unavailable => ApiError::Unavailable(err.to_string()),
            SummarizeError::MissingSample => ApiError::BadRequest(err.to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
