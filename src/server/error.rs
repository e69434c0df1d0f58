//! Error taxonomy of the HTTP layer and its mapping onto responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::any::Any;
use thiserror::Error;
use tracing::{error, warn};

use crate::analysis::AnalysisError;
use crate::github::GitHubError;
use crate::narrative::NarrativeError;

const INVALID_URL: &str = "Invalid GitHub repo URL.";
const INVALID_BODY: &str = "Invalid request body.";
const MISSING_TOKEN: &str = "GitHub token not configured.";
const INTERNAL: &str = "Internal Server Error";

/// Every failure surfaces to the client as a flat `{"error": "..."}` body.
/// Causes of upstream and internal failures are logged, never returned.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {message} ({detail})")]
    InvalidInput {
        message: &'static str,
        detail: String,
    },

    #[error("configuration: {0}")]
    Configuration(&'static str),

    #[error("upstream: {0}")]
    Upstream(String),

    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) | ApiError::Upstream(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::InvalidInput { message, .. } => *message,
            ApiError::Configuration(message) => *message,
            ApiError::Upstream(_) | ApiError::Internal(_) => INTERNAL,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidInput { .. } => warn!(error = %self, "rejected request"),
            _ => error!(error = %self, "request failed"),
        }
        let body = ErrorBody {
            error: self.public_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Response for a handler that panicked, installed with CatchPanicLayer.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput {
            message: INVALID_BODY,
            detail: rejection.body_text(),
        }
    }
}

impl From<GitHubError> for ApiError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::InvalidUrl(url) => ApiError::InvalidInput {
                message: INVALID_URL,
                detail: url,
            },
            GitHubError::MissingToken => ApiError::Configuration(MISSING_TOKEN),
            GitHubError::ApiRequest(err) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Upstream { repo, source } => {
                ApiError::Upstream(format!("{}: {}", repo, source))
            }
        }
    }
}

impl From<NarrativeError> for ApiError {
    fn from(err: NarrativeError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}
