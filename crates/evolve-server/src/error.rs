//! Request errors and their HTTP mapping.

use crate::{mirror::MirrorError, parse::ParseError};
use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use evolve_provider::ProviderError;
use evolve_site::{SiteError, SnapshotError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Result type for request handling.
pub type ServerResult<T> = Result<T, ServerError>;

/// Everything a request can fail with.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A required field is missing or empty, or the body is malformed.
    #[error("{0}")]
    Validation(String),

    /// A generation request arrived within the cooldown.
    #[error("Rate limit: wait {} more seconds", retry_after_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    /// The server lacks configuration needed for this request.
    #[error("{0}")]
    Config(String),

    /// The chat-completion call failed.
    #[error("Generation failed: {0}")]
    Upstream(#[from] ProviderError),

    /// The model answered with something other than a files payload.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The requested snapshot or file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Filesystem failure while reading or writing site files.
    #[error(transparent)]
    Site(SiteError),
}

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::Validation(_) => "VALIDATION",
            ServerError::RateLimited { .. } => "RATE_LIMITED",
            ServerError::Config(_) => "CONFIG",
            ServerError::Upstream(_) => "UPSTREAM",
            ServerError::Parse(_) => "UPSTREAM_PARSE",
            ServerError::NotFound(_) => "NOT_FOUND",
            ServerError::Site(_) => "FILESYSTEM",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_) | ServerError::Parse(_) => StatusCode::BAD_REQUEST,
            ServerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Config(_) | ServerError::Upstream(_) | ServerError::Site(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<SiteError> for ServerError {
    fn from(err: SiteError) -> Self {
        match err {
            SiteError::Snapshot(SnapshotError::NotFound(_))
            | SiteError::Snapshot(SnapshotError::FileNotFound(_)) => {
                ServerError::NotFound(err.to_string())
            }
            SiteError::UnknownFile(_) | SiteError::Snapshot(SnapshotError::InvalidFileName(_)) => {
                ServerError::Validation(err.to_string())
            }
            other => ServerError::Site(other),
        }
    }
}

fn retry_after_secs(retry_after: &Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_secs: Option<u64>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        } else {
            warn!(code = self.code(), error = %self, "Request rejected");
        }

        let retry_after = match &self {
            ServerError::RateLimited { retry_after } => Some(retry_after_secs(retry_after)),
            _ => None,
        };
        let body = ApiError {
            error: self.to_string(),
            code: self.code(),
            retry_after_secs: retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open site: {0}")]
    Site(#[from] SiteError),

    #[error("failed to create model client: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to create GitHub mirror: {0}")]
    Mirror(#[from] MirrorError),
}
