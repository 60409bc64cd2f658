//! Error types for the mock GitHub OAuth server.
//!
//! Uses `thiserror` for structured error handling. Flow errors stay inside the
//! HTTP layer and become status codes; snapshot errors surface to whoever asked
//! for the load or save.

use std::path::{Path, PathBuf};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::server::types::GitHubApiError;

/// Errors from reading or writing a store snapshot file.
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    /// The snapshot file could not be read.
    #[error("unable to read {kind}-file({}): {source}", .path.display())]
    Read {
        /// Which store the file belongs to.
        kind: &'static str,
        /// Path of the file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file is not a valid JSON object of the expected shape.
    #[error("unable to parse {kind}-file({}): {source}", .path.display())]
    Parse {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The store contents could not be encoded.
    #[error("unable to encode {kind} snapshot: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot file could not be written.
    #[error("unable to write {kind}-file({}): {source}", .path.display())]
    Write {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SnapshotError {
    pub(crate) fn read(kind: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            kind,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(kind: &'static str, path: &Path, source: serde_json::Error) -> Self {
        Self::Parse {
            kind,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(kind: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            kind,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path of the file involved, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Write { path, .. } => {
                Some(path.as_path())
            }
            Self::Encode { .. } => None,
        }
    }
}

/// Errors raised while handling an OAuth flow request.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// Missing or unknown client on the authorize step.
    #[error("Unauthorized client")]
    Unauthorized,

    /// A required request field is missing.
    #[error("Bad request: {message}")]
    BadRequest {
        /// What was wrong with the request
        message: String,
    },

    /// Unknown client or code on the token exchange.
    #[error("Not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Missing, malformed or unknown bearer credential.
    #[error("Must authenticate to access this API.")]
    Authentication,

    /// The request body could not be decoded.
    #[error("Malformed request body: {message}")]
    MalformedBody {
        /// Decoder error message
        message: String,
    },

    /// The embedded user fixture could not be decoded.
    #[error("{message}")]
    Fixture {
        /// Decoder error message
        message: String,
    },
}

impl ApiError {
    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a malformed body error.
    #[must_use]
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    /// Create a fixture decode error.
    #[must_use]
    pub fn fixture(err: impl std::fmt::Display) -> Self {
        Self::Fixture {
            message: err.to_string(),
        }
    }

    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MalformedBody { .. } | Self::Fixture { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), error = %self, "Rejected request");

        let body = match self {
            Self::Authentication => GitHubApiError::unauthorized(),
            Self::Fixture { message } => GitHubApiError::with_message(message),
            _ => return status.into_response(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for flow operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
