// src/core/errors.rs

//! Central error type shared by every reconciliation loop and HTTP handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors produced while reconciling cluster state against the remote
/// artifact layout, the local filesystem, the serving engine, or the
/// node registry.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("download of {remote} produced no local file")]
    DownloadFailed { remote: String },

    #[error("tar member '{member}' rejected: unsafe path")]
    ExtractionRejected { member: String },

    #[error("config write aborted: on-disk CRC32 changed since last read")]
    ConfigConflict,

    #[error("serving engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("registry fan-out to {target} timed out")]
    RegistryTimeout { target: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Wraps [`CoreError`] so handlers can return it directly and get a sane
/// HTTP status mapping without duplicating `IntoResponse` per handler.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::BlobNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::DownloadFailed { .. } | CoreError::ExtractionRejected { .. } => {
                StatusCode::OK
            }
            CoreError::ConfigConflict
            | CoreError::EngineUnavailable(_)
            | CoreError::RegistryTimeout { .. }
            | CoreError::Io(_)
            | CoreError::Http(_)
            | CoreError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}
