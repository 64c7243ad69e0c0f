//! Request-terminating errors and their HTTP mapping.
//!
//! Client errors carry a short `text/plain` message. Server errors are logged
//! and answered with an empty `500`, so store internals never reach the client.

use crate::store::StoreError;
use axum::{
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::error;

pub const BASIC_CHALLENGE: &str = "Basic realm=\"postline\"";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or missing input, including malformed object ids.
    #[error("{0}")]
    Validation(String),
    /// Missing or rejected Basic credentials.
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    /// Entity already exists; answered as `400` with the message.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Validation(message) | Self::Conflict(message) | Self::NotFound(message) => {
                (status, message).into_response()
            }
            Self::Unauthorized => {
                (status, [(WWW_AUTHENTICATE, BASIC_CHALLENGE)], "Unauthorized").into_response()
            }
            Self::Store(err) => {
                error!("Store operation failed: {err}");
                status.into_response()
            }
            Self::Internal(message) => {
                error!("Internal error: {message}");
                status.into_response()
            }
        }
    }
}
