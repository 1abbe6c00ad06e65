use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{documents::DocumentError, repository::RepositoryError, session::SessionError};

/// ApiError
///
/// Failures of the HTTP boundary. Guard outcomes never end up here: missing identities
/// and denied routes are redirects, not errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Repository(RepositoryError::NotAnObject)
            | ApiError::Repository(RepositoryError::InvalidField(_)) => StatusCode::BAD_REQUEST,
            ApiError::Repository(RepositoryError::UnknownCollection(_)) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Session(SessionError::MissingField(_) | SessionError::UnknownRole(_)) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Repository(_) | ApiError::Document(_) | ApiError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            // Log the cause, hand the client something generic.
            tracing::error!("request failed: {self}");
            "internal server error".to_string()
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("request rejected: {self}");
            "authentication required".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
