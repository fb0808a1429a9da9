//! The HTTP-facing error kinds of spec §7, mapped onto status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::config_registry::ConfigError;
use crate::repository::RepoError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    NoChange(String),
    #[error("{0}")]
    Store(String),
    #[error("{0}")]
    Pool(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::NoChange(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Store(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Pool(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateId(id) => {
                AppError::Validation(format!("A job with id '{id}' already exists."))
            }
            RepoError::NotFound(id) => AppError::NotFound(format!("job '{id}' not found")),
            RepoError::Store(e) => AppError::Store(e.to_string()),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<crate::pool::PoolError> for AppError {
    fn from(e: crate::pool::PoolError) -> Self {
        AppError::Pool(e.to_string())
    }
}
