//! Error type shared by the store, the outbound clients and the HTTP handlers.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request payload failed validation
    #[error("{0}")]
    Validation(String),

    /// An extractor refused the request before it reached a handler
    #[error("{1}")]
    Rejected(StatusCode, String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("User already exists")]
    UserExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back onto the domain model
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Outbound HTTP call failed
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Unexpected upstream response: {0}")]
    UpstreamResponse(String),

    #[error("Wellness analysis is not configured: {0}")]
    AdvisoryUnavailable(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected(status, _) => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UserExists => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Migration(_) | AppError::Corrupt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Upstream(_) | AppError::UpstreamResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::AdvisoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(_) | AppError::Migration(_) | AppError::Corrupt(_) => {
                tracing::error!("❌ DB error: {}", self);
                "DB error".to_string()
            }
            AppError::Upstream(_) | AppError::UpstreamResponse(_) => {
                tracing::error!("❌ Upstream error: {}", self);
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
