use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Error kinds shared by repositories, services and handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Tags a sqlx error. `context` names the failed operation and is only logged.
    pub fn from_db(err: sqlx::Error, context: &str) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound(format!("{context}: not found")),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => Self::Conflict(format!("{context}: already exists")),
                Some("23503") => Self::NotFound(format!("{context}: referenced record not found")),
                _ => Self::Database(format!("{context}: {err}")),
            },
            _ => Self::Database(format!("{context}: {err}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Database(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Database(detail) => {
                tracing::error!(error = %detail, "database error");
                "Database error occurred".to_string()
            }
            AppError::Unexpected(detail) => {
                tracing::error!(error = %detail, "unexpected error");
                "Internal server error".to_string()
            }
            AppError::ServiceUnavailable(detail) => {
                tracing::warn!(error = %detail, "upstream unavailable");
                detail.clone()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
