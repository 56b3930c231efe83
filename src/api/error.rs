use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    /// Registration/update collided with an existing record; names the field.
    Conflict { field: String },

    /// Bad credentials or an invalid/expired token. Deliberately carries no
    /// detail so the response cannot reveal whether a username exists.
    Unauthorized,

    /// Valid credentials/token but the account has `is_active = false`.
    AccountDisabled,

    /// Authenticated, but not the owner of the resource.
    Forbidden(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Conflict { field } => write!(f, "Conflict: {} already registered", field),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::AccountDisabled => write!(f, "Account is disabled"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict { field } => (
                StatusCode::CONFLICT,
                format!("{} already registered", field),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid authentication credentials".to_string(),
            ),
            ApiError::AccountDisabled => {
                (StatusCode::FORBIDDEN, "Account is disabled".to_string())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn conflict(field: &str) -> Self {
        ApiError::Conflict {
            field: field.to_string(),
        }
    }

    /// Store failures are a server-side fault, never an authentication
    /// decision.
    pub fn db(msg: impl Into<String>) -> Self {
        ApiError::DatabaseError(msg.into())
    }

    /// Map a failed user write to the caller-visible outcome. Two concurrent
    /// registrations can both pass the pre-insert check; the loser's
    /// unique-index violation is still a Conflict naming the field, not a
    /// store fault.
    pub fn user_write_error(err: &anyhow::Error) -> Self {
        if let Some(db_err) = err.downcast_ref::<sea_orm::DbErr>()
            && let Some(sea_orm::SqlErr::UniqueConstraintViolation(msg)) = db_err.sql_err()
        {
            let field = if msg.contains("email") { "email" } else { "username" };
            return Self::conflict(field);
        }

        Self::DatabaseError(err.to_string())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}
