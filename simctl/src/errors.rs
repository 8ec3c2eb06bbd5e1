use crate::db::errors::DbError;
use crate::types::Operation;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// A session token verified but its user no longer exists. Carries the
    /// clearing cookie so the rejection also invalidates the session.
    #[error("Session bound to a missing user")]
    StaleSession { clear_cookie: String },

    /// Login failure. Deliberately undifferentiated: unknown email and
    /// wrong password produce this same error.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Caller is known to the resource but lacks the required role
    #[error("{action} forbidden on {resource}")]
    Forbidden { action: Operation, resource: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found (or caller is not a member of it)
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } | Error::StaleSession { .. } | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Not authenticated".to_string()),
            Error::StaleSession { .. } => "Not authenticated".to_string(),
            Error::InvalidCredentials => "Invalid email or password".to_string(),
            Error::Forbidden { .. } => "Forbidden".to_string(),
            Error::BadRequest { message } => message.clone(),
            // Absent resources and inaccessible resources share one message
            // so non-members cannot probe for existence.
            Error::NotFound { .. } => "Not found".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::StaleSession { .. } | Error::InvalidCredentials | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.user_message() }));

        match self {
            Error::StaleSession { clear_cookie } => {
                let mut response = (status, body).into_response();
                match HeaderValue::from_str(&clear_cookie) {
                    Ok(value) => {
                        response.headers_mut().insert(header::SET_COOKIE, value);
                    }
                    Err(e) => tracing::error!("Invalid clearing cookie header: {e}"),
                }
                response
            }
            _ => (status, body).into_response(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
