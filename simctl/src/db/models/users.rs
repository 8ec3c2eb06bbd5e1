//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user.
///
/// The email is expected to be normalized (trimmed, lowercased) by the
/// caller before it reaches the repository.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub name: Option<String>,
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub role: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub password_hash: String,
}
