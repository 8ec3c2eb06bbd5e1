//! API request/response models for authentication.

use crate::api::models::{OkResponse, users::UserResponse};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login payload. Fields default to empty strings so requests with missing
/// keys fall through to the handler's emptiness validation (400) rather
/// than a deserialization rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub ok: bool,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}

/// Login body plus the session cookie that establishes the binding.
#[derive(Debug)]
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

/// Logout body plus the expired cookie that clears the session.
#[derive(Debug)]
pub struct LogoutResponse {
    pub cookie: String,
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().insert(SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid session cookie header: {e}"),
    }
    response
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        let response = (StatusCode::OK, Json(self.auth_response)).into_response();
        with_cookie(response, &self.cookie)
    }
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        let response = (StatusCode::OK, Json(OkResponse { ok: true })).into_response();
        with_cookie(response, &self.cookie)
    }
}
