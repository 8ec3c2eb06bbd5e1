use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        auth::{AuthResponse, LoginRequest, LoginResponse, LogoutResponse, MeResponse},
        users::{CurrentUser, UserResponse},
    },
    auth::{password, session},
    db::handlers::Users,
    errors::Error,
};

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let email = request.email.trim().to_lowercase();
    let password = request.password;

    if email.is_empty() || password.is_empty() {
        return Err(Error::BadRequest {
            message: "Email and password required".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    // Unknown email and wrong password collapse into the same error so the
    // response never reveals whether an account exists.
    let user = user_repo.get_user_by_email(&email).await?.ok_or(Error::InvalidCredentials)?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::InvalidCredentials);
    }

    let token = session::create_session_token(user.id, &state.config)?;
    let cookie = session::create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            ok: true,
            user: UserResponse::from(user),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful, idempotent", body = crate::api::models::OkResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> LogoutResponse {
    LogoutResponse {
        cookie: session::clear_session_cookie(&state.config),
    }
}

/// Current authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn me(current_user: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserResponse::from(current_user),
    })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, seed_test_user};
    use axum::http::{StatusCode, header::SET_COOKIE};
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_success_establishes_session(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = seed_test_user(&pool, "alice@example.com", "hunter2", "member").await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({"email": "alice@example.com", "password": "hunter2"}))
            .await;

        response.assert_status(StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_some());

        let body: serde_json::Value = response.json();
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["user"]["id"], json!(user.id));
        assert_eq!(body["user"]["email"], json!("alice@example.com"));
        assert!(body["user"].get("password_hash").is_none());

        // The saved cookie now authenticates /api/auth/me
        let me = server.get("/api/auth/me").await;
        me.assert_status(StatusCode::OK);
        let me_body: serde_json::Value = me.json();
        assert_eq!(me_body["user"]["email"], json!("alice@example.com"));
        assert_eq!(me_body["user"]["role"], json!("member"));
    }

    #[sqlx::test]
    async fn test_login_normalizes_email(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        seed_test_user(&pool, "case@example.com", "hunter2", "member").await;

        let response = server
            .post("/api/auth/login")
            .json(&json!({"email": "  Case@Example.COM ", "password": "hunter2"}))
            .await;

        response.assert_status(StatusCode::OK);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_failures_do_not_reveal_account_existence(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        seed_test_user(&pool, "known@example.com", "correct-password", "member").await;

        let unknown_email = server
            .post("/api/auth/login")
            .json(&json!({"email": "unknown@example.com", "password": "whatever"}))
            .await;
        let wrong_password = server
            .post("/api/auth/login")
            .json(&json!({"email": "known@example.com", "password": "not-the-password"}))
            .await;

        unknown_email.assert_status(StatusCode::UNAUTHORIZED);
        wrong_password.assert_status(StatusCode::UNAUTHORIZED);
        // Identical payloads for both failure modes
        assert_eq!(unknown_email.text(), wrong_password.text());
    }

    #[sqlx::test]
    async fn test_login_missing_fields(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.post("/api/auth/login").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server.post("/api/auth/login").json(&json!({"email": "a@b.c"})).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Whitespace-only email counts as missing
        let response = server
            .post("/api/auth/login")
            .json(&json!({"email": "   ", "password": "pw"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    async fn test_logout_is_idempotent(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        seed_test_user(&pool, "bob@example.com", "pw", "member").await;

        server
            .post("/api/auth/login")
            .json(&json!({"email": "bob@example.com", "password": "pw"}))
            .await
            .assert_status(StatusCode::OK);

        let first = server.post("/api/auth/logout").await;
        first.assert_status(StatusCode::OK);
        let body: serde_json::Value = first.json();
        assert_eq!(body["ok"], json!(true));

        // Clearing an already-empty session is not an error
        let second = server.post("/api/auth/logout").await;
        second.assert_status(StatusCode::OK);

        // The session is actually gone
        server.get("/api/auth/me").await.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_me_requires_session(pool: SqlitePool) {
        let server = create_test_app(pool).await;

        let response = server.get("/api/auth/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], json!("Not authenticated"));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_stale_session_is_rejected_and_cleared(pool: SqlitePool) {
        let server = create_test_app(pool.clone()).await;
        let user = seed_test_user(&pool, "ghost@example.com", "pw", "member").await;

        server
            .post("/api/auth/login")
            .json(&json!({"email": "ghost@example.com", "password": "pw"}))
            .await
            .assert_status(StatusCode::OK);

        // Delete the account out from under the live session
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user.id)
            .execute(&pool)
            .await
            .unwrap();

        let response = server.get("/api/auth/me").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // The rejection carries a clearing cookie
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .expect("stale session response should clear the cookie")
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
