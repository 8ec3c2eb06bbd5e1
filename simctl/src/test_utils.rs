//! Shared helpers for tests: configuration, servers, and seeded users.

use crate::auth::password::{self, Argon2Params};
use crate::config::Config;
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::{AppState, Application};
use axum::http::StatusCode;
use axum_test::TestServer;
use sqlx::SqlitePool;

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Config::default()
    }
}

pub fn create_test_state(pool: SqlitePool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

/// A full application over the test pool, exposed as a `TestServer` with a
/// cookie jar so the session survives across requests.
pub async fn create_test_app(pool: SqlitePool) -> TestServer {
    let config = create_test_config();

    let app = Application::new_with_pool(config, pool).await.expect("Failed to create application");

    app.into_test_server()
}

// Light Argon2 cost: these hashes only exist to make login paths work in
// tests, not to survive an attacker.
fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

/// Insert a user with the given (normalized) email, password, and global role.
pub async fn seed_test_user(pool: &SqlitePool, email: &str, password: &str, role: &str) -> UserDBResponse {
    let password_hash = password::hash_string_with_params(password, Some(fast_params())).expect("Failed to hash test password");

    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);

    users_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash,
            role: role.to_string(),
            name: Some("Test User".to_string()),
        })
        .await
        .expect("Failed to create test user")
}

/// Log the server's cookie jar in as the given user. Replaces any session
/// established by an earlier login.
pub async fn login_as(server: &TestServer, email: &str, password: &str) {
    let response = server
        .post("/api/auth/login")
        .json(&serde_json::json!({"email": email, "password": password}))
        .await;
    response.assert_status(StatusCode::OK);
}
