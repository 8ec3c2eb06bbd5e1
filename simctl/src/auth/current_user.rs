//! Extractor resolving the session cookie to the authenticated user.

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    db::handlers::{Repository, Users},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

/// Pull the session token out of the Cookie header, if present.
fn session_cookie(parts: &Parts, config: &Config) -> Option<String> {
    let cookie_header = parts.headers.get(axum::http::header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;
    let cookie_name = &config.session.cookie_name;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    /// The session binds a user id only; everything else about the user is
    /// read fresh from storage here, on every request.
    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = session_cookie(parts, &state.config).ok_or(Error::Unauthenticated { message: None })?;

        let user_id = session::verify_session_token(&token, &state.config).map_err(|e| match e {
            // Key/config problems stay server errors; everything else is
            // just an unusable session.
            Error::Internal { .. } => e,
            _ => Error::Unauthenticated { message: None },
        })?;

        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let mut users = Users::new(&mut conn);

        match users.get_by_id(user_id).await? {
            Some(user) => Ok(CurrentUser::from(user)),
            None => {
                // The account behind this session is gone. Reject, and push
                // an expired cookie so the client drops the stale session.
                trace!("session resolved to missing user {user_id}");
                Err(Error::StaleSession {
                    clear_cookie: session::clear_session_cookie(&state.config),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state, seed_test_user};
    use axum::http::StatusCode;
    use sqlx::SqlitePool;

    fn parts_with_cookie(cookie: Option<&str>) -> Parts {
        let mut builder = axum::http::Request::builder().uri("http://localhost/test");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        let (parts, _body) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[sqlx::test]
    async fn test_valid_session_resolves_user(pool: SqlitePool) {
        let state = create_test_state(pool.clone());
        let user = seed_test_user(&pool, "resolve@example.com", "pw", "member").await;

        let token = session::create_session_token(user.id, &state.config).unwrap();
        let cookie = format!("{}={}", state.config.session.cookie_name, token);
        let mut parts = parts_with_cookie(Some(&cookie));

        let current = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.email, "resolve@example.com");
        assert_eq!(current.role, "member");
    }

    #[sqlx::test]
    async fn test_missing_cookie_is_unauthenticated(pool: SqlitePool) {
        let state = create_test_state(pool);
        let mut parts = parts_with_cookie(None);

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[sqlx::test]
    async fn test_garbage_token_is_unauthenticated(pool: SqlitePool) {
        let state = create_test_state(pool);
        let cookie = format!("{}=not-a-real-token", state.config.session.cookie_name);
        let mut parts = parts_with_cookie(Some(&cookie));

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test]
    async fn test_stale_session_is_invalidated(pool: SqlitePool) {
        let state = create_test_state(pool.clone());
        let user = seed_test_user(&pool, "stale@example.com", "pw", "member").await;
        let token = session::create_session_token(user.id, &state.config).unwrap();

        // Delete the account out from under the session
        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        assert!(users.delete(user.id).await.unwrap());

        let cookie = format!("{}={}", state.config.session.cookie_name, token);
        let mut parts = parts_with_cookie(Some(&cookie));

        let err = CurrentUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        match err {
            Error::StaleSession { clear_cookie } => {
                assert!(clear_cookie.starts_with(&format!("{}=;", state.config.session.cookie_name)));
                assert!(clear_cookie.contains("Max-Age=0"));
            }
            other => panic!("expected StaleSession, got {other:?}"),
        }
    }

    #[test]
    fn test_session_cookie_extraction_walks_all_cookies() {
        let config = create_test_config();
        let cookie_name = &config.session.cookie_name;

        let header = format!("other=1; {cookie_name}=tok123; another=2");
        let parts = parts_with_cookie(Some(&header));
        assert_eq!(session_cookie(&parts, &config), Some("tok123".to_string()));

        // An emptied cookie does not count as a session
        let header = format!("{cookie_name}=");
        let parts = parts_with_cookie(Some(&header));
        assert_eq!(session_cookie(&parts, &config), None);
    }
}
