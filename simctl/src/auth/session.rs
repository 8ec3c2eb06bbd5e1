//! Session token creation and verification, plus the cookies that carry it.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, errors::Error, types::UserId};

/// Session claims.
///
/// Carries only the user id and token timestamps. Roles and permissions are
/// deliberately not embedded: authorization is re-read from storage on every
/// request, so a role change takes effect immediately instead of living on
/// in old tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId, // Subject (user ID)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
}

impl SessionClaims {
    /// Create new session claims for a user
    pub fn new(user_id: UserId, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.session.timeout;

        Self {
            sub: user_id,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Create a signed token for a user session
pub fn create_session_token(user_id: UserId, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::new(user_id, config);
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "sign session token: secret_key is required".to_string(),
    })?;

    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create session token: {e}"),
    })
}

/// Verify and decode a session token, returning the bound user id
pub fn verify_session_token(token: &str, config: &Config) -> Result<UserId, Error> {
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "verify session token: secret_key is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Everything else is a server-side problem (key issues, internal failures)
        _ => Error::Internal {
            operation: format!("session token verification: {e}"),
        },
    })?;

    Ok(token_data.claims.sub)
}

/// Build the Set-Cookie value that hands the session token to the client.
pub fn create_session_cookie(token: &str, config: &Config) -> String {
    let session = &config.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session.cookie_name,
        token,
        session.cookie_same_site,
        session.timeout.as_secs()
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the Set-Cookie value that clears the session. Used by logout and
/// by stale-session invalidation; clearing an absent cookie is harmless.
pub fn clear_session_cookie(config: &Config) -> String {
    let session = &config.session;
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session.cookie_name, session.cookie_same_site
    );
    if session.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
