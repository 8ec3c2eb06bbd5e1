//! HTTP request handlers for all API endpoints.
//!
//! Each handler validates the request, resolves the caller via the
//! [`crate::auth::current_user`] extractor where a session is required,
//! consults the access-control decision for privileged operations, and
//! performs storage work through the repositories in
//! [`crate::db::handlers`].
//!
//! Handlers return [`crate::errors::Error`], which converts to the
//! appropriate HTTP status with a `{error: message}` JSON body.

pub mod auth;
pub mod simulations;
