//! Authentication and authorization.
//!
//! Authentication is session-based: a login exchanges email/password for a
//! server-signed token delivered in an HttpOnly cookie. The token binds the
//! client to a user id and nothing else — no role or permission claims are
//! embedded, so authorization is re-evaluated from durable storage on every
//! request and a role change takes effect immediately.
//!
//! Authorization uses a two-tier model: a platform-wide role on the user
//! ("admin" vs ordinary) and a per-simulation membership role. The decision
//! logic lives in [`access`] as a pure function over the joined grant row.
//!
//! # Modules
//!
//! - [`access`]: the three-way authorization decision
//! - [`current_user`]: extractor resolving the session cookie to a fresh user
//! - [`password`]: password hashing and verification using Argon2
//! - [`session`]: session token creation, verification, and cookies

pub mod access;
pub mod current_user;
pub mod password;
pub mod session;
