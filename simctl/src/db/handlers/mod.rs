//! Repository implementations for database access.
//!
//! Each repository wraps a SQLx connection (or transaction, via deref) and
//! provides strongly-typed operations returning models from
//! [`crate::db::models`].
//!
//! - [`Users`]: user accounts and credential lookups
//! - [`Simulations`]: simulation lifecycle and membership grants

pub mod repository;
pub mod simulations;
pub mod users;

pub use repository::Repository;
pub use simulations::Simulations;
pub use users::Users;
