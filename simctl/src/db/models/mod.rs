//! Database record models.
//!
//! Request/response structures used by the repositories in
//! [`crate::db::handlers`]. Kept distinct from the API models in
//! [`crate::api::models`] so storage and wire representations can evolve
//! independently.

pub mod simulations;
pub mod users;
