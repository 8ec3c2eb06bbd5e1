//! API request and response data models.
//!
//! These models define the public API contract and are distinct from the
//! database models in [`crate::db::models`], allowing the wire and storage
//! representations to evolve independently.

pub mod auth;
pub mod simulations;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Minimal `{ok: true}` envelope shared by logout and delete responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}
