//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: request/response data structures for API communication
//!
//! The API is divided into two functional areas:
//!
//! - **Authentication** (`/api/auth/*`): login, logout, current user
//! - **Simulations** (`/api/simulations*`): membership-scoped listing,
//!   creation, and authorized deletion
//!
//! All endpoints are documented with OpenAPI annotations via `utoipa`; the
//! generated document is served at `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
