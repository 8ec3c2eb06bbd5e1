//! Database layer for data persistence and access.
//!
//! This module implements the data access layer using SQLx with SQLite,
//! following the repository pattern:
//!
//! - [`handlers`]: repository implementations for CRUD operations
//! - [`models`]: database request/response structures
//! - [`errors`]: database-specific error types
//!
//! Repositories wrap a `&mut SqliteConnection`, so they work equally over a
//! pool connection or inside a transaction. Multi-table writes (simulation
//! creation with its membership grant, simulation deletion with its
//! membership cleanup) always run inside a single transaction.
//!
//! Migrations live in `migrations/` and are embedded via
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
