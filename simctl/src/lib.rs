//! # simctl: Simulation Campaign Control API
//!
//! `simctl` is a session-authenticated web API for managing user accounts and
//! simulation campaign resources with per-resource role-based access control.
//! It exposes a small JSON API for logging in, inspecting the current session,
//! and creating, listing, and deleting simulations.
//!
//! ## Overview
//!
//! Access to a simulation is governed by a two-tier authorization model. Every
//! user carries a platform-wide role ("admin" vs ordinary), and every
//! simulation carries per-user membership rows with their own role. A
//! membership row is what makes a simulation visible to a user; deleting one
//! requires either the "admin" membership role on that simulation or the
//! "admin" global role. The two tiers let a platform administrator manage any
//! simulation while simulation owners self-govern their own resources without
//! elevated global privilege.
//!
//! ### Request Flow
//!
//! A login exchanges email/password credentials for a server-signed session
//! token delivered in an HttpOnly cookie. The token binds the client to a user
//! id and nothing else: on every subsequent request the
//! [`CurrentUser`](api::models::users::CurrentUser) extractor verifies the
//! token and re-reads the user from storage, so role changes take effect
//! immediately and a session whose account has been deleted is rejected and
//! cleared. Handlers then consult the pure decision function in
//! [`auth::access`] before touching storage through the repositories in
//! [`db::handlers`]. Multi-table writes (simulation creation with its
//! membership grant, deletion with its membership cleanup) run inside a single
//! transaction.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use simctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = simctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize telemetry (structured logging)
//!     simctl::telemetry::init_telemetry()?;
//!
//!     // Create and start the application
//!     let app = Application::new(config).await?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application uses SQLite and automatically runs migrations on startup:
//!
//! ```no_run
//! # use sqlx::SqlitePool;
//! # async fn example(pool: SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
//! simctl::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    auth::password,
    config::CorsOrigin,
    db::handlers::{Repository, Users},
    db::models::users::UserCreateDBRequest,
    openapi::ApiDoc,
};
use axum::{
    Json, Router, http,
    http::HeaderValue,
    routing::{delete, get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;

pub use types::{SimulationId, UserId};

/// Application state shared across all request handlers.
///
/// Sessions live entirely client-side in the signed cookie, so the shared
/// state is just the database pool and the configuration.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the simctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: if a user with the given email already exists it is left
/// untouched (including its password) and its id is returned. Typically
/// called during application startup so there is always an admin account
/// available.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: &str, db: &SqlitePool) -> anyhow::Result<UserId> {
    let email = email.trim().to_lowercase();
    let mut tx = db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if let Some(existing_user) = user_repo.get_user_by_email(&email).await? {
        debug!("Admin user {email} already exists, leaving it untouched");
        tx.commit().await?;
        return Ok(existing_user.id);
    }

    let password_hash = password::hash_string(password).map_err(|e| anyhow::anyhow!("Failed to hash admin password: {e}"))?;

    let created_user = user_repo
        .create(&UserCreateDBRequest {
            email: email.clone(),
            password_hash,
            role: "admin".to_string(),
            name: Some("Administrator".to_string()),
        })
        .await?;

    tx.commit().await?;
    info!("Created initial admin user {email}");
    Ok(created_user.id)
}

/// Connect to the configured SQLite database and run migrations.
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let url = config.database_url();
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true).foreign_keys(true);

    // An in-memory SQLite database exists per connection, so the pool must be
    // pinned to a single connection that never gets recycled.
    let pool = if url.contains(":memory:") || url.contains("mode=memory") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new().max_connections(5).connect_with(options).await?
    };

    migrator().run(&pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.cors.allow_credentials)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::DELETE])
        .allow_headers([http::header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// Constructs the complete Axum router with the authentication and simulation
/// routes under `/api`, the generated OpenAPI document, CORS, and tracing
/// middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route("/health", get(|| async { Json(api::models::OkResponse { ok: true }) }))
        // Session authentication
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/me", get(api::handlers::auth::me))
        // Membership-scoped simulation management
        .route(
            "/simulations",
            get(api::handlers::simulations::list_simulations).post(api::handlers::simulations::create_simulation),
        )
        .route("/simulations/{id}", delete(api::handlers::simulations::delete_simulation))
        .with_state(state.clone());

    let router = Router::new()
        .nest("/api", api_routes)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;

    let router = router.layer(cors_layer).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations, and seeds the initial admin user
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts
///    handling requests
/// 3. **Shutdown**: when the shutdown signal resolves, in-flight requests
///    drain and the database pool is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create a new application instance over an existing pool (migrations
    /// are still applied; already-applied ones are skipped).
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        debug!("Starting simctl with configuration: {:#?}", config);

        migrator().run(&pool).await?;

        if let Some(password) = config.admin_password.as_deref() {
            create_initial_admin_user(&config.admin_email, password, &pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;
        } else {
            warn!("admin_password is not configured; skipping initial admin user seeding");
        }

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .build(self.router)
            .expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "simctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
