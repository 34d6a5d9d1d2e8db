//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! pycontg migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BACKOFFICE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Stored in `crates/backoffice/migrations/` and embedded at build time.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use pycontg_backoffice::config::{ConfigError, database_url_from_env};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database URL is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the back office migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to back office database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running back office migrations...");
    sqlx::migrate!("../backoffice/migrations").run(&pool).await?;

    tracing::info!("Back office migrations complete!");
    Ok(())
}
