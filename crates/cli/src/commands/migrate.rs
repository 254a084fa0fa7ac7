//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! pf-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PARCELFLOW_DATABASE_URL` - `SQLite` connection string
//!   (default: sqlite://parcelflow.db)

use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur during migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = SecretString::from(
        std::env::var("PARCELFLOW_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://parcelflow.db".to_owned()),
    );

    tracing::info!("Connecting to database...");
    let pool = parcelflow_server::db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    parcelflow_server::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
