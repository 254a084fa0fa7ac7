//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create the first admin account
//! pf-cli user create -u admin -e admin@example.com -p 'a-strong-password' -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `PARCELFLOW_DATABASE_URL` - `SQLite` connection string
//!   (default: sqlite://parcelflow.db)

use secrecy::SecretString;
use thiserror::Error;

use parcelflow_core::{UserRole, Username};

use parcelflow_server::db::users::NewUser;
use parcelflow_server::db::{RepositoryError, UserRepository};
use parcelflow_server::services::password::hash_password;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository failure.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, manager, employee, customer")]
    InvalidRole(String),

    /// Invalid username.
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("A user already exists with this username or email")]
    UserExists,

    /// Password hashing failed.
    #[error("Password hashing failed")]
    Hashing,
}

/// Create a new user account.
///
/// # Arguments
///
/// * `username` - Login name
/// * `email` - Email address
/// * `password` - Plaintext password (hashed before storage)
/// * `role` - Account role (`admin`, `manager`, `employee`, `customer`)
/// * `full_name` - Optional display name
///
/// # Errors
///
/// Returns `UserError` on validation failure, a duplicate account, or a
/// database problem.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
    full_name: Option<&str>,
) -> Result<(), UserError> {
    dotenvy::dotenv().ok();

    // Parse and validate inputs before touching the database
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;
    let username =
        Username::parse(username).map_err(|e| UserError::InvalidUsername(e.to_string()))?;
    let email = parcelflow_core::Email::parse(email)
        .map_err(|e| UserError::InvalidEmail(e.to_string()))?;

    let password_hash = hash_password(password).map_err(|_| UserError::Hashing)?;

    let database_url = SecretString::from(
        std::env::var("PARCELFLOW_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://parcelflow.db".to_owned()),
    );

    tracing::info!("Connecting to database...");
    let pool = parcelflow_server::db::create_pool(&database_url).await?;

    tracing::info!("Creating user: {} ({})", username, role);

    let user = UserRepository::new(&pool)
        .create(&NewUser {
            username: &username,
            email: &email,
            password_hash: &password_hash,
            full_name,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => UserError::UserExists,
            other => UserError::Repository(other),
        })?;

    tracing::info!(
        "User created successfully! ID: {}, Username: {}, Role: {}",
        user.id,
        user.username,
        user.role
    );

    Ok(())
}
