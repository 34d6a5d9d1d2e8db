//! Staff account commands.
//!
//! # Usage
//!
//! ```bash
//! # Create the first admin (the password can also come from STAFF_PASSWORD)
//! pycontg staff create -e admin@pytogo.org -n "Admin Name" -r admin --password '...'
//! ```
//!
//! # Environment Variables
//!
//! - `BACKOFFICE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use thiserror::Error;

use pycontg_backoffice::config::{ConfigError, database_url_from_env};
use pycontg_backoffice::db::{PgRecordStore, create_pool};
use pycontg_backoffice::models::NewStaff;
use pycontg_backoffice::services::{AuthError, AuthService};
use pycontg_core::{Email, StaffId, StaffRole};

/// Errors that can occur during staff operations.
#[derive(Debug, Error)]
pub enum StaffError {
    /// Database URL is missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, staff, reviewer")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Account creation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Parse the command-line inputs of a new staff account.
///
/// # Errors
///
/// Returns `StaffError::InvalidEmail` or `StaffError::InvalidRole`.
pub fn new_staff(
    email: &str,
    name: &str,
    role: &str,
    password: String,
) -> Result<NewStaff, StaffError> {
    let role: StaffRole = role
        .parse()
        .map_err(|_| StaffError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|e| StaffError::InvalidEmail(e.to_string()))?;

    Ok(NewStaff {
        full_name: name.to_owned(),
        email,
        password,
        role,
    })
}

/// Create a new staff account.
///
/// # Returns
///
/// The id of the created account.
///
/// # Errors
///
/// Returns an error for invalid input, a weak password, a taken email or an
/// unreachable database.
pub async fn create(
    email: &str,
    name: &str,
    role: &str,
    password: String,
) -> Result<StaffId, StaffError> {
    let new = new_staff(email, name, role, password)?;
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to back office database...");
    let store = PgRecordStore::new(create_pool(&database_url).await?);

    tracing::info!("Creating staff account: {} ({})", new.email, new.role);
    let member = AuthService::new(&store).create_staff(new).await?;

    tracing::info!("Staff account created with id {}", member.id);
    Ok(member.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_staff_parses_inputs() {
        let new = new_staff("desk@pytogo.org", "Desk One", "reviewer", "pw".to_string()).unwrap();
        assert_eq!(new.role, StaffRole::Reviewer);
        assert_eq!(new.email.as_str(), "desk@pytogo.org");
    }

    #[test]
    fn test_new_staff_rejects_bad_inputs() {
        assert!(matches!(
            new_staff("desk@pytogo.org", "Desk", "organizer", String::new()),
            Err(StaffError::InvalidRole(_))
        ));
        assert!(matches!(
            new_staff("not-an-email", "Desk", "staff", String::new()),
            Err(StaffError::InvalidEmail(_))
        ));
    }
}
