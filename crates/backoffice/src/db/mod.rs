//! Record storage for the back office.
//!
//! Every record is a JSON document stored under a unique string key in one
//! of a fixed set of tables. Handlers and services talk to storage through
//! the object-safe [`RecordStore`] trait so that the HTTP layer can run
//! against `PostgreSQL` in production and [`MemoryRecordStore`] in tests.
//!
//! ## Tables
//!
//! - `registrations` - Attendee registrations (ticket pipeline input)
//! - `staff` - Back office accounts with Argon2 password hashes
//! - `sponsor_tiers` - Sponsorship packages
//! - `sponsor_inquiry` - Sponsor contact requests, `paid` once settled
//! - `volunteer_inquiry` - Volunteer applications
//! - `proposals` - Talk proposals
//! - `proposal_reviews` - Reviewer ratings of proposals
//! - `waitlist` - Emails waiting for a free seat
//!
//! # Migrations
//!
//! Migrations are stored in `crates/backoffice/migrations/` and run via:
//! ```bash
//! cargo run -p pycontg-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod registrations;
pub mod reviews;
pub mod staff;

use std::time::Duration;

use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;
pub use registrations::RegistrationRepository;
pub use reviews::ReviewRepository;
pub use staff::StaffRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate key or email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::DataCorruption(err.to_string())
    }
}

/// Tables a record can live in.
///
/// Table names never come from user input directly: paths such as
/// `/api/records/{table}/{id}` are parsed into this allowlist first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Registrations,
    Staff,
    SponsorTiers,
    SponsorInquiry,
    VolunteerInquiry,
    Proposals,
    ProposalReviews,
    Waitlist,
}

impl Table {
    /// All tables, in migration order.
    pub const ALL: [Self; 8] = [
        Self::Registrations,
        Self::Staff,
        Self::SponsorTiers,
        Self::SponsorInquiry,
        Self::VolunteerInquiry,
        Self::Proposals,
        Self::ProposalReviews,
        Self::Waitlist,
    ];

    /// SQL table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Registrations => "registrations",
            Self::Staff => "staff",
            Self::SponsorTiers => "sponsor_tiers",
            Self::SponsorInquiry => "sponsor_inquiry",
            Self::VolunteerInquiry => "volunteer_inquiry",
            Self::Proposals => "proposals",
            Self::ProposalReviews => "proposal_reviews",
            Self::Waitlist => "waitlist",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|table| table.name() == s)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}

/// A condition on a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals the given JSON value.
    Eq { field: String, value: Value },
    /// Field is present and, for strings, not only whitespace.
    NotBlank { field: String },
}

impl Filter {
    /// Equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Non-blank filter.
    pub fn not_blank(field: impl Into<String>) -> Self {
        Self::NotBlank {
            field: field.into(),
        }
    }

    /// Whether `document` satisfies this filter.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::Eq { field, value } => document.get(field) == Some(value),
            Self::NotBlank { field } => match document.get(field) {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            },
        }
    }
}

/// Keyed document storage.
///
/// `update` applies a shallow merge: top-level fields of the patch replace
/// the stored ones, other fields are kept.
pub trait RecordStore: Send + Sync {
    /// Insert a new document. Fails with [`RepositoryError::Conflict`] if the key exists.
    fn create<'a>(
        &'a self,
        table: Table,
        key: &'a str,
        document: Value,
    ) -> BoxFuture<'a, Result<(), RepositoryError>>;

    /// Fetch a document by key.
    fn read<'a>(
        &'a self,
        table: Table,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Value>, RepositoryError>>;

    /// Merge `patch` into the stored document and return the result.
    fn update<'a>(
        &'a self,
        table: Table,
        key: &'a str,
        patch: Value,
    ) -> BoxFuture<'a, Result<Value, RepositoryError>>;

    /// Remove a document. Fails with [`RepositoryError::NotFound`] if absent.
    fn delete<'a>(&'a self, table: Table, key: &'a str)
    -> BoxFuture<'a, Result<(), RepositoryError>>;

    /// Documents matching every filter, oldest first.
    fn list<'a>(
        &'a self,
        table: Table,
        filters: &'a [Filter],
    ) -> BoxFuture<'a, Result<Vec<Value>, RepositoryError>>;

    /// Check that the backing store answers.
    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>>;
}

/// Shallow merge of `patch` into `target`. Non-object patches are rejected.
pub(crate) fn merge_into(target: &mut Value, patch: Value) -> Result<(), RepositoryError> {
    let (Value::Object(target), Value::Object(patch)) = (target, patch) else {
        return Err(RepositoryError::DataCorruption(
            "documents and patches must be JSON objects".to_string(),
        ));
    };
    target.extend(patch);
    Ok(())
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_table_names_roundtrip() {
        for table in Table::ALL {
            assert_eq!(table.name().parse::<Table>(), Ok(table));
        }
        assert!("users; drop table staff".parse::<Table>().is_err());
    }

    #[test]
    fn test_eq_filter() {
        let doc = json!({"paid": true, "status": "accepted"});
        assert!(Filter::eq("paid", true).matches(&doc));
        assert!(!Filter::eq("paid", false).matches(&doc));
        assert!(Filter::eq("status", "accepted").matches(&doc));
        assert!(!Filter::eq("missing", "x").matches(&doc));
    }

    #[test]
    fn test_not_blank_filter() {
        let filter = Filter::not_blank("motivation");
        assert!(filter.matches(&json!({"motivation": "I love Python"})));
        assert!(!filter.matches(&json!({"motivation": "   "})));
        assert!(!filter.matches(&json!({"motivation": null})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut doc = json!({"fullName": "tester 1", "checked": false, "extra": {"a": 1}});
        merge_into(&mut doc, json!({"checked": true, "extra": {"b": 2}})).ok();
        assert_eq!(
            doc,
            json!({"fullName": "tester 1", "checked": true, "extra": {"b": 2}})
        );
    }

    #[test]
    fn test_merge_rejects_non_objects() {
        let mut doc = json!({"a": 1});
        assert!(merge_into(&mut doc, json!([1, 2])).is_err());
    }
}
