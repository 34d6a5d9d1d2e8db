//! Generic record deletion (admin only).

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
};

use crate::db::{RepositoryError, Table};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Build the records router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/records/{table}/{id}", delete(remove))
}

/// Delete a record from any table.
///
/// # Errors
///
/// Returns 400 for an unknown table and 404 if the record does not exist.
#[tracing::instrument(skip(state, admin), fields(staff_id = %admin.id))]
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((table, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let table: Table = table.parse().map_err(AppError::BadRequest)?;

    state
        .records()
        .delete(table, &id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound(format!("No {table} record {id}")),
            other => other.into(),
        })?;

    tracing::warn!(%table, record = %id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}
