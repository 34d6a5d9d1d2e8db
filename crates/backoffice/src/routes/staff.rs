//! Staff account management handlers (admin only).

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use pycontg_core::StaffId;

use crate::db::{RepositoryError, StaffRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::models::{NewStaff, StaffProfile, StaffUpdate};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the staff router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/staff", get(list).post(create))
        .route("/api/staff/{id}", put(update).delete(remove))
}

/// List staff accounts.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn list(
    RequireAdmin(_): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<StaffProfile>>, AppError> {
    let members = StaffRepository::new(state.records()).list_all().await?;
    Ok(Json(members.into_iter().map(StaffProfile::from).collect()))
}

/// Create a staff account.
///
/// # Errors
///
/// Returns 400 for a weak password and 409 if the email is taken.
#[tracing::instrument(skip_all, fields(staff_id = %admin.id))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewStaff>,
) -> Result<(StatusCode, Json<StaffProfile>), AppError> {
    let member = AuthService::new(state.records()).create_staff(body).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

/// Update a staff account.
///
/// # Errors
///
/// Returns 404 if the account does not exist.
#[tracing::instrument(skip(state, admin, body), fields(staff_id = %admin.id))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
    Json(body): Json<StaffUpdate>,
) -> Result<Json<StaffProfile>, AppError> {
    let member = AuthService::new(state.records())
        .update_staff(id, body)
        .await?;
    tracing::info!(target_staff_id = %id, "Staff account updated");
    Ok(Json(member.into()))
}

/// Delete a staff account. Admins cannot delete their own account.
///
/// # Errors
///
/// Returns 400 for the caller's own account and 404 if the account does not exist.
#[tracing::instrument(skip(state, admin), fields(staff_id = %admin.id))]
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
) -> Result<StatusCode, AppError> {
    if id == admin.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }
    StaffRepository::new(state.records())
        .delete(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(format!("Staff account {id} not found"))
            }
            other => other.into(),
        })?;
    tracing::info!(target_staff_id = %id, "Staff account deleted");
    Ok(StatusCode::NO_CONTENT)
}
