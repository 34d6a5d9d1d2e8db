//! Registration handlers.
//!
//! Registering is public and issues the ticket within the same request.
//! Desk operations (listing, check-in, food distribution) need a staff token;
//! re-issuing a ticket needs an admin token.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Serialize;

use pycontg_core::RegistrationId;

use crate::db::{RegistrationRepository, RepositoryError};
use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireStaff};
use crate::models::{
    CheckInUpdate, FoodCheckUpdate, NewRegistration, Registration, RegistrationCreated,
};
use crate::services::RegistrationService;
use crate::state::AppState;

/// Build the registrations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/registrations", post(register).get(list))
        .route("/api/registrations/{id}", get(show))
        .route("/api/registrations/{id}/checkin", put(check_in))
        .route("/api/registrations/{id}/food", put(food_check))
        .route("/api/registrations/{id}/ticket", post(reissue_ticket))
}

/// Response of a ticket re-issue.
#[derive(Debug, Serialize)]
pub struct TicketReissued {
    pub registration_id: RegistrationId,
    pub ticket_reference: String,
    pub ticket_url: String,
}

fn service(state: &AppState) -> RegistrationService<'_> {
    RegistrationService::new(
        state.records(),
        state.issuer(),
        &state.config().ticket.default_country_city,
    )
}

/// Store a registration, then render, upload and mail its ticket.
///
/// # Errors
///
/// Returns 409 if the email is already registered, 500 `Registration failed`
/// if nothing was stored, and 500 with `registration_saved: true` if the
/// registration is stored but the ticket could not be delivered.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<NewRegistration>,
) -> Result<(StatusCode, Json<RegistrationCreated>), AppError> {
    let (registration, ticket) = service(&state).register(body).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegistrationCreated {
            message: "Registration successful, your ticket has been sent by email",
            registration_id: registration.id,
            ticket_reference: ticket.reference.to_string(),
            ticket_url: ticket.url.to_string(),
        }),
    ))
}

/// List all registrations.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn list(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Registration>>, AppError> {
    Ok(Json(
        RegistrationRepository::new(state.records()).list().await?,
    ))
}

/// Get one registration.
///
/// # Errors
///
/// Returns 404 if the registration does not exist.
pub async fn show(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
) -> Result<Json<Registration>, AppError> {
    RegistrationRepository::new(state.records())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Registration {id} not found")))
}

/// Mark a registration as checked in (or undo it).
///
/// # Errors
///
/// Returns 404 if the registration does not exist.
#[tracing::instrument(skip(state, staff, body), fields(staff_id = %staff.id))]
pub async fn check_in(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
    Json(body): Json<CheckInUpdate>,
) -> Result<Json<Registration>, AppError> {
    let registration = RegistrationRepository::new(state.records())
        .set_checked(id, body.is_checked)
        .await
        .map_err(|e| not_found_as(e, id))?;
    tracing::info!(checked = body.is_checked, "Check-in updated");
    Ok(Json(registration))
}

/// Mark a registration's meal as served (or undo it).
///
/// # Errors
///
/// Returns 404 if the registration does not exist.
#[tracing::instrument(skip(state, staff, body), fields(staff_id = %staff.id))]
pub async fn food_check(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
    Json(body): Json<FoodCheckUpdate>,
) -> Result<Json<Registration>, AppError> {
    let registration = RegistrationRepository::new(state.records())
        .set_food_checked(id, body.is_checked)
        .await
        .map_err(|e| not_found_as(e, id))?;
    tracing::info!(food_checked = body.is_checked, "Food check updated");
    Ok(Json(registration))
}

/// Issue the ticket of an existing registration again.
///
/// # Errors
///
/// Returns 404 if the registration does not exist and 500 with
/// `registration_saved: true` if the ticket could not be delivered.
#[tracing::instrument(skip(state, admin), fields(staff_id = %admin.id))]
pub async fn reissue_ticket(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<RegistrationId>,
) -> Result<Json<TicketReissued>, AppError> {
    let ticket = service(&state).reissue(id).await?;
    Ok(Json(TicketReissued {
        registration_id: id,
        ticket_reference: ticket.reference.to_string(),
        ticket_url: ticket.url.to_string(),
    }))
}

fn not_found_as(err: RepositoryError, id: RegistrationId) -> AppError {
    match err {
        RepositoryError::NotFound => AppError::NotFound(format!("Registration {id} not found")),
        other => other.into(),
    }
}
