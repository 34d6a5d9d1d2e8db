//! Sponsor, volunteer and waitlist handlers.
//!
//! These records are filled by the public event site and read back here as
//! raw JSON documents; the back office only filters and patches them.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use pycontg_core::VolunteerId;

use crate::db::{Filter, RepositoryError, Table};
use crate::error::AppError;
use crate::middleware::RequireStaff;
use crate::models::normalize_tier;
use crate::state::AppState;

/// Build the inquiries router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sponsor-tiers", get(sponsor_tiers))
        .route("/api/sponsors", get(paid_sponsors))
        .route("/api/sponsorspaid", get(paid_sponsors))
        .route("/api/sponsorinquiries", get(sponsor_inquiries))
        .route("/api/volunteerinquiries", get(volunteer_inquiries))
        .route(
            "/api/volunteerinquiries/{id}",
            get(volunteer_inquiry).put(update_volunteer_inquiry),
        )
        .route("/api/volunteeraccepted", get(accepted_volunteers))
        .route("/api/volunteerwaiting", get(waiting_volunteers))
        .route("/api/volunteerrejected", get(rejected_volunteers))
        .route("/api/volunteer/{email}", get(volunteer_by_email))
        .route("/api/waitlist", get(waitlist))
}

/// Query string of the volunteer inquiry listing.
#[derive(Debug, Default, Deserialize)]
pub struct VolunteerQuery {
    /// `true`: only applicants who wrote a motivation; `false`: only those who did not.
    pub motivation: Option<bool>,
    /// `waiting`, `accepted` or `rejected`.
    pub status: Option<String>,
}

impl VolunteerQuery {
    fn with_status(status: &str) -> Self {
        Self {
            motivation: None,
            status: Some(status.to_string()),
        }
    }

    fn filters(&self) -> Vec<Filter> {
        let mut filters = Vec::new();
        match self.motivation {
            Some(true) => filters.push(Filter::not_blank("motivation")),
            Some(false) => filters.push(Filter::eq("motivation", "")),
            None => {}
        }
        if let Some(status) = self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filters.push(Filter::eq("status", status));
        }
        filters
    }
}

/// Sponsorship tiers with integer amounts.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn sponsor_tiers(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let tiers = state.records().list(Table::SponsorTiers, &[]).await?;
    Ok(Json(tiers.into_iter().map(normalize_tier).collect()))
}

/// Sponsors whose payment is settled.
///
/// # Errors
///
/// Returns 404 if there are none yet.
pub async fn paid_sponsors(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let filters = [Filter::eq("paid", true)];
    let sponsors = state.records().list(Table::SponsorInquiry, &filters).await?;
    if sponsors.is_empty() {
        return Err(AppError::NotFound("No sponsors found.".to_string()));
    }
    Ok(Json(sponsors))
}

/// Every sponsor inquiry.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn sponsor_inquiries(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.records().list(Table::SponsorInquiry, &[]).await?))
}

/// Volunteer inquiries, optionally filtered.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn volunteer_inquiries(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<VolunteerQuery>,
) -> Result<Json<Vec<Value>>, AppError> {
    let filters = query.filters();
    Ok(Json(
        state
            .records()
            .list(Table::VolunteerInquiry, &filters)
            .await?,
    ))
}

/// Accepted volunteers. Same as `?status=accepted`.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn accepted_volunteers(
    staff: RequireStaff,
    state: State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    volunteer_inquiries(staff, state, Query(VolunteerQuery::with_status("accepted"))).await
}

/// Volunteers awaiting a decision. Same as `?status=waiting`.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn waiting_volunteers(
    staff: RequireStaff,
    state: State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    volunteer_inquiries(staff, state, Query(VolunteerQuery::with_status("waiting"))).await
}

/// Rejected volunteers. Same as `?status=rejected`.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn rejected_volunteers(
    staff: RequireStaff,
    state: State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    volunteer_inquiries(staff, state, Query(VolunteerQuery::with_status("rejected"))).await
}

/// One volunteer inquiry.
///
/// # Errors
///
/// Returns 404 if the inquiry does not exist.
pub async fn volunteer_inquiry(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<VolunteerId>,
) -> Result<Json<Value>, AppError> {
    state
        .records()
        .read(Table::VolunteerInquiry, &id.as_key())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Volunteer inquiry {id} not found")))
}

/// Patch a volunteer inquiry, typically its `status`.
///
/// Only the fields present in the body change.
///
/// # Errors
///
/// Returns 404 if the inquiry does not exist and 400 for an empty patch.
#[tracing::instrument(skip(state, staff, patch), fields(staff_id = %staff.id))]
pub async fn update_volunteer_inquiry(
    RequireStaff(staff): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<VolunteerId>,
    Json(mut patch): Json<Map<String, Value>>,
) -> Result<Json<Value>, AppError> {
    // The key is the record's identity
    patch.remove("id");
    if patch.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let updated = state
        .records()
        .update(Table::VolunteerInquiry, &id.as_key(), Value::Object(patch))
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(format!("Volunteer inquiry {id} not found"))
            }
            other => other.into(),
        })?;
    tracing::info!("Volunteer inquiry updated");
    Ok(Json(updated))
}

/// Volunteer inquiries sent from one email address.
///
/// # Errors
///
/// Returns 404 if none match.
pub async fn volunteer_by_email(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    // Stored as typed on the public form, so no normalization here
    let filters = [Filter::eq("email", email.trim())];
    let inquiries = state
        .records()
        .list(Table::VolunteerInquiry, &filters)
        .await?;
    if inquiries.is_empty() {
        return Err(AppError::NotFound(
            "No volunteer inquiry found.".to_string(),
        ));
    }
    Ok(Json(inquiries))
}

/// Everyone on the waitlist.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn waitlist(
    RequireStaff(_): RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.records().list(Table::Waitlist, &[]).await?))
}
