//! Bearer token extractors.
//!
//! Provides extractors for requiring staff authentication in route handlers.
//! Each extractor reads `Authorization: Bearer <token>`, verifies the token
//! and checks the role it carries. Admins pass every role check.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use pycontg_core::StaffRole;

use crate::error::set_sentry_user;
use crate::models::CurrentStaff;
use crate::state::AppState;

/// Error returned when a request lacks a usable token or the right role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No bearer token in the request.
    MissingToken,
    /// The token is malformed, forged or expired.
    InvalidToken,
    /// The token is valid but its role is not accepted here.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken => unauthorized("Not authenticated"),
            Self::InvalidToken => unauthorized("Could not validate credentials"),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "detail": "Not enough permissions" })),
            )
                .into_response(),
        }
    }
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({ "detail": detail })),
    )
        .into_response()
}

/// Resolve the staff member behind the request's bearer token.
fn authenticate(parts: &Parts, state: &AppState) -> Result<CurrentStaff, AuthRejection> {
    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthRejection::MissingToken)?;

    let staff = state.jwt().verify_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthRejection::InvalidToken
    })?;

    set_sentry_user(&staff);
    Ok(staff)
}

fn require_role(
    parts: &Parts,
    state: &AppState,
    allowed: &[StaffRole],
) -> Result<CurrentStaff, AuthRejection> {
    let staff = authenticate(parts, state)?;
    if !staff.role.is_any_of(allowed) {
        tracing::warn!(
            staff_id = %staff.id,
            role = %staff.role,
            path = %parts.uri.path(),
            "Staff member lacks the required role"
        );
        return Err(AuthRejection::Forbidden);
    }
    Ok(staff)
}

/// Extractor accepting any authenticated staff member, whatever the role.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(Authenticated(staff): Authenticated) -> Json<CurrentStaff> {
///     Json(staff)
/// }
/// ```
pub struct Authenticated(pub CurrentStaff);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

/// Extractor for registration desk endpoints (staff or admin).
pub struct RequireStaff(pub CurrentStaff);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[StaffRole::Staff]).map(Self)
    }
}

/// Extractor for proposal review endpoints (reviewer or admin).
pub struct RequireReviewer(pub CurrentStaff);

impl FromRequestParts<AppState> for RequireReviewer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[StaffRole::Reviewer]).map(Self)
    }
}

/// Extractor for admin-only endpoints.
///
/// Returns 401 without a valid token and 403 for any other role.
pub struct RequireAdmin(pub CurrentStaff);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, &[StaffRole::Admin]).map(Self)
    }
}
