//! Staff authentication handlers.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::Authenticated;
use crate::models::{CurrentStaff, StaffLogin, TokenResponse};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/token", post(login))
        .route("/api/auth/me", get(me))
}

/// Exchange email and password for a bearer token.
///
/// # Errors
///
/// Returns 401 if the credentials are wrong.
#[tracing::instrument(skip_all, fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<StaffLogin>,
) -> Result<Json<TokenResponse>, AppError> {
    let member = AuthService::new(state.records())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|_| tracing::warn!("Failed staff login"))?;

    let access_token = state.jwt().create_token(&member)?;
    tracing::info!(staff_id = %member.id, "Staff logged in");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.jwt().expires_in(),
    }))
}

/// Identity carried by the caller's token.
pub async fn me(Authenticated(staff): Authenticated) -> Json<CurrentStaff> {
    Json(staff)
}
