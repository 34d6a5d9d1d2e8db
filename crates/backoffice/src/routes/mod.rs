//! HTTP route handlers for the back office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Record store readiness
//!
//! # Auth
//! POST /api/auth/token                  - Email + password -> bearer token
//! GET  /api/auth/me                     - Current identity
//!
//! # Registrations
//! POST /api/registrations               - Register, then issue the ticket (public)
//! GET  /api/registrations               - List (staff)
//! GET  /api/registrations/{id}          - Detail (staff)
//! PUT  /api/registrations/{id}/checkin  - Check-in flag (staff)
//! PUT  /api/registrations/{id}/food     - Food distribution flag (staff)
//! POST /api/registrations/{id}/ticket   - Re-issue the ticket (admin)
//!
//! # Sponsors and volunteers
//! GET  /api/sponsor-tiers               - Tiers (public)
//! GET  /api/sponsors                    - Paid sponsors (public)
//! GET  /api/sponsorspaid                - Same as /api/sponsors
//! GET  /api/sponsorinquiries            - All sponsor inquiries (staff)
//! GET  /api/volunteerinquiries          - Filtered volunteer inquiries (staff)
//! GET  /api/volunteerinquiries/{id}     - Detail (staff)
//! PUT  /api/volunteerinquiries/{id}     - Patch (staff)
//! GET  /api/volunteeraccepted           - Same as ?status=accepted (staff)
//! GET  /api/volunteerwaiting            - Same as ?status=waiting (staff)
//! GET  /api/volunteerrejected           - Same as ?status=rejected (staff)
//! GET  /api/volunteer/{email}           - Lookup by email (staff)
//! GET  /api/waitlist                    - Waitlist (staff)
//!
//! # Proposals
//! GET  /api/proposals                   - Accepted proposals (public)
//! GET  /api/proposalsinquiries          - All proposals (reviewer)
//! GET  /api/proposals/{id}/reviews      - Reviews of a proposal (reviewer)
//! POST /api/proposals/{id}/reviews      - Add a review (reviewer)
//!
//! # Administration
//! GET  /api/staff                       - List staff accounts (admin)
//! POST /api/staff                       - Create a staff account (admin)
//! PUT  /api/staff/{id}                  - Update a staff account (admin)
//! DELETE /api/staff/{id}                - Delete a staff account (admin)
//! DELETE /api/records/{table}/{id}      - Delete any record (admin)
//! ```

pub mod auth;
pub mod health;
pub mod inquiries;
pub mod proposals;
pub mod records;
pub mod registrations;
pub mod staff;

use axum::Router;
use axum::http::{HeaderValue, Request, Response};
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the complete API router, without state or layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(registrations::router())
        .merge(inquiries::router())
        .merge(proposals::router())
        .merge(staff::router())
        .merge(records::router())
}

/// Build the application: routes, state, tracing, CORS and Sentry layers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().cors_origins);

    routes()
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the public event site.
///
/// An empty origin list allows any origin, without credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
