//! Talk proposal handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde_json::Value;

use pycontg_core::ProposalId;

use crate::db::{Filter, ReviewRepository, Table};
use crate::error::AppError;
use crate::middleware::RequireReviewer;
use crate::models::{NewReview, ProposalReview, RATING_RANGE};
use crate::state::AppState;

/// Build the proposals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/proposals", get(accepted_proposals))
        .route("/api/proposalsinquiries", get(all_proposals))
        .route(
            "/api/proposals/{id}/reviews",
            get(list_reviews).post(add_review),
        )
}

/// Accepted proposals, shown on the public schedule.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn accepted_proposals(
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    let filters = [Filter::eq("accepted", true)];
    Ok(Json(state.records().list(Table::Proposals, &filters).await?))
}

/// Every submitted proposal.
///
/// # Errors
///
/// Returns 500 if the record store fails.
pub async fn all_proposals(
    RequireReviewer(_): RequireReviewer,
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(state.records().list(Table::Proposals, &[]).await?))
}

/// Reviews of one proposal.
///
/// # Errors
///
/// Returns 404 if the proposal does not exist.
pub async fn list_reviews(
    RequireReviewer(_): RequireReviewer,
    State(state): State<AppState>,
    Path(id): Path<ProposalId>,
) -> Result<Json<Vec<ProposalReview>>, AppError> {
    let reviews = ReviewRepository::new(state.records());
    if !reviews.proposal_exists(id).await? {
        return Err(AppError::NotFound(format!("Proposal {id} not found")));
    }
    Ok(Json(reviews.list_for(id).await?))
}

/// Rate a proposal.
///
/// # Errors
///
/// Returns 400 for a rate outside 1 to 5 and 404 if the proposal does not exist.
#[tracing::instrument(skip(state, reviewer, body), fields(staff_id = %reviewer.id))]
pub async fn add_review(
    RequireReviewer(reviewer): RequireReviewer,
    State(state): State<AppState>,
    Path(id): Path<ProposalId>,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<ProposalReview>), AppError> {
    if !RATING_RANGE.contains(&body.rate) {
        return Err(AppError::BadRequest(format!(
            "rate must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )));
    }

    let reviews = ReviewRepository::new(state.records());
    if !reviews.proposal_exists(id).await? {
        return Err(AppError::NotFound(format!("Proposal {id} not found")));
    }

    let review = ProposalReview {
        id: reviews.next_id().await?,
        reviewer_id: reviewer.id,
        reviewer: reviewer.full_name,
        proposal_id: id,
        rate: body.rate,
        comment: body.comment.trim().to_string(),
    };
    reviews.create(&review).await?;

    tracing::info!(review_id = %review.id, rate = review.rate, "Proposal reviewed");
    Ok((StatusCode::CREATED, Json(review)))
}
