//! Proposal review models.

use serde::{Deserialize, Serialize};

use pycontg_core::{ProposalId, ReviewId, StaffId};

/// Lowest and highest accepted rating.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Review submitted by a reviewer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rate: u8,
    #[serde(default)]
    pub comment: String,
}

/// A stored proposal review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalReview {
    pub id: ReviewId,
    pub reviewer_id: StaffId,
    pub reviewer: String,
    pub proposal_id: ProposalId,
    pub rate: u8,
    pub comment: String,
}
