//! Proposal review repository.

use pycontg_core::{ProposalId, ReviewId};

use super::{Filter, RecordStore, RepositoryError, Table};
use crate::models::ProposalReview;

/// Typed access to the `proposal_reviews` table.
pub struct ReviewRepository<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Whether a proposal with this id exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn proposal_exists(&self, proposal: ProposalId) -> Result<bool, RepositoryError> {
        Ok(self
            .store
            .read(Table::Proposals, &proposal.as_key())
            .await?
            .is_some())
    }

    /// Reviews of one proposal, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored document is invalid.
    pub async fn list_for(
        &self,
        proposal: ProposalId,
    ) -> Result<Vec<ProposalReview>, RepositoryError> {
        let filters = [Filter::eq("proposal_id", proposal.as_i64())];
        self.store
            .list(Table::ProposalReviews, &filters)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }

    /// Next free review id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn next_id(&self) -> Result<ReviewId, RepositoryError> {
        let max = self
            .store
            .list(Table::ProposalReviews, &[])
            .await?
            .iter()
            .filter_map(|doc| doc.get("id").and_then(serde_json::Value::as_i64))
            .max()
            .unwrap_or(0);
        Ok(ReviewId::new(max + 1))
    }

    /// Store a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the review id is taken.
    pub async fn create(&self, review: &ProposalReview) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(review)?;
        self.store
            .create(Table::ProposalReviews, &review.id.as_key(), document)
            .await
    }
}
