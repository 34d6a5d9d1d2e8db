//! Ticket issuance orchestration.
//!
//! One attempt walks `Start → Composing → Storing → Notifying → Done`. Any
//! failing stage moves straight to `Failed` and the remaining stages never
//! run. The registration record is never touched here.

use futures::FutureExt;
use futures::future::BoxFuture;
use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use pycontg_core::{InvalidReferenceInput, TicketReference};

use super::TicketRequest;
use super::compose::{ArtifactComposer, CompositionError};
use super::notify::{DeliveryError, NotificationDispatcher};
use super::store::{ArtifactStore, StorageError};

/// Pipeline stage at which an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Composing,
    Storing,
    Notifying,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composing => write!(f, "composing"),
            Self::Storing => write!(f, "storing"),
            Self::Notifying => write!(f, "notifying"),
        }
    }
}

/// Cause of a failed attempt.
#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error(transparent)]
    Reference(#[from] InvalidReferenceInput),

    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Terminal failure of an attempt: where it stopped and why.
#[derive(Debug, Error)]
#[error("ticket issuance failed while {stage}: {cause}")]
pub struct IssuanceFailure {
    pub stage: Stage,
    #[source]
    pub cause: IssuanceError,
}

impl IssuanceFailure {
    fn at(stage: Stage, cause: impl Into<IssuanceError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// A ticket that was rendered, stored and mailed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    pub reference: TicketReference,
    pub url: Url,
}

/// State of one issuance attempt.
#[derive(Debug)]
enum IssuanceState {
    Start,
    Composing,
    Storing {
        reference: TicketReference,
        artifact: RgbaImage,
    },
    Notifying {
        reference: TicketReference,
        url: Url,
    },
    Done(IssuedTicket),
    Failed(IssuanceFailure),
}

impl IssuanceState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Composing => "composing",
            Self::Storing { .. } => "storing",
            Self::Notifying { .. } => "notifying",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }
}

/// Issues tickets for registrations that are already stored.
///
/// Object-safe so that handlers can hold any issuer behind an `Arc`.
pub trait TicketIssuance: Send + Sync {
    /// Run one attempt for `request`.
    fn issue<'a>(
        &'a self,
        request: &'a TicketRequest,
    ) -> BoxFuture<'a, Result<IssuedTicket, IssuanceFailure>>;
}

/// The ticket pipeline over a store and a dispatcher.
#[derive(Debug, Clone)]
pub struct TicketIssuer<S, D> {
    composer: ArtifactComposer,
    store: S,
    dispatcher: D,
    event_year: u16,
}

impl<S, D> TicketIssuer<S, D>
where
    S: ArtifactStore,
    D: NotificationDispatcher,
{
    /// Create an issuer. `event_year` is used in ticket references.
    #[must_use]
    pub const fn new(composer: ArtifactComposer, store: S, dispatcher: D, event_year: u16) -> Self {
        Self {
            composer,
            store,
            dispatcher,
            event_year,
        }
    }

    /// Drive one attempt from `Start` to `Done` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns the stage that failed and its cause.
    #[instrument(skip_all, fields(registration_id = %request.participant_id))]
    pub async fn drive(&self, request: &TicketRequest) -> Result<IssuedTicket, IssuanceFailure> {
        let mut state = IssuanceState::Start;
        loop {
            tracing::debug!(state = state.name(), "Issuance step");
            state = match state {
                IssuanceState::Start => IssuanceState::Composing,
                IssuanceState::Composing => match self.compose(request).await {
                    Ok((reference, artifact)) => IssuanceState::Storing {
                        reference,
                        artifact,
                    },
                    Err(cause) => {
                        IssuanceState::Failed(IssuanceFailure::at(Stage::Composing, cause))
                    }
                },
                IssuanceState::Storing {
                    reference,
                    artifact,
                } => match self.store.store(&artifact, &reference).await {
                    Ok(url) => IssuanceState::Notifying { reference, url },
                    Err(cause) => IssuanceState::Failed(IssuanceFailure::at(Stage::Storing, cause)),
                },
                IssuanceState::Notifying { reference, url } => match self
                    .dispatcher
                    .dispatch(&request.name, &request.email, &url)
                    .await
                {
                    Ok(()) => IssuanceState::Done(IssuedTicket { reference, url }),
                    Err(cause) => {
                        IssuanceState::Failed(IssuanceFailure::at(Stage::Notifying, cause))
                    }
                },
                IssuanceState::Done(ticket) => {
                    tracing::info!(reference = %ticket.reference, url = %ticket.url, "Ticket issued");
                    return Ok(ticket);
                }
                IssuanceState::Failed(failure) => {
                    tracing::error!(
                        stage = %failure.stage,
                        error = %failure.cause,
                        "Ticket issuance failed"
                    );
                    return Err(failure);
                }
            };
        }
    }

    /// Derive the reference and render the ticket.
    async fn compose(
        &self,
        request: &TicketRequest,
    ) -> Result<(TicketReference, RgbaImage), IssuanceError> {
        let reference = TicketReference::derive(&request.participant_id, self.event_year)?;
        let artifact = self.composer.compose_blocking(request, &reference).await?;
        Ok((reference, artifact))
    }
}

impl<S, D> TicketIssuance for TicketIssuer<S, D>
where
    S: ArtifactStore,
    D: NotificationDispatcher,
{
    fn issue<'a>(
        &'a self,
        request: &'a TicketRequest,
    ) -> BoxFuture<'a, Result<IssuedTicket, IssuanceFailure>> {
        self.drive(request).boxed()
    }
}
