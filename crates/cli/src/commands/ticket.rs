//! Ticket commands.
//!
//! # Usage
//!
//! ```bash
//! # Print the reference of a registration id
//! pycontg ticket reference 5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c
//!
//! # Render a ticket locally, without uploading or mailing it
//! pycontg ticket render --id 5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c \
//!     --name "tester 1" --output ticket.png
//!
//! # Issue the ticket of a stored registration again (upload + email)
//! pycontg ticket issue 5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c
//! ```
//!
//! # Environment Variables
//!
//! `render` reads `TICKET_ASSETS_DIR`, `EVENT_NAME`, `EVENT_YEAR` and
//! `DEFAULT_COUNTRY_CITY`. `issue` needs the full back office configuration.

use std::path::{Path, PathBuf};

use thiserror::Error;

use pycontg_backoffice::config::{BackofficeConfig, ConfigError, TicketConfig};
use pycontg_backoffice::db::{PgRecordStore, create_pool};
use pycontg_backoffice::services::ticket::{
    ArtifactComposer, CompositionError, IssuanceError, StorageError, encode_png,
};
use pycontg_backoffice::services::{
    IssuedTicket, RegistrationError, RegistrationService, build_issuer,
};
use pycontg_core::{InvalidReferenceInput, RegistrationId, TicketReference};

/// Errors that can occur in ticket commands.
#[derive(Debug, Error)]
pub enum TicketError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The participant id cannot produce a reference.
    #[error(transparent)]
    Reference(#[from] InvalidReferenceInput),

    /// Rendering failed.
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// PNG encoding failed.
    #[error(transparent)]
    Encode(#[from] StorageError),

    /// The output file could not be written.
    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pipeline could not be set up.
    #[error(transparent)]
    Setup(#[from] IssuanceError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Re-issuing failed.
    #[error(transparent)]
    Issue(#[from] RegistrationError),
}

/// What to print on a rendered ticket.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub participant_id: String,
    pub name: String,
    pub organization: String,
    /// Falls back to the configured default when absent.
    pub country_city: Option<String>,
}

/// Reference of a participant id for an edition year.
///
/// # Errors
///
/// Returns `TicketError::Reference` for an empty id.
pub fn reference(participant_id: &str, year: Option<u16>) -> Result<TicketReference, TicketError> {
    let year = year.unwrap_or(pycontg_core::EVENT_YEAR);
    Ok(TicketReference::derive(participant_id, year)?)
}

/// Render a ticket to a PNG file and return its reference.
///
/// # Errors
///
/// Returns an error if an asset is missing or the file cannot be written.
pub fn render(
    config: &TicketConfig,
    request: &RenderRequest,
    output: &Path,
) -> Result<TicketReference, TicketError> {
    let reference = TicketReference::derive(&request.participant_id, config.event_year)?;
    let country_city = request
        .country_city
        .as_deref()
        .unwrap_or(&config.default_country_city);

    let image = ArtifactComposer::new(config).compose(
        &request.participant_id,
        &request.name,
        &reference,
        &request.organization,
        country_city,
    )?;
    let bytes = encode_png(&image)?;

    std::fs::write(output, bytes).map_err(|source| TicketError::Write {
        path: output.to_path_buf(),
        source,
    })?;

    tracing::info!(reference = %reference, output = %output.display(), "Ticket rendered");
    Ok(reference)
}

/// Issue the ticket of a stored registration again through the real pipeline.
///
/// # Errors
///
/// Returns an error if the registration does not exist or a stage fails.
pub async fn issue(registration_id: RegistrationId) -> Result<IssuedTicket, TicketError> {
    let config = BackofficeConfig::from_env()?;

    tracing::info!("Connecting to back office database...");
    let store = PgRecordStore::new(create_pool(&config.database_url).await?);
    let issuer = build_issuer(&config)?;

    let service =
        RegistrationService::new(&store, &issuer, &config.ticket.default_country_city);
    let ticket = service.reissue(registration_id).await?;

    tracing::info!(reference = %ticket.reference, url = %ticket.url, "Ticket issued");
    Ok(ticket)
}
