//! Ticket issuance pipeline.
//!
//! Once a registration is stored, [`TicketIssuer`] derives its reference,
//! renders the ticket ([`compose`]), uploads it ([`store`]) and mails the
//! link ([`notify`]), in that order and within the calling request.
//!
//! # Failure contract
//!
//! A failed attempt reports the [`Stage`] it stopped at. The registration
//! stays stored either way; callers decide how to report the failure.

pub mod compose;
pub mod issuance;
pub mod layout;
pub mod notify;
pub mod store;

pub use compose::{ArtifactComposer, CompositionError, render_qr};
pub use issuance::{
    IssuanceError, IssuanceFailure, IssuedTicket, Stage, TicketIssuance, TicketIssuer,
};
pub use notify::{DeliveryError, NotificationDispatcher, SmtpDispatcher, TicketMessageBuilder};
pub use store::{ArtifactStore, CloudinaryStore, StorageError, encode_png};

use pycontg_core::Email;

use crate::config::BackofficeConfig;
use crate::models::Registration;

/// Issuer used in production.
pub type CloudinaryIssuer = TicketIssuer<CloudinaryStore, SmtpDispatcher>;

/// Everything the pipeline reads from a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRequest {
    /// Registration id, encoded verbatim in the QR code.
    pub participant_id: String,
    pub name: String,
    pub email: Email,
    /// May be empty.
    pub organization: String,
    pub country_city: String,
}

impl TicketRequest {
    /// Pipeline input for a stored registration.
    #[must_use]
    pub fn from_registration(registration: &Registration, default_country_city: &str) -> Self {
        Self {
            participant_id: registration.id.as_key(),
            name: registration.full_name.clone(),
            email: registration.email.clone(),
            organization: registration.organization().unwrap_or_default().to_string(),
            country_city: registration.country_city(default_country_city).to_string(),
        }
    }
}

/// Build the production issuer from configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client or the SMTP transport cannot be set up.
pub fn build_issuer(config: &BackofficeConfig) -> Result<CloudinaryIssuer, IssuanceError> {
    let composer = ArtifactComposer::new(&config.ticket);
    let store = CloudinaryStore::new(&config.storage)?;
    let dispatcher = SmtpDispatcher::new(&config.email, &config.ticket)?;
    Ok(TicketIssuer::new(
        composer,
        store,
        dispatcher,
        config.ticket.event_year,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::NewRegistration;

    #[test]
    fn test_request_from_registration() {
        let registration = serde_json::from_value::<NewRegistration>(json!({
            "id": "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c",
            "fullName": "tester 1",
            "email": "tester@pytogo.org",
            "organization": "",
            "country": " ",
        }))
        .unwrap()
        .into_registration();

        let request = TicketRequest::from_registration(&registration, "Togo/Lomé");
        assert_eq!(request.participant_id, "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c");
        assert_eq!(request.organization, "");
        assert_eq!(request.country_city, "Togo/Lomé");
    }
}
