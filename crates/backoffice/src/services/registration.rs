//! Registration intake and ticket (re-)issuance.
//!
//! A registration is committed to the record store first, read back to
//! confirm it exists, and only then handed to the ticket pipeline. A ticket
//! failure is reported as such; it never removes or alters the stored record.

use thiserror::Error;
use tracing::instrument;

use pycontg_core::RegistrationId;

use crate::db::{RecordStore, RegistrationRepository, RepositoryError};
use crate::models::{NewRegistration, Registration};
use crate::services::ticket::{IssuanceFailure, IssuedTicket, TicketIssuance, TicketRequest};

/// Errors that can occur while registering or issuing a ticket.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The registration was not stored.
    #[error("registration could not be stored: {0}")]
    Store(#[source] RepositoryError),

    /// The registration was written but could not be read back.
    #[error("registration {0} was not found after creation")]
    Unconfirmed(RegistrationId),

    /// No registration has this id.
    #[error("registration {0} not found")]
    NotFound(RegistrationId),

    /// The registration is stored; its ticket was not delivered.
    #[error("registration {registration_id} saved, but {failure}")]
    Ticket {
        registration_id: RegistrationId,
        #[source]
        failure: IssuanceFailure,
    },
}

impl RegistrationError {
    /// Whether the registration record exists despite the error.
    #[must_use]
    pub const fn registration_saved(&self) -> bool {
        matches!(self, Self::Ticket { .. })
    }
}

/// Registration workflows over a record store and a ticket issuer.
pub struct RegistrationService<'a> {
    registrations: RegistrationRepository<'a>,
    issuer: &'a dyn TicketIssuance,
    default_country_city: &'a str,
}

impl<'a> RegistrationService<'a> {
    /// Create a new registration service.
    #[must_use]
    pub const fn new(
        records: &'a dyn RecordStore,
        issuer: &'a dyn TicketIssuance,
        default_country_city: &'a str,
    ) -> Self {
        Self {
            registrations: RegistrationRepository::new(records),
            issuer,
            default_country_city,
        }
    }

    /// Store a registration, then issue and mail its ticket.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::Store` if nothing was stored and
    /// `RegistrationError::Ticket` if the record is stored but the ticket failed.
    #[instrument(skip_all, fields(registration_id))]
    pub async fn register(
        &self,
        new: NewRegistration,
    ) -> Result<(Registration, IssuedTicket), RegistrationError> {
        let registration = new.into_registration();
        tracing::Span::current().record("registration_id", tracing::field::display(registration.id));

        self.registrations
            .create(&registration)
            .await
            .map_err(RegistrationError::Store)?;
        tracing::info!("Registration stored");

        let stored = self
            .registrations
            .get(registration.id)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Registration read-back failed"))
            .ok()
            .flatten()
            .ok_or(RegistrationError::Unconfirmed(registration.id))?;

        let ticket = self.issue(&stored).await?;
        Ok((stored, ticket))
    }

    /// Issue the ticket of an existing registration again.
    ///
    /// The reference and QR payload are the same as the first time, and the
    /// stored image is overwritten.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::NotFound` if the registration does not exist.
    #[instrument(skip(self))]
    pub async fn reissue(&self, id: RegistrationId) -> Result<IssuedTicket, RegistrationError> {
        let registration = self
            .registrations
            .get(id)
            .await
            .map_err(RegistrationError::Store)?
            .ok_or(RegistrationError::NotFound(id))?;
        self.issue(&registration).await
    }

    async fn issue(&self, registration: &Registration) -> Result<IssuedTicket, RegistrationError> {
        let request = TicketRequest::from_registration(registration, self.default_country_city);
        self.issuer
            .issue(&request)
            .await
            .map_err(|failure| RegistrationError::Ticket {
                registration_id: registration.id,
                failure,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::db::{Filter, MemoryRecordStore, Table};
    use crate::services::ticket::{DeliveryError, Stage};

    /// Issuer double recording requests and failing on demand.
    #[derive(Default)]
    struct FakeIssuer {
        requests: Mutex<Vec<TicketRequest>>,
        fail: bool,
    }

    impl TicketIssuance for FakeIssuer {
        fn issue<'a>(
            &'a self,
            request: &'a TicketRequest,
        ) -> BoxFuture<'a, Result<IssuedTicket, IssuanceFailure>> {
            async move {
                self.requests.lock().unwrap().push(request.clone());
                if self.fail {
                    return Err(IssuanceFailure {
                        stage: Stage::Notifying,
                        cause: DeliveryError::Authentication("535".to_string()).into(),
                    });
                }
                let reference = pycontg_core::reference(&request.participant_id).unwrap();
                let url = Url::parse(&format!("https://cdn.test/{reference}.png")).unwrap();
                Ok(IssuedTicket { reference, url })
            }
            .boxed()
        }
    }

    /// Store whose reads fail once something has been written.
    #[derive(Default)]
    struct LossyStore {
        inner: MemoryRecordStore,
        written: AtomicBool,
    }

    impl RecordStore for LossyStore {
        fn create<'a>(
            &'a self,
            table: Table,
            key: &'a str,
            document: serde_json::Value,
        ) -> BoxFuture<'a, Result<(), RepositoryError>> {
            async move {
                self.inner.create(table, key, document).await?;
                self.written.store(true, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        }

        fn read<'a>(
            &'a self,
            table: Table,
            key: &'a str,
        ) -> BoxFuture<'a, Result<Option<serde_json::Value>, RepositoryError>> {
            if self.written.load(Ordering::SeqCst) {
                let err = RepositoryError::DataCorruption("connection reset".to_string());
                return async move { Err(err) }.boxed();
            }
            self.inner.read(table, key)
        }

        fn update<'a>(
            &'a self,
            table: Table,
            key: &'a str,
            patch: serde_json::Value,
        ) -> BoxFuture<'a, Result<serde_json::Value, RepositoryError>> {
            self.inner.update(table, key, patch)
        }

        fn delete<'a>(
            &'a self,
            table: Table,
            key: &'a str,
        ) -> BoxFuture<'a, Result<(), RepositoryError>> {
            self.inner.delete(table, key)
        }

        fn list<'a>(
            &'a self,
            table: Table,
            filters: &'a [Filter],
        ) -> BoxFuture<'a, Result<Vec<serde_json::Value>, RepositoryError>> {
            self.inner.list(table, filters)
        }

        fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>> {
            self.inner.ping()
        }
    }

    fn submission() -> NewRegistration {
        serde_json::from_value(json!({
            "id": "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c",
            "fullName": "tester 1",
            "email": "tester@pytogo.org",
            "organization": "",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_issues_ticket() {
        let store = MemoryRecordStore::new();
        let issuer = FakeIssuer::default();
        let service = RegistrationService::new(&store, &issuer, "Togo/Lomé");

        let (registration, ticket) = service.register(submission()).await.unwrap();

        assert_eq!(ticket.reference.as_str(), "PYCONTG-2025-5C663C");
        let requests = issuer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].participant_id, registration.id.as_key());
        assert_eq!(requests[0].country_city, "Togo");
    }

    #[tokio::test]
    async fn test_ticket_failure_keeps_registration() {
        let store = MemoryRecordStore::new();
        let issuer = FakeIssuer {
            fail: true,
            ..FakeIssuer::default()
        };
        let service = RegistrationService::new(&store, &issuer, "Togo/Lomé");

        let err = service.register(submission()).await.unwrap_err();
        assert!(err.registration_saved());
        match err {
            RegistrationError::Ticket {
                registration_id,
                failure,
            } => {
                assert_eq!(registration_id.as_key(), "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c");
                assert_eq!(failure.stage, Stage::Notifying);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.count(Table::Registrations).await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration_skips_issuance() {
        let store = MemoryRecordStore::new();
        let issuer = FakeIssuer::default();
        let service = RegistrationService::new(&store, &issuer, "Togo/Lomé");
        service.register(submission()).await.unwrap();

        let err = service.register(submission()).await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Store(RepositoryError::Conflict(_))
        ));
        assert!(!err.registration_saved());
        assert_eq!(issuer.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_read_back_is_unconfirmed() {
        let store = LossyStore::default();
        let issuer = FakeIssuer::default();
        let service = RegistrationService::new(&store, &issuer, "Togo/Lomé");

        let err = service.register(submission()).await.unwrap_err();
        match err {
            RegistrationError::Unconfirmed(id) => {
                assert_eq!(id.as_key(), "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.inner.count(Table::Registrations).await, 1);
        assert!(issuer.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reissue_uses_same_reference() {
        let store = MemoryRecordStore::new();
        let issuer = FakeIssuer::default();
        let service = RegistrationService::new(&store, &issuer, "Togo/Lomé");
        let (registration, first) = service.register(submission()).await.unwrap();

        let second = service.reissue(registration.id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reissue_unknown_registration() {
        let store = MemoryRecordStore::new();
        let issuer = FakeIssuer::default();
        let service = RegistrationService::new(&store, &issuer, "Togo/Lomé");

        let err = service.reissue(RegistrationId::generate()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::NotFound(_)));
        assert!(issuer.requests.lock().unwrap().is_empty());
    }
}
