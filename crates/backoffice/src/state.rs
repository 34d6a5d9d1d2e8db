//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::BackofficeConfig;
use crate::db::RecordStore;
use crate::services::{JwtService, TicketIssuance};

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BackofficeConfig,
    records: Arc<dyn RecordStore>,
    issuer: Arc<dyn TicketIssuance>,
    jwt: JwtService,
}

impl AppState {
    /// Build the state from its collaborators.
    ///
    /// The record store and ticket issuer are trait objects so tests can
    /// swap in the in-memory store and issuer doubles.
    #[must_use]
    pub fn new(
        config: BackofficeConfig,
        records: Arc<dyn RecordStore>,
        issuer: Arc<dyn TicketIssuance>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                records,
                issuer,
                jwt,
            }),
        }
    }

    /// Get the back office configuration.
    #[must_use]
    pub fn config(&self) -> &BackofficeConfig {
        &self.inner.config
    }

    /// Get the record store.
    #[must_use]
    pub fn records(&self) -> &dyn RecordStore {
        self.inner.records.as_ref()
    }

    /// Get the ticket issuer.
    #[must_use]
    pub fn issuer(&self) -> &dyn TicketIssuance {
        self.inner.issuer.as_ref()
    }

    /// Get the bearer token service.
    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.inner.jwt
    }
}
