//! Integration tests for the PyCon Togo back office.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pycontg-integration-tests
//! ```
//!
//! Everything runs in process: the record store is [`MemoryRecordStore`],
//! the image host and mail relay are the recording doubles below, and HTTP
//! tests drive the router with `tower::ServiceExt::oneshot`. Ticket
//! rendering uses the real font and logos from `crates/backoffice/static`.
//!
//! # Test Categories
//!
//! - `ticket_issuance` - End-to-end pipeline scenarios
//! - `registration_api` - HTTP status codes and bodies, including the
//!   partial-failure policy

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use secrecy::SecretString;
use url::Url;

use pycontg_backoffice::config::{
    BackofficeConfig, EmailConfig, JwtConfig, SmtpTls, StorageConfig, TicketConfig,
};
use pycontg_backoffice::db::{MemoryRecordStore, RecordStore};
use pycontg_backoffice::models::{NewStaff, StaffMember};
use pycontg_backoffice::services::ticket::{
    ArtifactComposer, ArtifactStore, DeliveryError, NotificationDispatcher, StorageError,
    TicketIssuer,
};
use pycontg_backoffice::services::{AuthService, TicketIssuance};
use pycontg_backoffice::state::AppState;
use pycontg_core::{Email, StaffRole, TicketReference};

/// Participant id used across scenarios.
pub const PARTICIPANT_ID: &str = "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c";

/// Issuer wired to the recording doubles.
pub type TestIssuer = TicketIssuer<Arc<RecordingStore>, Arc<RecordingDispatcher>>;

/// The font and logos shipped with the back office.
#[must_use]
pub fn static_assets() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../backoffice/static")
}

/// Copy the shipped assets into a throwaway directory that tests may alter.
///
/// # Panics
///
/// Panics if the copy fails.
#[must_use]
pub fn copy_assets() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    copy_dir(&static_assets(), dir.path());
    dir
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).expect("Failed to create asset dir");
    for entry in std::fs::read_dir(from).expect("Failed to read asset dir") {
        let entry = entry.expect("Failed to read asset entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).expect("Failed to copy asset");
        }
    }
}

/// Ticket layout inputs over `assets_dir`.
#[must_use]
pub fn ticket_config(assets_dir: &Path) -> TicketConfig {
    TicketConfig {
        assets_dir: assets_dir.to_path_buf(),
        ..TicketConfig::default()
    }
}

/// A complete configuration that never reaches a real service.
#[must_use]
pub fn test_config(assets_dir: &Path) -> BackofficeConfig {
    BackofficeConfig {
        database_url: SecretString::from("postgres://localhost/pycontg_test"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        cors_origins: vec!["https://pycontg.pytogo.org".to_string()],
        jwt: JwtConfig {
            secret: SecretString::from("kq8Zt2!vR7#mW4@xL9$pN3^bY6&cF1*h"),
            expire_minutes: 60,
        },
        email: EmailConfig {
            smtp_host: "smtp.invalid".to_string(),
            smtp_port: 465,
            smtp_username: "tickets@pytogo.org".to_string(),
            smtp_password: SecretString::from("unused"),
            tls: SmtpTls::Implicit,
            from_address: "tickets@pytogo.org".to_string(),
            from_name: "PyCon Togo Organizing Team".to_string(),
        },
        storage: StorageConfig {
            api_base: "https://api.cloudinary.invalid/v1_1".to_string(),
            cloud_name: "pycontg".to_string(),
            api_key: "000000".to_string(),
            api_secret: SecretString::from("unused"),
            folder: "pycon2025".to_string(),
        },
        ticket: ticket_config(assets_dir),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Image host double: records keys and images and answers a CDN URL.
#[derive(Debug, Default)]
pub struct RecordingStore {
    calls: AtomicUsize,
    keys: Mutex<Vec<String>>,
    images: Mutex<Vec<RgbaImage>>,
}

impl RecordingStore {
    /// Number of upload attempts.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Keys uploaded so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().expect("keys lock").clone()
    }

    /// Images uploaded so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn images(&self) -> Vec<RgbaImage> {
        self.images.lock().expect("images lock").clone()
    }
}

impl ArtifactStore for RecordingStore {
    async fn store(&self, image: &RgbaImage, key: &TicketReference) -> Result<Url, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.width() == 0 {
            return Err(StorageError::Encode("empty image".to_string()));
        }
        self.keys
            .lock()
            .expect("keys lock")
            .push(key.as_str().to_string());
        self.images
            .lock()
            .expect("images lock")
            .push(image.clone());
        Url::parse(&format!("https://res.cloudinary.test/pycon2025/tickets/{key}.png"))
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }
}

/// Mail relay double: records recipients, or refuses the credentials.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    reject_credentials: bool,
    calls: AtomicUsize,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    /// A relay that answers `535` to every login.
    #[must_use]
    pub fn rejecting_credentials() -> Self {
        Self {
            reject_credentials: true,
            ..Self::default()
        }
    }

    /// Number of delivery attempts.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(recipient, ticket URL)` pairs delivered so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        _recipient_name: &str,
        recipient_email: &Email,
        ticket_url: &Url,
    ) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_credentials {
            return Err(DeliveryError::Authentication(
                "535 5.7.8 Authentication credentials invalid".to_string(),
            ));
        }
        self.sent
            .lock()
            .expect("sent lock")
            .push((recipient_email.to_string(), ticket_url.to_string()));
        Ok(())
    }
}

/// Build the real pipeline over the recording doubles.
#[must_use]
pub fn issuer(
    assets_dir: &Path,
    store: &Arc<RecordingStore>,
    dispatcher: &Arc<RecordingDispatcher>,
) -> TestIssuer {
    let config = ticket_config(assets_dir);
    TicketIssuer::new(
        ArtifactComposer::new(&config),
        Arc::clone(store),
        Arc::clone(dispatcher),
        config.event_year,
    )
}

/// Application state over an in-memory store and `issuer`.
#[must_use]
pub fn app_state(
    assets_dir: &Path,
    records: Arc<MemoryRecordStore>,
    issuer: Arc<dyn TicketIssuance>,
) -> AppState {
    let records: Arc<dyn RecordStore> = records;
    AppState::new(test_config(assets_dir), records, issuer)
}

/// Create a staff account with `role` and return it.
///
/// # Panics
///
/// Panics if the account cannot be created.
pub async fn seed_staff(records: &dyn RecordStore, email: &str, role: StaffRole) -> StaffMember {
    AuthService::new(records)
        .create_staff(NewStaff {
            full_name: format!("{role} member"),
            email: Email::parse(email).expect("valid email"),
            password: "correct horse battery staple".to_string(),
            role,
        })
        .await
        .expect("Failed to seed staff")
}

/// `Authorization` header value for `member`.
///
/// # Panics
///
/// Panics if the token cannot be signed.
#[must_use]
pub fn bearer(state: &AppState, member: &StaffMember) -> String {
    let token = state
        .jwt()
        .create_token(member)
        .expect("Failed to sign token");
    format!("Bearer {token}")
}
