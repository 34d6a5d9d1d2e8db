//! Back office configuration loaded from environment variables.
//!
//! Configuration is read once at process start into [`BackofficeConfig`] and
//! passed by reference to every component that needs credentials. Nothing
//! below the binary's `main` reads the environment.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKOFFICE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//! - `SMTP_HOST` - Mail relay hostname
//! - `SMTP_PASSWORD` - Mail relay password
//! - `SMTP_FROM` - Operator mailbox used in the `From` header
//! - `CLOUDINARY_CLOUD_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_API_KEY` - Cloudinary API key
//! - `CLOUDINARY_API_SECRET` - Cloudinary API secret
//!
//! ## Optional
//! - `BACKOFFICE_HOST` - Bind address (default: 127.0.0.1)
//! - `BACKOFFICE_PORT` - Listen port (default: 8000)
//! - `JWT_EXPIRE_MINUTES` - Bearer token lifetime (default: 60)
//! - `SMTP_PORT` - Mail relay port (default: 465)
//! - `SMTP_USERNAME` - Mail relay login (default: `SMTP_FROM`)
//! - `SMTP_FROM_NAME` - Display name in the `From` header (default: PyCon Togo Organizing Team)
//! - `SMTP_TLS` - `implicit` (default) or `starttls`
//! - `CLOUDINARY_FOLDER` - Folder namespace for tickets (default: pycon2025)
//! - `CLOUDINARY_API_BASE` - Upload API base URL (default: <https://api.cloudinary.com/v1_1>)
//! - `TICKET_ASSETS_DIR` - Directory holding `fonts/` and `images/` (default: crates/backoffice/static)
//! - `EVENT_NAME` - Event name printed on tickets (default: PyCon Togo)
//! - `EVENT_YEAR` - Edition year used in references (default: 2025)
//! - `DEFAULT_COUNTRY_CITY` - Printed when a registrant gives no country (default: Togo/Lomé)
//! - `CORS_ORIGINS` - Comma separated list of allowed origins
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_FROM_NAME: &str = "PyCon Togo Organizing Team";
const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com/v1_1";
const DEFAULT_ORIGINS: &str = "https://pytogo.org,https://www.pytogo.org,https://pycontg.pytogo.org,http://localhost:5500,http://127.0.0.1:5500,http://localhost:8080";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Back office configuration.
#[derive(Debug, Clone)]
pub struct BackofficeConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,
    /// Bearer token settings
    pub jwt: JwtConfig,
    /// Mail relay used to deliver tickets
    pub email: EmailConfig,
    /// Remote host storing ticket images
    pub storage: StorageConfig,
    /// Ticket layout inputs
    pub ticket: TicketConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Bearer token configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// Token lifetime in minutes
    pub expire_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expire_minutes", &self.expire_minutes)
            .finish()
    }
}

/// How the mail relay session is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpTls {
    /// TLS from the first byte (SMTPS, usually port 465).
    #[default]
    Implicit,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    StartTls,
}

impl std::str::FromStr for SmtpTls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "implicit" | "ssl" | "smtps" => Ok(Self::Implicit),
            "starttls" => Ok(Self::StartTls),
            other => Err(format!("expected implicit or starttls, got {other}")),
        }
    }
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Session encryption mode
    pub tls: SmtpTls,
    /// Operator mailbox (From header)
    pub from_address: String,
    /// Display name (From header)
    pub from_name: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("tls", &self.tls)
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .finish()
    }
}

/// Cloudinary configuration for ticket uploads.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct StorageConfig {
    /// Upload API base URL, without the cloud name
    pub api_base: String,
    /// Cloudinary cloud name
    pub cloud_name: String,
    /// Cloudinary API key
    pub api_key: String,
    /// Cloudinary API secret, used to sign uploads
    pub api_secret: SecretString,
    /// Folder namespace every ticket is uploaded under
    pub folder: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("api_base", &self.api_base)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

/// Inputs of the ticket layout that vary per deployment.
#[derive(Debug, Clone)]
pub struct TicketConfig {
    /// Directory holding `fonts/` and `images/`
    pub assets_dir: PathBuf,
    /// Event name printed in the title and email
    pub event_name: String,
    /// Edition year, used in references
    pub event_year: u16,
    /// Printed when the registrant gave no country
    pub default_country_city: String,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("crates/backoffice/static"),
            event_name: "PyCon Togo".to_string(),
            event_year: pycontg_core::EVENT_YEAR,
            default_country_city: "Togo/Lomé".to_string(),
        }
    }
}

impl BackofficeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("BACKOFFICE_DATABASE_URL")?;
        let host = parse_env("BACKOFFICE_HOST", "127.0.0.1")?;
        let port = parse_env("BACKOFFICE_PORT", "8000")?;
        let cors_origins = get_env_or_default("CORS_ORIGINS", DEFAULT_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        let jwt = JwtConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let storage = StorageConfig::from_env()?;
        let ticket = TicketConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.2);

        Ok(Self {
            database_url,
            host,
            port,
            cors_origins,
            jwt,
            email,
            storage,
            ticket,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Load only the database URL (`BACKOFFICE_DATABASE_URL`, then `DATABASE_URL`).
///
/// Used by tools that talk to the record store without serving HTTP.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("BACKOFFICE_DATABASE_URL")
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("JWT_SECRET")?;
        validate_secret_length(&secret, "JWT_SECRET")?;
        let expire_minutes: i64 = parse_env("JWT_EXPIRE_MINUTES", "60")?;
        if expire_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_EXPIRE_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self {
            secret,
            expire_minutes,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let from_address = get_required_env("SMTP_FROM")?;
        let tls = get_env_or_default("SMTP_TLS", "implicit")
            .parse::<SmtpTls>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_TLS".to_string(), e))?;
        let default_port = match tls {
            SmtpTls::Implicit => "465",
            SmtpTls::StartTls => "587",
        };

        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env("SMTP_PORT", default_port)?,
            smtp_username: get_optional_env("SMTP_USERNAME").unwrap_or_else(|| from_address.clone()),
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            tls,
            from_address,
            from_name: get_env_or_default("SMTP_FROM_NAME", DEFAULT_FROM_NAME),
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: get_env_or_default("CLOUDINARY_API_BASE", DEFAULT_CLOUDINARY_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_API_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "pycon2025"),
        })
    }
}

impl TicketConfig {
    /// Load only the ticket layout inputs, for tools that render tickets
    /// without the rest of the back office.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `EVENT_YEAR` is not a year.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            assets_dir: get_optional_env("TICKET_ASSETS_DIR")
                .map_or(defaults.assets_dir, PathBuf::from),
            event_name: get_optional_env("EVENT_NAME").unwrap_or(defaults.event_name),
            event_year: parse_env("EVENT_YEAR", &defaults.event_year.to_string())?,
            default_country_city: get_optional_env("DEFAULT_COUNTRY_CITY")
                .unwrap_or(defaults.default_country_city),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let err = validate_secret_strength("changeme-0123456789abcdef", "JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(name, _) if name == "JWT_SECRET"));
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        assert!(validate_secret_strength(&"ab".repeat(20), "SMTP_PASSWORD").is_err());
    }

    #[test]
    fn test_random_secret_accepted() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let short = SecretString::from("aB3$xY9!mK2@");
        assert!(validate_secret_length(&short, "JWT_SECRET").is_err());
        let long = SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6!");
        assert!(validate_secret_length(&long, "JWT_SECRET").is_ok());
    }

    #[test]
    fn test_smtp_tls_parse() {
        assert_eq!("implicit".parse::<SmtpTls>(), Ok(SmtpTls::Implicit));
        assert_eq!("SSL".parse::<SmtpTls>(), Ok(SmtpTls::Implicit));
        assert_eq!("starttls".parse::<SmtpTls>(), Ok(SmtpTls::StartTls));
        assert!("plain".parse::<SmtpTls>().is_err());
    }

    #[test]
    fn test_ticket_config_defaults() {
        let ticket = TicketConfig::default();
        assert_eq!(ticket.event_year, 2025);
        assert_eq!(ticket.default_country_city, "Togo/Lomé");
        assert_eq!(ticket.event_name, "PyCon Togo");
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.pytogo.org".to_string(),
            smtp_port: 465,
            smtp_username: "tickets@pytogo.org".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            tls: SmtpTls::Implicit,
            from_address: "tickets@pytogo.org".to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.pytogo.org"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }

    #[test]
    fn test_storage_config_debug_redacts_secret() {
        let config = StorageConfig {
            api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
            cloud_name: "pytogo".to_string(),
            api_key: "123456789012345".to_string(),
            api_secret: SecretString::from("cloudinary_api_secret_value"),
            folder: "pycon2025".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("pytogo"));
        assert!(!debug_output.contains("cloudinary_api_secret_value"));
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let config = JwtConfig {
            secret: SecretString::from("jwt-signing-secret-value"),
            expire_minutes: 60,
        };
        assert!(!format!("{config:?}").contains("jwt-signing-secret-value"));
    }
}
