//! Ticket image storage on Cloudinary.
//!
//! Tickets are uploaded with the signed upload API under
//! `<folder>/tickets/<REFERENCE>` with `overwrite=true`, so re-issuing a
//! ticket replaces the previous image at the same URL.
//!
//! # API Reference
//!
//! - Endpoint: `POST {api_base}/{cloud_name}/image/upload`
//! - Signature: hex SHA-1 of the sorted `key=value` pairs joined by `&`,
//!   immediately followed by the API secret

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, RgbaImage};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use pycontg_core::TicketReference;

use crate::config::StorageConfig;

/// Namespace for ticket images inside the configured folder.
const TICKETS_PREFIX: &str = "tickets";

/// Errors that can occur when storing a ticket image.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The image could not be serialized as PNG.
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// The storage host could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The credentials were refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Upload quota or rate limit exhausted.
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Any other refusal by the host.
    #[error("upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The host accepted the upload but did not return a usable URL.
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
}

/// Durable storage for rendered tickets.
pub trait ArtifactStore: Send + Sync {
    /// Persist `image` under `key` and return its public HTTPS URL.
    ///
    /// Storing twice under the same key overwrites the first image.
    fn store(
        &self,
        image: &RgbaImage,
        key: &TicketReference,
    ) -> impl Future<Output = Result<Url, StorageError>> + Send;
}

impl<T: ArtifactStore> ArtifactStore for Arc<T> {
    fn store(
        &self,
        image: &RgbaImage,
        key: &TicketReference,
    ) -> impl Future<Output = Result<Url, StorageError>> + Send {
        (**self).store(image, key)
    }
}

/// Encode an image as PNG.
///
/// # Errors
///
/// Returns [`StorageError::Encode`] if the encoder fails.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| StorageError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Cloudinary signature over upload parameters.
///
/// `file`, `api_key` and `signature` itself must not be part of `params`.
#[must_use]
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Cloudinary-backed [`ArtifactStore`].
#[derive(Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl CloudinaryStore {
    /// Create a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            upload_url: format!("{}/{}/image/upload", config.api_base, config.cloud_name),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    /// Upload endpoint, including the cloud name.
    #[must_use]
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Public id (path inside the folder) of the ticket for `reference`.
    #[must_use]
    pub fn public_id(reference: &TicketReference) -> String {
        format!("{TICKETS_PREFIX}/{reference}")
    }

    fn signed_form(&self, png: Vec<u8>, reference: &TicketReference) -> Result<Form, StorageError> {
        let params = [
            ("folder", self.folder.clone()),
            ("overwrite", "true".to_string()),
            ("public_id", Self::public_id(reference)),
            ("timestamp", chrono::Utc::now().timestamp().to_string()),
        ];
        let signature = sign_params(&params, self.api_secret.expose_secret());

        let file = Part::bytes(png)
            .file_name(format!("{reference}.png"))
            .mime_str("image/png")
            .map_err(|e| StorageError::Encode(e.to_string()))?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }
        Ok(form)
    }

    async fn upload(&self, png: Vec<u8>, reference: &TicketReference) -> Result<Url, StorageError> {
        let form = self.signed_form(png, reference)?;
        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        parse_upload_response(status, &body)
    }
}

impl ArtifactStore for CloudinaryStore {
    #[instrument(skip(self, image), fields(reference = %key))]
    async fn store(&self, image: &RgbaImage, key: &TicketReference) -> Result<Url, StorageError> {
        let png = encode_png(image)?;
        let url = self.upload(png, key).await?;
        tracing::info!(url = %url, "Ticket image stored");
        Ok(url)
    }
}

impl std::fmt::Debug for CloudinaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryStore")
            .field("upload_url", &self.upload_url)
            .field("folder", &self.folder)
            .finish_non_exhaustive()
    }
}

/// Map an upload response to the stored image URL.
fn parse_upload_response(status: StatusCode, body: &str) -> Result<Url, StorageError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(match status.as_u16() {
            401 | 403 => StorageError::Unauthorized(message),
            420 | 429 => StorageError::Quota(message),
            code => StorageError::Rejected {
                status: code,
                message,
            },
        });
    }

    let response: UploadResponse = serde_json::from_str(body)
        .map_err(|e| StorageError::InvalidResponse(format!("Failed to parse response: {e}")))?;
    let secure_url = response
        .secure_url
        .ok_or_else(|| StorageError::InvalidResponse("missing secure_url".to_string()))?;
    let url = Url::parse(&secure_url)
        .map_err(|e| StorageError::InvalidResponse(format!("bad secure_url: {e}")))?;
    if url.scheme() != "https" {
        return Err(StorageError::InvalidResponse(format!(
            "secure_url is not HTTPS: {url}"
        )));
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reference() -> TicketReference {
        pycontg_core::reference("5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c").unwrap()
    }

    #[test]
    fn test_signature_matches_known_vector() {
        let params = [
            ("timestamp", "1700000000".to_string()),
            ("public_id", "tickets/PYCONTG-2025-5C663C".to_string()),
            ("folder", "pycon2025".to_string()),
            ("overwrite", "true".to_string()),
        ];
        assert_eq!(
            sign_params(&params, "abcd"),
            "a6050eab7ec977d0b5f62324bf2d16b00c9cfe8d"
        );
    }

    #[test]
    fn test_signature_ignores_param_order() {
        let a = [("a", "1".to_string()), ("b", "2".to_string())];
        let b = [("b", "2".to_string()), ("a", "1".to_string())];
        assert_eq!(sign_params(&a, "s"), sign_params(&b, "s"));
        assert_ne!(sign_params(&a, "s"), sign_params(&a, "t"));
    }

    #[test]
    fn test_public_id() {
        assert_eq!(
            CloudinaryStore::public_id(&reference()),
            "tickets/PYCONTG-2025-5C663C"
        );
    }

    #[test]
    fn test_upload_url() {
        let store = CloudinaryStore::new(&StorageConfig {
            api_base: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: "pytogo".to_string(),
            api_key: "key".to_string(),
            api_secret: SecretString::from("secret"),
            folder: "pycon2025".to_string(),
        })
        .unwrap();
        assert_eq!(
            store.upload_url(),
            "https://api.cloudinary.com/v1_1/pytogo/image/upload"
        );
        assert!(!format!("{store:?}").contains("secret"));
    }

    #[test]
    fn test_success_response() {
        let url = parse_upload_response(
            StatusCode::OK,
            r#"{"secure_url":"https://res.cloudinary.com/pytogo/image/upload/v1/pycon2025/tickets/PYCONTG-2025-5C663C.png"}"#,
        )
        .unwrap();
        assert_eq!(url.scheme(), "https");
        assert!(url.path().ends_with("PYCONTG-2025-5C663C.png"));
    }

    #[test]
    fn test_error_classification() {
        let body = r#"{"error":{"message":"Invalid Signature"}}"#;
        assert!(matches!(
            parse_upload_response(StatusCode::UNAUTHORIZED, body),
            Err(StorageError::Unauthorized(m)) if m == "Invalid Signature"
        ));
        assert!(matches!(
            parse_upload_response(StatusCode::TOO_MANY_REQUESTS, body),
            Err(StorageError::Quota(_))
        ));
        assert!(matches!(
            parse_upload_response(StatusCode::from_u16(420).unwrap(), body),
            Err(StorageError::Quota(_))
        ));
        assert!(matches!(
            parse_upload_response(StatusCode::BAD_REQUEST, "plain text"),
            Err(StorageError::Rejected { status: 400, message }) if message == "plain text"
        ));
    }

    #[test]
    fn test_missing_or_insecure_url() {
        assert!(matches!(
            parse_upload_response(StatusCode::OK, "{}"),
            Err(StorageError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_upload_response(StatusCode::OK, r#"{"secure_url":"http://res.cloudinary.com/x.png"}"#),
            Err(StorageError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_upload_response(StatusCode::OK, "<html>"),
            Err(StorageError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&RgbaImage::new(4, 4)).unwrap();
        assert_eq!(png.get(..8), Some(&b"\x89PNG\r\n\x1a\n"[..]));
    }
}
