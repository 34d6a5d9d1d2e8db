//! Unified error handling for the back office.
//!
//! Every handler returns [`AppError`] on failure. Responses are JSON
//! `{"detail": ...}` bodies; server errors are reported to Sentry and their
//! internal details are not exposed.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::CurrentStaff;
use crate::services::{AuthError, RegistrationError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or staff management failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Registration or ticket issuance failed.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Auth(e) => match e {
                AuthError::InvalidCredentials | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
                AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::AlreadyExists => StatusCode::CONFLICT,
                AuthError::NotFound => StatusCode::NOT_FOUND,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Registration(e) => match e {
                RegistrationError::Store(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                RegistrationError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistrationError::Store(_)
                | RegistrationError::Unconfirmed(_)
                | RegistrationError::Ticket { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for this error.
    fn body(&self) -> serde_json::Value {
        match self {
            Self::Registration(RegistrationError::Ticket {
                registration_id,
                failure,
            }) => json!({
                "detail": "Registration saved, but ticket issuance failed",
                "registration_id": registration_id,
                "stage": failure.stage,
                "registration_saved": true,
            }),
            Self::Registration(RegistrationError::Store(RepositoryError::Conflict(reason))) => {
                json!({ "detail": format!("Registration failed: {reason}") })
            }
            // The write went through; only the read-back failed
            Self::Registration(RegistrationError::Unconfirmed(registration_id)) => json!({
                "detail": "Registration received, but it could not be confirmed",
                "registration_id": registration_id,
            }),
            Self::Registration(RegistrationError::NotFound(id)) => {
                json!({ "detail": format!("Registration {id} not found") })
            }
            Self::Registration(_) => json!({ "detail": "Registration failed" }),
            _ if self.status().is_server_error() => json!({ "detail": "Internal server error" }),
            Self::Database(RepositoryError::NotFound) => json!({ "detail": "Not found" }),
            Self::Database(RepositoryError::Conflict(message)) => json!({ "detail": message }),
            Self::Auth(AuthError::Token(_)) => json!({ "detail": "Invalid or expired token" }),
            Self::Auth(e) => json!({ "detail": e.to_string() }),
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::BadRequest(m) => json!({ "detail": m }),
            Self::Database(_) | Self::Internal(_) => json!({ "detail": "Internal server error" }),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Back office request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Set the Sentry user context for the authenticated staff member.
pub fn set_sentry_user(staff: &CurrentStaff) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(staff.id.to_string()),
            email: Some(staff.email.clone()),
            username: Some(staff.full_name.clone()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use pycontg_core::RegistrationId;

    use super::*;
    use crate::services::ticket::{DeliveryError, IssuanceFailure, Stage};

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("registration-123".to_string());
        assert_eq!(err.to_string(), "Not found: registration-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("dup".to_string()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_ticket_failure_body() {
        let id: RegistrationId = "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c".parse().unwrap();
        let err = AppError::Registration(RegistrationError::Ticket {
            registration_id: id,
            failure: IssuanceFailure {
                stage: Stage::Notifying,
                cause: DeliveryError::Connection("refused".to_string()).into(),
            },
        });

        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "detail": "Registration saved, but ticket issuance failed",
                "registration_id": "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c",
                "stage": "notifying",
                "registration_saved": true,
            })
        );
    }

    #[tokio::test]
    async fn test_store_failure_body_is_distinct() {
        let err = AppError::Registration(RegistrationError::Store(
            RepositoryError::DataCorruption("boom".to_string()),
        ));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Registration failed" }));
    }

    #[tokio::test]
    async fn test_unconfirmed_body_does_not_claim_failure() {
        let id: RegistrationId = "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c".parse().unwrap();
        let (status, body) =
            body_json(AppError::Registration(RegistrationError::Unconfirmed(id))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({
                "detail": "Registration received, but it could not be confirmed",
                "registration_id": "5c663cb9-5b6c-4ff6-a2cf-0c87f2f5127c",
            })
        );
    }

    #[tokio::test]
    async fn test_conflict_body_names_the_cause() {
        let err = AppError::Registration(RegistrationError::Store(RepositoryError::Conflict(
            "this registration id is already taken".to_string(),
        )));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body,
            json!({ "detail": "Registration failed: this registration id is already taken" })
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("secret detail".to_string()));
        let (_, body) = body_json(err).await;
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }
}
