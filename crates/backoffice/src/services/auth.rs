//! Staff authentication.
//!
//! Staff log in with email and password (Argon2 hashes) and receive an HS256
//! bearer token carrying their id, name, email and role. Handlers resolve the
//! token back into a [`CurrentStaff`] through the extractors in
//! [`crate::middleware::auth`].

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use pycontg_core::{Email, StaffId, StaffRole};

use crate::config::JwtConfig;
use crate::db::{RecordStore, RepositoryError, StaffRepository};
use crate::models::{CurrentStaff, NewStaff, StaffMember, StaffUpdate};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Token issuer claim.
const TOKEN_ISSUER: &str = "pycontg-backoffice";

/// Errors that can occur during authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is wrong.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Password does not meet requirements.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Token could not be created or verified.
    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// An account already uses this email.
    #[error("a staff account already uses this email")]
    AlreadyExists,

    /// No such staff account.
    #[error("staff account not found")]
    NotFound,

    /// Storage failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(_) => Self::AlreadyExists,
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// JWT claims - data stored in the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (staff id as string)
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
    pub iss: String,
    /// Unique token identifier
    pub jti: String,
}

/// Creates and verifies bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expire_minutes: i64,
}

impl JwtService {
    /// Create a token service from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expire_minutes: config.expire_minutes,
        }
    }

    /// Token lifetime in seconds.
    #[must_use]
    pub const fn expires_in(&self) -> i64 {
        self.expire_minutes * 60
    }

    /// Issue a token for a staff member.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if encoding fails.
    pub fn create_token(&self, staff: &StaffMember) -> Result<String, AuthError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::minutes(self.expire_minutes);

        let claims = Claims {
            sub: staff.id.to_string(),
            name: staff.full_name.clone(),
            email: staff.email.to_string(),
            role: staff.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify a token and resolve the staff member it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is malformed, forged or expired.
    pub fn verify_token(&self, token: &str) -> Result<CurrentStaff, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)?.claims;
        let id = claims
            .sub
            .parse::<i64>()
            .map(StaffId::new)
            .map_err(|_| AuthError::InvalidCredentials)?;

        Ok(CurrentStaff {
            id,
            full_name: claims.name,
            email: claims.email,
            role: claims.role,
        })
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expire_minutes", &self.expire_minutes)
            .finish_non_exhaustive()
    }
}

/// Staff account operations.
pub struct AuthService<'a> {
    staff: StaffRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore) -> Self {
        Self {
            staff: StaffRepository::new(store),
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<StaffMember, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let member = self
            .staff
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &member.password_hash)?;
        Ok(member)
    }

    /// Create a staff account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::AlreadyExists` if the email is taken.
    pub async fn create_staff(&self, new: NewStaff) -> Result<StaffMember, AuthError> {
        validate_password(&new.password)?;

        let member = StaffMember {
            id: self.staff.next_id().await?,
            full_name: new.full_name.trim().to_string(),
            email: new.email,
            password_hash: hash_password(&new.password)?,
            role: new.role,
        };
        self.staff.create(&member).await?;

        tracing::info!(staff_id = %member.id, role = %member.role, "Staff account created");
        Ok(member)
    }

    /// Apply a partial update to a staff account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if no account has this id.
    pub async fn update_staff(
        &self,
        id: StaffId,
        update: StaffUpdate,
    ) -> Result<StaffMember, AuthError> {
        let mut member = self.staff.get_by_id(id).await?.ok_or(AuthError::NotFound)?;

        if let Some(full_name) = update.full_name {
            member.full_name = full_name.trim().to_string();
        }
        if let Some(email) = update.email {
            member.email = email;
        }
        if let Some(password) = update.password {
            validate_password(&password)?;
            member.password_hash = hash_password(&password)?;
        }
        if let Some(role) = update.role {
            member.role = role;
        }

        Ok(self.staff.save(&member).await?)
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Hash a password using Argon2.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryRecordStore;

    fn jwt(secret: &str) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: SecretString::from(secret),
            expire_minutes: 60,
        })
    }

    fn member() -> StaffMember {
        StaffMember {
            id: StaffId::new(3),
            full_name: "Desk One".to_string(),
            email: Email::parse("desk@pytogo.org").unwrap(),
            password_hash: String::new(),
            role: StaffRole::Reviewer,
        }
    }

    fn new_staff(email: &str, password: &str) -> NewStaff {
        NewStaff {
            full_name: " Desk One ".to_string(),
            email: Email::parse(email).unwrap(),
            password: password.to_string(),
            role: StaffRole::Staff,
        }
    }

    #[test]
    fn test_create_and_verify_token() {
        let service = jwt("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6!");
        let token = service.create_token(&member()).unwrap();

        let current = service.verify_token(&token).unwrap();
        assert_eq!(current.id, StaffId::new(3));
        assert_eq!(current.email, "desk@pytogo.org");
        assert_eq!(current.role, StaffRole::Reviewer);
        assert_eq!(service.expires_in(), 3600);
    }

    #[test]
    fn test_invalid_token() {
        assert!(jwt("secret-one").verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = jwt("secret-one").create_token(&member()).unwrap();
        assert!(jwt("secret-two").verify_token(&token).is_err());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery staple", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(verify_password("anything", "not-a-hash").is_err());
    }

    #[tokio::test]
    async fn test_login_flow() {
        let store = MemoryRecordStore::new();
        let auth = AuthService::new(&store);
        let created = auth
            .create_staff(new_staff("desk@pytogo.org", "long enough password"))
            .await
            .unwrap();
        assert_eq!(created.full_name, "Desk One");
        assert_eq!(created.id, StaffId::new(1));

        let logged_in = auth
            .login("desk@pytogo.org", "long enough password")
            .await
            .unwrap();
        assert_eq!(logged_in.id, created.id);

        assert!(matches!(
            auth.login("desk@pytogo.org", "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@pytogo.org", "long enough password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_weak_password_rejected() {
        let store = MemoryRecordStore::new();
        let auth = AuthService::new(&store);
        assert!(matches!(
            auth.create_staff(new_staff("a@pytogo.org", "short")).await,
            Err(AuthError::WeakPassword(8))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_staff_rejected() {
        let store = MemoryRecordStore::new();
        let auth = AuthService::new(&store);
        auth.create_staff(new_staff("a@pytogo.org", "long enough password"))
            .await
            .unwrap();
        assert!(matches!(
            auth.create_staff(new_staff("a@pytogo.org", "another password"))
                .await,
            Err(AuthError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_update_staff() {
        let store = MemoryRecordStore::new();
        let auth = AuthService::new(&store);
        let created = auth
            .create_staff(new_staff("a@pytogo.org", "long enough password"))
            .await
            .unwrap();

        let updated = auth
            .update_staff(
                created.id,
                StaffUpdate {
                    role: Some(StaffRole::Admin),
                    password: Some("a brand new password".to_string()),
                    ..StaffUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, StaffRole::Admin);
        assert!(auth.login("a@pytogo.org", "a brand new password").await.is_ok());

        assert!(matches!(
            auth.update_staff(StaffId::new(99), StaffUpdate::default()).await,
            Err(AuthError::NotFound)
        ));
    }
}
