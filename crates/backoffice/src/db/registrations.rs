//! Registration repository.

use serde_json::json;

use pycontg_core::RegistrationId;

use super::{Filter, RecordStore, RepositoryError, Table};
use crate::models::Registration;

const DUPLICATE_ID: &str = "this registration id is already taken";
const DUPLICATE_EMAIL: &str = "this email is already registered";
const DUPLICATE_ID_OR_EMAIL: &str = "this email or registration id is already registered";

/// Typed access to the `registrations` table.
pub struct RegistrationRepository<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> RegistrationRepository<'a> {
    /// Create a new registration repository.
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Store a new registration.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id or the email is already registered.
    pub async fn create(&self, registration: &Registration) -> Result<(), RepositoryError> {
        let key = registration.id.as_key();
        if self.store.read(Table::Registrations, &key).await?.is_some() {
            return Err(RepositoryError::Conflict(DUPLICATE_ID.to_string()));
        }

        let same_email = [Filter::eq("email", registration.email.as_str())];
        if !self
            .store
            .list(Table::Registrations, &same_email)
            .await?
            .is_empty()
        {
            return Err(RepositoryError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        // A concurrent insert can still win between the checks and the write
        let document = serde_json::to_value(registration)?;
        self.store
            .create(Table::Registrations, &key, document)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    RepositoryError::Conflict(DUPLICATE_ID_OR_EMAIL.to_string())
                }
                other => other,
            })
    }

    /// Get a registration by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get(&self, id: RegistrationId) -> Result<Option<Registration>, RepositoryError> {
        self.store
            .read(Table::Registrations, &id.as_key())
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// List every registration, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored document is invalid.
    pub async fn list(&self) -> Result<Vec<Registration>, RepositoryError> {
        self.store
            .list(Table::Registrations, &[])
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(Into::into))
            .collect()
    }

    /// Set the checked-in flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no registration has this id.
    pub async fn set_checked(
        &self,
        id: RegistrationId,
        checked: bool,
    ) -> Result<Registration, RepositoryError> {
        self.patch(id, json!({ "checked": checked })).await
    }

    /// Set the food-checked flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no registration has this id.
    pub async fn set_food_checked(
        &self,
        id: RegistrationId,
        checked: bool,
    ) -> Result<Registration, RepositoryError> {
        self.patch(id, json!({ "foodchecked": checked })).await
    }

    async fn patch(
        &self,
        id: RegistrationId,
        patch: serde_json::Value,
    ) -> Result<Registration, RepositoryError> {
        let document = self
            .store
            .update(Table::Registrations, &id.as_key(), patch)
            .await?;
        Ok(serde_json::from_value(document)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::MemoryRecordStore;
    use crate::models::NewRegistration;

    fn registration(email: &str) -> Registration {
        serde_json::from_value::<NewRegistration>(json!({"fullName": "tester 1", "email": email}))
            .unwrap()
            .into_registration()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryRecordStore::new();
        let repo = RegistrationRepository::new(&store);
        let registration = registration("t1@pytogo.org");

        repo.create(&registration).await.unwrap();
        assert_eq!(repo.get(registration.id).await.unwrap(), Some(registration));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryRecordStore::new();
        let repo = RegistrationRepository::new(&store);
        repo.create(&registration("t1@pytogo.org")).await.unwrap();

        let err = repo.create(&registration("t1@pytogo.org")).await.unwrap_err();
        match err {
            RepositoryError::Conflict(message) => assert_eq!(message, DUPLICATE_EMAIL),
            other => panic!("expected a conflict, got {other:?}"),
        }
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let store = MemoryRecordStore::new();
        let repo = RegistrationRepository::new(&store);
        let first = registration("t1@pytogo.org");
        repo.create(&first).await.unwrap();

        let mut second = registration("t2@pytogo.org");
        second.id = first.id;
        let err = repo.create(&second).await.unwrap_err();
        match err {
            RepositoryError::Conflict(message) => assert_eq!(message, DUPLICATE_ID),
            other => panic!("expected a conflict, got {other:?}"),
        }
        assert_eq!(repo.get(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_check_in_flags() {
        let store = MemoryRecordStore::new();
        let repo = RegistrationRepository::new(&store);
        let registration = registration("t1@pytogo.org");
        repo.create(&registration).await.unwrap();

        let updated = repo.set_checked(registration.id, true).await.unwrap();
        assert!(updated.checked);
        assert!(!updated.food_checked);

        let updated = repo.set_food_checked(registration.id, true).await.unwrap();
        assert!(updated.checked && updated.food_checked);
    }

    #[tokio::test]
    async fn test_check_in_unknown_registration() {
        let store = MemoryRecordStore::new();
        let repo = RegistrationRepository::new(&store);
        let err = repo
            .set_checked(RegistrationId::generate(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
