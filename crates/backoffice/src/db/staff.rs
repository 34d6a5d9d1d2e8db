//! Staff repository.

use serde_json::Value;

use pycontg_core::{Email, StaffId};

use super::{Filter, RecordStore, RepositoryError, Table};
use crate::models::StaffMember;

/// Typed access to the `staff` table.
pub struct StaffRepository<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> StaffRepository<'a> {
    /// Create a new staff repository.
    #[must_use]
    pub const fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// List all staff accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored document is invalid.
    pub async fn list_all(&self) -> Result<Vec<StaffMember>, RepositoryError> {
        decode_all(self.store.list(Table::Staff, &[]).await?)
    }

    /// Get a staff account by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get_by_id(&self, id: StaffId) -> Result<Option<StaffMember>, RepositoryError> {
        self.store
            .read(Table::Staff, &id.as_key())
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Get a staff account by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored document is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<StaffMember>, RepositoryError> {
        let filters = [Filter::eq("email", email.as_str())];
        Ok(decode_all(self.store.list(Table::Staff, &filters).await?)?
            .into_iter()
            .next())
    }

    /// Next free numeric id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored document is invalid.
    pub async fn next_id(&self) -> Result<StaffId, RepositoryError> {
        let max = self
            .list_all()
            .await?
            .iter()
            .map(|member| member.id.as_i64())
            .max()
            .unwrap_or(0);
        Ok(StaffId::new(max + 1))
    }

    /// Store a new staff account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id or email is taken.
    pub async fn create(&self, member: &StaffMember) -> Result<(), RepositoryError> {
        if self.get_by_email(&member.email).await?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "{} already has a staff account",
                member.email
            )));
        }
        let document = serde_json::to_value(member)?;
        self.store
            .create(Table::Staff, &member.id.as_key(), document)
            .await
    }

    /// Replace a staff account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this id.
    pub async fn save(&self, member: &StaffMember) -> Result<StaffMember, RepositoryError> {
        let owner = self.get_by_email(&member.email).await?.map(|other| other.id);
        if owner.is_some_and(|id| id != member.id) {
            return Err(RepositoryError::Conflict(format!(
                "{} already has a staff account",
                member.email
            )));
        }
        let document = serde_json::to_value(member)?;
        let stored = self
            .store
            .update(Table::Staff, &member.id.as_key(), document)
            .await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Delete a staff account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this id.
    pub async fn delete(&self, id: StaffId) -> Result<(), RepositoryError> {
        self.store.delete(Table::Staff, &id.as_key()).await
    }
}

fn decode_all(documents: Vec<Value>) -> Result<Vec<StaffMember>, RepositoryError> {
    documents
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(Into::into))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pycontg_core::StaffRole;

    use super::*;
    use crate::db::MemoryRecordStore;

    fn member(id: i64, email: &str) -> StaffMember {
        StaffMember {
            id: StaffId::new(id),
            full_name: format!("Staff {id}"),
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_string(),
            role: StaffRole::Staff,
        }
    }

    #[tokio::test]
    async fn test_next_id_increments() {
        let store = MemoryRecordStore::new();
        let repo = StaffRepository::new(&store);
        assert_eq!(repo.next_id().await.unwrap(), StaffId::new(1));

        repo.create(&member(4, "a@pytogo.org")).await.unwrap();
        assert_eq!(repo.next_id().await.unwrap(), StaffId::new(5));
    }

    #[tokio::test]
    async fn test_lookup_by_email() {
        let store = MemoryRecordStore::new();
        let repo = StaffRepository::new(&store);
        repo.create(&member(1, "a@pytogo.org")).await.unwrap();

        let found = repo
            .get_by_email(&Email::parse("a@pytogo.org").unwrap())
            .await
            .unwrap();
        assert_eq!(found.map(|m| m.id), Some(StaffId::new(1)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryRecordStore::new();
        let repo = StaffRepository::new(&store);
        repo.create(&member(1, "a@pytogo.org")).await.unwrap();
        let err = repo.create(&member(2, "a@pytogo.org")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let store = MemoryRecordStore::new();
        let repo = StaffRepository::new(&store);
        let mut staff = member(1, "a@pytogo.org");
        repo.create(&staff).await.unwrap();

        staff.role = StaffRole::Reviewer;
        let saved = repo.save(&staff).await.unwrap();
        assert_eq!(saved.role, StaffRole::Reviewer);

        repo.delete(staff.id).await.unwrap();
        assert!(repo.get_by_id(staff.id).await.unwrap().is_none());
    }
}
