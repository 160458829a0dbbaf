//! User accounts.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use docshare_core::{NewUser, Timestamp, UserId, UserRecord};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Account storage.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create an unverified account.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the email is already registered
    /// (compared case-insensitively).
    async fn insert(&self, user: NewUser) -> StorageResult<UserRecord>;

    /// Look up an account by id.
    async fn get(&self, id: UserId) -> StorageResult<Option<UserRecord>>;

    /// Look up an account by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    /// Mark an account's email as confirmed. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if no such account exists.
    async fn mark_verified(&self, id: UserId) -> StorageResult<UserRecord>;
}

#[derive(Debug, Default)]
struct UserTable {
    last_id: u64,
    users: BTreeMap<UserId, UserRecord>,
}

/// In-memory [`UserDirectory`].
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    table: RwLock<UserTable>,
}

impl MemoryUserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        let table = self
            .table
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(table.users.len())
    }

    /// Whether the directory is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        self.len().map(|n| n == 0)
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn insert(&self, user: NewUser) -> StorageResult<UserRecord> {
        let mut table = self
            .table
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        if table
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StorageError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }

        let next = table
            .last_id
            .checked_add(1)
            .ok_or_else(|| StorageError::Internal("user id space exhausted".into()))?;
        table.last_id = next;

        let record = UserRecord {
            id: UserId(next),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_verified: false,
            created_at: Timestamp::now(),
        };
        table.users.insert(record.id, record.clone());
        debug!(user_id = %record.id, role = %record.role, "user created");
        Ok(record)
    }

    async fn get(&self, id: UserId) -> StorageResult<Option<UserRecord>> {
        let table = self
            .table
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(table.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let table = self
            .table
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(table
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn mark_verified(&self, id: UserId) -> StorageResult<UserRecord> {
        let mut table = self
            .table
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let user = table
            .users
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("user {id}")))?;
        user.is_verified = true;
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshare_core::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            password_hash: "$2b$04$hash".to_owned(),
            role: Role::Client,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let dir = MemoryUserDirectory::new();
        let a = dir.insert(new_user("a@example.com")).await.unwrap();
        let b = dir.insert(new_user("b@example.com")).await.unwrap();

        assert_eq!(a.id, UserId(1));
        assert_eq!(b.id, UserId(2));
        assert!(!a.is_verified);
        assert_eq!(dir.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let dir = MemoryUserDirectory::new();
        dir.insert(new_user("a@example.com")).await.unwrap();

        let result = dir.insert(new_user("A@Example.com")).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(dir.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_email_case_insensitive() {
        let dir = MemoryUserDirectory::new();
        let created = dir.insert(new_user("Mixed@Example.com")).await.unwrap();

        let found = dir.find_by_email("mixed@example.com").await.unwrap();
        assert_eq!(found, Some(created));
        assert!(dir.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_verified() {
        let dir = MemoryUserDirectory::new();
        let created = dir.insert(new_user("a@example.com")).await.unwrap();

        let verified = dir.mark_verified(created.id).await.unwrap();
        assert!(verified.is_verified);
        assert!(dir.get(created.id).await.unwrap().unwrap().is_verified);

        // Idempotent.
        assert!(dir.mark_verified(created.id).await.unwrap().is_verified);

        assert!(matches!(
            dir.mark_verified(UserId(99)).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
