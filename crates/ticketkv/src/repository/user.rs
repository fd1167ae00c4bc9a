//! User repository.

use std::sync::Arc;
use std::time::Duration;

use ticketkv_core::{validate_user, RecordId, User};
use ticketkv_store::KvBackend;

use super::{find_record, Store};
use crate::clock::Clock;
use crate::error::Result;
use crate::hasher::PasswordHasher;

/// Accounts, unique by username and by email independently.
///
/// Passwords are validated in plaintext and stored only as a hash.
#[derive(Clone)]
pub struct UserRepository {
    store: Store<User>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
}

impl UserRepository {
    pub fn new(
        backend: Arc<dyn KvBackend>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: Store::new(backend),
            hasher,
            clock,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.store = self.store.with_timeout(timeout);
        self
    }

    /// Register a new user. Any id or timestamps on `user` are ignored.
    pub async fn create(&self, mut user: User) -> Result<User> {
        validate_user(&user)?;
        user.password = self.hasher.hash(&user.password)?;
        let created = self.store.create(user, self.clock.now()).await?;
        tracing::debug!(id = %created.id, username = %created.username, "registered user");
        Ok(created)
    }

    /// Merge `partial` over the stored user. Zero fields keep their stored
    /// value; a non-empty password replaces the stored hash.
    pub async fn update(&self, partial: User) -> Result<User> {
        let previous = self.store.load_previous(partial.id).await?;
        let new_password = !partial.password.is_empty();
        let mut merged = self.store.merge(partial, &previous, self.clock.now())?;

        // The merged password is either the new plaintext or the old hash,
        // which always passes the length rule.
        validate_user(&merged)?;
        if new_password {
            merged.password = self.hasher.hash(&merged.password)?;
        }

        Ok(self.store.commit_update(merged, &previous).await?)
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<User>> {
        Ok(self.store.get(id).await?)
    }

    /// Find by `user_<id>`, username or email.
    pub async fn find(&self, key_or_value: &str) -> Result<Option<User>> {
        find_record(&self.store, key_or_value).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        Ok(self.store.list().await?)
    }

    /// The user whose username or email is `login`, if `password` matches.
    pub async fn verify_credential(&self, login: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find(login).await? else {
            return Ok(None);
        };
        if self.hasher.verify(password, &user.password)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Soft-delete; the username and email become available again.
    pub async fn delete(&self, id: RecordId) -> Result<User> {
        Ok(self.store.soft_delete(id, self.clock.now()).await?)
    }
}
