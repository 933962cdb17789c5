//! In-memory credential store implementation

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::StoreError;
use crate::domain::credential::{
    ApiKeyRecord, CredentialStore, RecordId, RecordStatus, RoleSet, validate_api_key,
    validate_email, validate_roles,
};

#[derive(Debug, Default)]
struct Inner {
    /// All records ever created, revoked ones included; ids are never reused
    by_id: HashMap<i64, ApiKeyRecord>,
    /// Active keys only
    by_key: HashMap<String, i64>,
    next_id: i64,
}

/// In-memory implementation of [`CredentialStore`]
///
/// A single lock guards both indexes, so a reader can never observe a
/// half-applied mutation: a concurrent `lookup` during `rotate_key` sees
/// either the pre-rotation or the post-rotation state. Lookups take the
/// read guard only and never block each other.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(
        &self,
        api_key: &str,
        email: &str,
        roles: &RoleSet,
    ) -> Result<RecordId, StoreError> {
        validate_api_key(api_key)?;
        validate_email(email)?;
        validate_roles(roles)?;

        let mut inner = self.inner.write().await;

        if inner.by_key.contains_key(api_key) {
            return Err(StoreError::DuplicateKey);
        }

        inner.next_id += 1;
        let id = RecordId::new(inner.next_id);
        let record = ApiKeyRecord::new(id, api_key, email, roles.clone());

        inner.by_key.insert(api_key.to_string(), id.as_i64());
        inner.by_id.insert(id.as_i64(), record);

        Ok(id)
    }

    async fn lookup(&self, api_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let inner = self.inner.read().await;

        // A malformed key simply is not in the index; absent, revoked and
        // malformed are indistinguishable to the caller.
        Ok(inner
            .by_key
            .get(api_key)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn get(&self, id: RecordId) -> Result<Option<ApiKeyRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(&id.as_i64()).cloned())
    }

    async fn update_roles(&self, id: RecordId, roles: &RoleSet) -> Result<(), StoreError> {
        validate_roles(roles)?;

        let mut inner = self.inner.write().await;

        match inner.by_id.get_mut(&id.as_i64()) {
            Some(record) if record.is_active() => {
                record.set_roles(roles.clone());
                Ok(())
            }
            _ => Err(StoreError::not_found(format!(
                "no active record with id {id}"
            ))),
        }
    }

    async fn rotate_key(&self, id: RecordId, new_api_key: &str) -> Result<(), StoreError> {
        validate_api_key(new_api_key)?;

        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let record = match inner.by_id.get_mut(&id.as_i64()) {
            Some(record) if record.is_active() => record,
            _ => {
                return Err(StoreError::not_found(format!(
                    "no active record with id {id}"
                )));
            }
        };

        // Rotating onto the record's own current key is a no-op, not a
        // collision.
        if let Some(&owner) = inner.by_key.get(new_api_key) {
            if owner != id.as_i64() {
                return Err(StoreError::DuplicateKey);
            }
        }

        inner.by_key.remove(record.api_key());
        inner.by_key.insert(new_api_key.to_string(), id.as_i64());
        record.set_api_key(new_api_key);

        Ok(())
    }

    async fn revoke(&self, id: RecordId) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        if let Some(record) = inner.by_id.get_mut(&id.as_i64()) {
            if record.is_active() {
                inner.by_key.remove(record.api_key());
                record.revoke();
            }
        }

        Ok(())
    }

    async fn record_usage(&self, id: RecordId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        match inner.by_id.get_mut(&id.as_i64()) {
            Some(record) if record.is_active() => {
                record.record_usage();
                Ok(())
            }
            _ => Err(StoreError::not_found(format!(
                "no active record with id {id}"
            ))),
        }
    }

    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<ApiKeyRecord>, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner
            .by_id
            .values()
            .filter(|r| status.is_none_or(|s| r.status() == s))
            .cloned()
            .collect())
    }

    async fn count(&self, status: Option<RecordStatus>) -> Result<usize, StoreError> {
        let inner = self.inner.read().await;

        Ok(inner
            .by_id
            .values()
            .filter(|r| status.is_none_or(|s| r.status() == s))
            .count())
    }
}
