//! Read-through lookup cache over a credential store

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::domain::StoreError;
use crate::domain::credential::{ApiKeyRecord, CredentialStore, RecordId, RecordStatus, RoleSet};

/// Credential store wrapper that caches `lookup` results with a TTL
///
/// Entries for a record's key are invalidated synchronously inside
/// `update_roles`, `rotate_key` and `revoke`, before the call returns, so a
/// mutated key never resolves from a stale entry. Negative lookups are never
/// cached. `record_usage` intentionally skips invalidation: a cached record
/// may carry a stale `last_used_at`, which keeps the hot path cheap.
pub struct CachedCredentialStore {
    inner: Arc<dyn CredentialStore>,
    cache: Cache<String, Arc<ApiKeyRecord>>,
}

impl CachedCredentialStore {
    pub fn new(inner: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, 10_000)
    }

    pub fn with_capacity(inner: Arc<dyn CredentialStore>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(capacity)
            .build();

        Self { inner, cache }
    }

    /// Invalidate a specific key from the cache
    pub async fn invalidate(&self, api_key: &str) {
        self.cache.invalidate(api_key).await;
    }

    /// Invalidate all cached entries
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached entries
    pub fn cache_size(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Drop the cache entry for the key a record currently holds
    async fn invalidate_record_key(&self, id: RecordId) -> Result<(), StoreError> {
        if let Some(record) = self.inner.get(id).await? {
            self.cache.invalidate(record.api_key()).await;
        }
        Ok(())
    }
}

impl fmt::Debug for CachedCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredentialStore")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialStore for CachedCredentialStore {
    async fn create(
        &self,
        api_key: &str,
        email: &str,
        roles: &RoleSet,
    ) -> Result<RecordId, StoreError> {
        // Nothing to invalidate: negative lookups are never cached, so a
        // fresh key cannot have a stale entry.
        self.inner.create(api_key, email, roles).await
    }

    async fn lookup(&self, api_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        if let Some(cached) = self.cache.get(api_key).await {
            tracing::debug!(id = %cached.id(), "credential cache hit");
            return Ok(Some((*cached).clone()));
        }

        let record = self.inner.lookup(api_key).await?;

        if let Some(ref record) = record {
            tracing::debug!(id = %record.id(), "credential cache miss, loaded from store");
            self.cache
                .insert(api_key.to_string(), Arc::new(record.clone()))
                .await;
        }

        Ok(record)
    }

    async fn get(&self, id: RecordId) -> Result<Option<ApiKeyRecord>, StoreError> {
        self.inner.get(id).await
    }

    async fn update_roles(&self, id: RecordId, roles: &RoleSet) -> Result<(), StoreError> {
        self.inner.update_roles(id, roles).await?;
        self.invalidate_record_key(id).await
    }

    async fn rotate_key(&self, id: RecordId, new_api_key: &str) -> Result<(), StoreError> {
        let previous = self.inner.get(id).await?;

        self.inner.rotate_key(id, new_api_key).await?;

        if let Some(previous) = previous {
            self.cache.invalidate(previous.api_key()).await;
        }
        // A stale entry under the new key would shadow the freshly rotated
        // record until its TTL ran out.
        self.cache.invalidate(new_api_key).await;

        Ok(())
    }

    async fn revoke(&self, id: RecordId) -> Result<(), StoreError> {
        let previous = self.inner.get(id).await?;

        self.inner.revoke(id).await?;

        if let Some(previous) = previous {
            self.cache.invalidate(previous.api_key()).await;
        }

        Ok(())
    }

    async fn record_usage(&self, id: RecordId) -> Result<(), StoreError> {
        self.inner.record_usage(id).await
    }

    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<ApiKeyRecord>, StoreError> {
        self.inner.list(status).await
    }

    async fn count(&self, status: Option<RecordStatus>) -> Result<usize, StoreError> {
        self.inner.count(status).await
    }
}
