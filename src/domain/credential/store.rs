//! Credential store trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{ApiKeyRecord, RecordId, RecordStatus};
use super::roles::RoleSet;
use crate::domain::StoreError;

/// Store contract for credential records
///
/// Implementations must keep the active-key uniqueness invariant under
/// concurrent mutation, and `lookup` must never surface whether a key is
/// malformed, revoked, or simply absent: all three are `None`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a new record. The store assigns the id.
    async fn create(
        &self,
        api_key: &str,
        email: &str,
        roles: &RoleSet,
    ) -> Result<RecordId, StoreError>;

    /// Resolve an API key to its active record. The authorization hot path.
    async fn lookup(&self, api_key: &str) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Fetch a record by id regardless of status
    async fn get(&self, id: RecordId) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Replace the role set of an active record
    async fn update_roles(&self, id: RecordId, roles: &RoleSet) -> Result<(), StoreError>;

    /// Swap the stored key atomically: the old key stops resolving the
    /// instant the new one starts.
    async fn rotate_key(&self, id: RecordId, new_api_key: &str) -> Result<(), StoreError>;

    /// Mark a record revoked. Idempotent; revoking an unknown or
    /// already-revoked id is not an error.
    async fn revoke(&self, id: RecordId) -> Result<(), StoreError>;

    /// Stamp last usage on an active record
    async fn record_usage(&self, id: RecordId) -> Result<(), StoreError>;

    /// List records, optionally filtered by status
    async fn list(&self, status: Option<RecordStatus>) -> Result<Vec<ApiKeyRecord>, StoreError>;

    /// Count records, optionally filtered by status
    async fn count(&self, status: Option<RecordStatus>) -> Result<usize, StoreError>;
}
