//! Credential service
//!
//! High-level operations over a credential store. `authorize` is the
//! composition callers must use to gate access; the store alone is not the
//! security boundary.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::StoreError;
use crate::domain::credential::{ApiKeyRecord, CredentialStore, RecordId, RecordStatus, RoleSet};

use super::generator::ApiKeyGenerator;

/// Result of provisioning a new credential
#[derive(Debug)]
pub struct ProvisionedCredential {
    /// Store-assigned record id
    pub id: RecordId,
    /// The bearer secret. Returned exactly once; the service never logs it.
    pub secret: String,
}

/// Service for managing and checking API credentials
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    generator: ApiKeyGenerator,
}

impl CredentialService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            generator: ApiKeyGenerator::production(),
        }
    }

    /// Use a custom key generator
    pub fn with_generator(mut self, generator: ApiKeyGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Provision a new credential with a freshly minted key
    pub async fn provision(
        &self,
        email: &str,
        roles: &RoleSet,
    ) -> Result<ProvisionedCredential, StoreError> {
        let secret = self.generator.generate();
        let id = self.store.create(&secret, email, roles).await?;

        info!(%id, email, "credential provisioned");

        Ok(ProvisionedCredential { id, secret })
    }

    /// Create a credential with a caller-supplied key (imports, integration
    /// tests)
    pub async fn create_with_key(
        &self,
        api_key: &str,
        email: &str,
        roles: &RoleSet,
    ) -> Result<RecordId, StoreError> {
        let id = self.store.create(api_key, email, roles).await?;

        info!(%id, email, "credential created with supplied key");

        Ok(id)
    }

    /// Check a bearer key against a required role
    ///
    /// Passes iff the key resolves to an active record whose role set
    /// contains `required_role`. Every failure mode returns `None`; an
    /// unknown key, a revoked key and a missing role are deliberately
    /// indistinguishable to the caller.
    pub async fn authorize(
        &self,
        api_key: &str,
        required_role: &str,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let Some(record) = self.store.lookup(api_key).await? else {
            debug!("authorization failed: credential does not resolve");
            return Ok(None);
        };

        if !record.roles().contains(required_role) {
            debug!(id = %record.id(), "authorization failed: required role not granted");
            return Ok(None);
        }

        // Usage stamping is best-effort; a bookkeeping failure must not
        // turn into an authorization failure.
        if let Err(e) = self.store.record_usage(record.id()).await {
            warn!(id = %record.id(), error = %e, "failed to record credential usage");
        }

        Ok(Some(record))
    }

    /// Resolve a key to its record without a role check
    pub async fn lookup(&self, api_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        self.store.lookup(api_key).await
    }

    /// Fetch a record by id
    pub async fn get(&self, id: RecordId) -> Result<Option<ApiKeyRecord>, StoreError> {
        self.store.get(id).await
    }

    /// Replace the role set of a record
    pub async fn update_roles(&self, id: RecordId, roles: &RoleSet) -> Result<(), StoreError> {
        info!(%id, "updating credential roles");
        self.store.update_roles(id, roles).await
    }

    /// Rotate a record onto a freshly minted key, returning the new secret
    pub async fn rotate(&self, id: RecordId) -> Result<String, StoreError> {
        let secret = self.generator.generate();
        self.store.rotate_key(id, &secret).await?;

        info!(%id, "credential rotated");

        Ok(secret)
    }

    /// Rotate a record onto a caller-supplied key
    pub async fn rotate_to(&self, id: RecordId, new_api_key: &str) -> Result<(), StoreError> {
        self.store.rotate_key(id, new_api_key).await?;

        info!(%id, "credential rotated to supplied key");

        Ok(())
    }

    /// Revoke a credential. Idempotent.
    pub async fn revoke(&self, id: RecordId) -> Result<(), StoreError> {
        info!(%id, "revoking credential");
        self.store.revoke(id).await
    }

    /// List credentials, optionally filtered by status
    pub async fn list(
        &self,
        status: Option<RecordStatus>,
    ) -> Result<Vec<ApiKeyRecord>, StoreError> {
        self.store.list(status).await
    }

    /// Count credentials, optionally filtered by status
    pub async fn count(&self, status: Option<RecordStatus>) -> Result<usize, StoreError> {
        self.store.count(status).await
    }
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("generator", &self.generator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credential::MockCredentialStore;
    use crate::infrastructure::credential::InMemoryCredentialStore;

    fn create_service() -> CredentialService {
        CredentialService::new(Arc::new(InMemoryCredentialStore::new()))
            .with_generator(ApiKeyGenerator::test())
    }

    #[tokio::test]
    async fn test_provision_and_authorize() {
        let service = create_service();

        let provisioned = service
            .provision("a@x.com", &RoleSet::decode("read,write"))
            .await
            .unwrap();

        assert!(provisioned.secret.starts_with("ak_test_"));
        assert!(provisioned.secret.len() <= 50);

        let record = service
            .authorize(&provisioned.secret, "read")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.id(), provisioned.id);
        assert_eq!(record.email(), "a@x.com");
    }

    #[tokio::test]
    async fn test_authorize_missing_role() {
        let service = create_service();

        let provisioned = service
            .provision("a@x.com", &RoleSet::decode("read"))
            .await
            .unwrap();

        let result = service.authorize(&provisioned.secret, "admin").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_authorize_unknown_key() {
        let service = create_service();

        let result = service.authorize("ak_test_unknown", "read").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_authorize_revoked_key() {
        let service = create_service();

        let provisioned = service
            .provision("a@x.com", &RoleSet::decode("read"))
            .await
            .unwrap();

        service.revoke(provisioned.id).await.unwrap();

        let result = service.authorize(&provisioned.secret, "read").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_authorize_stamps_usage() {
        let service = create_service();

        let provisioned = service
            .provision("a@x.com", &RoleSet::decode("read"))
            .await
            .unwrap();

        service.authorize(&provisioned.secret, "read").await.unwrap();

        let record = service.get(provisioned.id).await.unwrap().unwrap();
        assert!(record.last_used_at().is_some());
    }

    #[tokio::test]
    async fn test_rotate() {
        let service = create_service();

        let provisioned = service
            .provision("a@x.com", &RoleSet::decode("read"))
            .await
            .unwrap();

        let new_secret = service.rotate(provisioned.id).await.unwrap();

        assert_ne!(new_secret, provisioned.secret);
        assert!(
            service
                .authorize(&provisioned.secret, "read")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            service
                .authorize(&new_secret, "read")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_create_with_key_and_update_roles() {
        let service = create_service();

        let id = service
            .create_with_key("abc123", "a@x.com", &RoleSet::decode("read"))
            .await
            .unwrap();

        service
            .update_roles(id, &RoleSet::decode("read,admin"))
            .await
            .unwrap();

        let record = service.authorize("abc123", "admin").await.unwrap();
        assert!(record.is_some());
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let service = create_service();

        service.provision("a@x.com", &RoleSet::decode("read")).await.unwrap();
        service.provision("b@x.com", &RoleSet::decode("read")).await.unwrap();

        assert_eq!(service.count(None).await.unwrap(), 2);
        assert_eq!(service.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_authorize_propagates_storage_errors() {
        let mut mock = MockCredentialStore::new();
        mock.expect_lookup()
            .returning(|_| Err(StoreError::storage("connection lost")));

        let service = CredentialService::new(Arc::new(mock));

        let result = service.authorize("abc123", "read").await;
        assert!(matches!(result, Err(StoreError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_authorize_survives_usage_stamp_failure() {
        let mut mock = MockCredentialStore::new();

        mock.expect_lookup().returning(|key| {
            Ok(Some(ApiKeyRecord::new(
                RecordId::new(1),
                key,
                "a@x.com",
                RoleSet::decode("read"),
            )))
        });
        mock.expect_record_usage()
            .returning(|_| Err(StoreError::storage("write failed")));

        let service = CredentialService::new(Arc::new(mock));

        let record = service.authorize("abc123", "read").await.unwrap();
        assert!(record.is_some());
    }
}
