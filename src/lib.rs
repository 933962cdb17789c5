//! Credential store for API-key based authorization
//!
//! One persisted record type binds an opaque API key to an account email
//! and a set of roles. The crate provides:
//! - the [`CredentialStore`] contract with in-memory and PostgreSQL backends
//! - an optional read-through lookup cache with synchronous invalidation
//! - a [`CredentialService`] composing lookup with role checking, which is
//!   the only supported way to gate access

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    ApiKeyRecord, CredentialStore, CredentialValidationError, RecordId, RecordStatus, RoleSet,
    StoreError,
};
pub use infrastructure::credential::{
    ApiKeyGenerator, CachedCredentialStore, CredentialService, InMemoryCredentialStore,
    PostgresConfig, PostgresCredentialStore, ProvisionedCredential,
};

use std::sync::Arc;
use std::time::Duration;

use config::StorageBackend;
use infrastructure::logging;
use tracing::info;

/// Create a credential store from configuration
///
/// Selects the backend, ensures the schema for PostgreSQL, and wraps the
/// store in a lookup cache when configured.
pub async fn create_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .url
                .clone()
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| {
                    anyhow::anyhow!("postgres backend selected but no database URL configured")
                })?;

            let pg_config = PostgresConfig::new(url)
                .with_max_connections(config.storage.max_connections)
                .with_connect_timeout(config.storage.connect_timeout_secs);

            info!("connecting to PostgreSQL credential store");
            let store = PostgresCredentialStore::connect(&pg_config).await?;
            store.ensure_table().await?;

            Arc::new(store)
        }
    };

    if config.cache.enabled {
        info!(
            ttl_secs = config.cache.ttl_secs,
            "enabling credential lookup cache"
        );

        Ok(Arc::new(CachedCredentialStore::with_capacity(
            store,
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.max_capacity,
        )))
    } else {
        Ok(store)
    }
}

/// Create the credential service over a store
pub fn create_service(store: Arc<dyn CredentialStore>) -> CredentialService {
    CredentialService::new(store)
}

/// Initialize logging and build the service in one step
pub async fn bootstrap(config: &AppConfig) -> anyhow::Result<CredentialService> {
    logging::init_logging(&config.logging);

    let store = create_store(config).await?;
    Ok(create_service(store))
}
