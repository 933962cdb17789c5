//! Credential store implementations
//!
//! Backends for the credential store contract, the lookup cache, key
//! generation, and the service that composes them into the authorization
//! boundary.

mod cached;
mod generator;
mod in_memory;
mod postgres;
mod service;

pub use cached::CachedCredentialStore;
pub use generator::ApiKeyGenerator;
pub use in_memory::InMemoryCredentialStore;
pub use postgres::{PostgresConfig, PostgresCredentialStore};
pub use service::{CredentialService, ProvisionedCredential};
