//! Domain layer - core entities and contracts

pub mod credential;
pub mod error;

pub use credential::{
    ApiKeyRecord, CredentialStore, CredentialValidationError, RecordId, RecordStatus, RoleSet,
};
pub use error::StoreError;
