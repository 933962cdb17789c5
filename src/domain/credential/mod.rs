//! Credential domain
//!
//! Domain types for API-key credentials: the record entity, role set
//! encoding, field validation, and the store contract.

mod entity;
mod roles;
mod store;
mod validation;

pub use entity::{ApiKeyRecord, RecordId, RecordStatus};
pub use roles::{ROLE_DELIMITER, RoleSet};
pub use store::CredentialStore;
pub use validation::{
    CredentialValidationError, MAX_API_KEY_LEN, MAX_EMAIL_LEN, MAX_ROLES_LEN, validate_api_key,
    validate_email, validate_roles,
};

#[cfg(test)]
pub use store::MockCredentialStore;
