use thiserror::Error;

use crate::domain::credential::CredentialValidationError;

/// Errors surfaced by credential store operations
///
/// Every kind is recoverable by the caller; no failed operation leaves the
/// store unusable.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An input failed length or emptiness validation
    #[error("invalid field: {0}")]
    InvalidField(#[from] CredentialValidationError),

    /// The API key is already bound to an active record. Deliberately
    /// carries no message so the offending key can never leak into logs.
    #[error("api key already in use")]
    DuplicateKey,

    /// The id does not reference an active record
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Backend failure (connection, pool, serialization)
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = StoreError::not_found("no active record with id 7");
        assert_eq!(error.to_string(), "not found: no active record with id 7");
    }

    #[test]
    fn test_duplicate_key_carries_no_detail() {
        let error = StoreError::DuplicateKey;
        assert_eq!(error.to_string(), "api key already in use");
    }

    #[test]
    fn test_invalid_field_from_validation() {
        let error: StoreError = CredentialValidationError::Empty { field: "email" }.into();
        assert_eq!(error.to_string(), "invalid field: email must not be empty");
    }

    #[test]
    fn test_storage_error() {
        let error = StoreError::storage("pool exhausted");
        assert_eq!(error.to_string(), "storage error: pool exhausted");
    }
}
