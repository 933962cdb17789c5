//! Field validation for credential records

use thiserror::Error;

use super::roles::RoleSet;

/// Errors that can occur during credential field validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} bytes")]
    TooLong { field: &'static str, max: usize },
}

pub const MAX_API_KEY_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_ROLES_LEN: usize = 255;

fn validate_bounds(
    value: &str,
    field: &'static str,
    max: usize,
) -> Result<(), CredentialValidationError> {
    // Whitespace-only values count as absent, never as present-but-blank.
    if value.trim().is_empty() {
        return Err(CredentialValidationError::Empty { field });
    }

    if value.len() > max {
        return Err(CredentialValidationError::TooLong { field, max });
    }

    Ok(())
}

/// Validate an API key credential string
pub fn validate_api_key(api_key: &str) -> Result<(), CredentialValidationError> {
    validate_bounds(api_key, "api_key", MAX_API_KEY_LEN)
}

/// Validate an account email
pub fn validate_email(email: &str) -> Result<(), CredentialValidationError> {
    validate_bounds(email, "email", MAX_EMAIL_LEN)
}

/// Validate a role set
///
/// The set must be non-empty and its packed encoding must fit the storage
/// column.
pub fn validate_roles(roles: &RoleSet) -> Result<(), CredentialValidationError> {
    if roles.is_empty() {
        return Err(CredentialValidationError::Empty { field: "roles" });
    }

    if roles.encode().len() > MAX_ROLES_LEN {
        return Err(CredentialValidationError::TooLong {
            field: "roles",
            max: MAX_ROLES_LEN,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_api_keys() {
        assert!(validate_api_key("abc123").is_ok());
        assert!(validate_api_key(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn test_empty_api_key() {
        assert_eq!(
            validate_api_key(""),
            Err(CredentialValidationError::Empty { field: "api_key" })
        );
    }

    #[test]
    fn test_whitespace_only_api_key() {
        assert_eq!(
            validate_api_key("   "),
            Err(CredentialValidationError::Empty { field: "api_key" })
        );
    }

    #[test]
    fn test_too_long_api_key() {
        assert_eq!(
            validate_api_key(&"a".repeat(51)),
            Err(CredentialValidationError::TooLong {
                field: "api_key",
                max: 50
            })
        );
    }

    #[test]
    fn test_valid_email() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email(&"e".repeat(255)).is_ok());
    }

    #[test]
    fn test_invalid_email() {
        assert_eq!(
            validate_email(" "),
            Err(CredentialValidationError::Empty { field: "email" })
        );
        assert_eq!(
            validate_email(&"e".repeat(256)),
            Err(CredentialValidationError::TooLong {
                field: "email",
                max: 255
            })
        );
    }

    #[test]
    fn test_empty_roles() {
        assert_eq!(
            validate_roles(&RoleSet::new()),
            Err(CredentialValidationError::Empty { field: "roles" })
        );
    }

    #[test]
    fn test_roles_length_bound() {
        let ok: RoleSet = (0..10).map(|i| format!("role-{i}")).collect();
        assert!(validate_roles(&ok).is_ok());

        let too_long: RoleSet = (0..32).map(|i| format!("long-role-name-{i}")).collect();
        assert_eq!(
            validate_roles(&too_long),
            Err(CredentialValidationError::TooLong {
                field: "roles",
                max: 255
            })
        );
    }
}
