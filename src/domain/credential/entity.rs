//! API key record entity and related types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::roles::RoleSet;

/// Record identifier, assigned by the store and immutable afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a credential record
///
/// Two states only; `Revoked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Revoked,
}

impl RecordStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Credential record binding an API key to an account email and a role set
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Store-assigned identifier, never reused
    id: RecordId,
    /// Opaque bearer credential. Redacted from `Debug` output.
    api_key: String,
    /// Account identifier; an account may hold several keys
    email: String,
    /// Capability tags; packed into a single string at the storage boundary
    roles: RoleSet,
    status: RecordStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Last time the key passed an authorization check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Create a new active record
    pub fn new(
        id: RecordId,
        api_key: impl Into<String>,
        email: impl Into<String>,
        roles: RoleSet,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            api_key: api_key.into(),
            email: email.into(),
            roles,
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
            last_used_at: None,
        }
    }

    /// Reassemble a record from its persisted parts
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: RecordId,
        api_key: String,
        email: String,
        roles: RoleSet,
        status: RecordStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        last_used_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            api_key,
            email,
            roles,
            status,
            created_at,
            updated_at,
            last_used_at,
        }
    }

    // Getters

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn roles(&self) -> &RoleSet {
        &self.roles
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    // Mutators

    /// Replace the role set
    pub fn set_roles(&mut self, roles: RoleSet) {
        self.roles = roles;
        self.touch();
    }

    /// Swap the stored credential. The caller is responsible for the
    /// uniqueness check.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
        self.touch();
    }

    /// Mark the record revoked. Terminal.
    pub fn revoke(&mut self) {
        self.status = RecordStatus::Revoked;
        self.touch();
    }

    /// Stamp the key as used
    pub fn record_usage(&mut self) {
        self.last_used_at = Some(Utc::now());
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl fmt::Debug for ApiKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyRecord")
            .field("id", &self.id)
            .field("api_key", &"<redacted>")
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record(id: i64, api_key: &str) -> ApiKeyRecord {
        ApiKeyRecord::new(
            RecordId::new(id),
            api_key,
            "a@x.com",
            RoleSet::decode("read,write"),
        )
    }

    #[test]
    fn test_new_record_is_active() {
        let record = create_test_record(1, "abc123");

        assert_eq!(record.id().as_i64(), 1);
        assert_eq!(record.api_key(), "abc123");
        assert_eq!(record.email(), "a@x.com");
        assert!(record.is_active());
        assert!(record.last_used_at().is_none());
    }

    #[test]
    fn test_revoke_is_terminal() {
        let mut record = create_test_record(1, "abc123");

        record.revoke();
        assert!(!record.is_active());
        assert_eq!(record.status(), RecordStatus::Revoked);
    }

    #[test]
    fn test_set_roles_touches_updated_at() {
        let mut record = create_test_record(1, "abc123");
        let before = record.updated_at();

        record.set_roles(RoleSet::decode("admin"));

        assert!(record.roles().contains("admin"));
        assert!(!record.roles().contains("read"));
        assert!(record.updated_at() >= before);
    }

    #[test]
    fn test_set_api_key() {
        let mut record = create_test_record(1, "old-key");

        record.set_api_key("new-key");
        assert_eq!(record.api_key(), "new-key");
    }

    #[test]
    fn test_record_usage() {
        let mut record = create_test_record(1, "abc123");

        record.record_usage();
        assert!(record.last_used_at().is_some());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let record = create_test_record(1, "super-secret-key");
        let printed = format!("{record:?}");

        assert!(!printed.contains("super-secret-key"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_serde_packs_roles() {
        let record = create_test_record(7, "abc123");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["roles"], "read,write");
        assert_eq!(value["id"], 7);

        let back: ApiKeyRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.roles(), record.roles());
        assert_eq!(back.api_key(), record.api_key());
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(RecordId::new(42).to_string(), "42");
    }
}
