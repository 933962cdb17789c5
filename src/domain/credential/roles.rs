//! Role set encoding and decoding
//!
//! Roles travel as a single delimiter-packed string at the storage boundary
//! but are always a proper set in memory.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Delimiter used by the packed storage encoding
pub const ROLE_DELIMITER: char = ',';

/// An ordered set of capability tags granted to a credential.
///
/// Decoding the packed form is total: segments are split on
/// [`ROLE_DELIMITER`], trimmed, and empty segments are discarded, so a
/// malformed stored value degrades to an empty set instead of failing the
/// lookup path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    /// Create an empty role set
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a packed role string. Never fails.
    pub fn decode(packed: &str) -> Self {
        packed.split(ROLE_DELIMITER).collect()
    }

    /// Encode the set into its packed storage form
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(&ROLE_DELIMITER.to_string())
    }

    /// Check membership of a role tag
    ///
    /// The candidate is trimmed first; a whitespace-only candidate never
    /// matches.
    pub fn contains(&self, role: &str) -> bool {
        let role = role.trim();
        !role.is_empty() && self.0.contains(role)
    }

    /// Add a role tag. Returns false if the tag is blank or already present.
    pub fn insert(&mut self, role: impl Into<String>) -> bool {
        let role = role.into();
        let role = role.trim();

        if role.is_empty() {
            return false;
        }

        self.0.insert(role.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over the tags in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl From<String> for RoleSet {
    fn from(packed: String) -> Self {
        Self::decode(&packed)
    }
}

impl From<RoleSet> for String {
    fn from(roles: RoleSet) -> Self {
        roles.encode()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
