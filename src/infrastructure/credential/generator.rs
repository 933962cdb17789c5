//! API key generation
//!
//! Mints cryptographically random bearer keys for provisioning and
//! rotation.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::domain::credential::MAX_API_KEY_LEN;

/// Generator for opaque API keys
///
/// Keys are `<prefix><base64 random bytes>`, always within the 50-byte
/// storage bound.
#[derive(Debug, Clone)]
pub struct ApiKeyGenerator {
    /// Prefix for all generated keys (e.g. "ak_live_", "ak_test_")
    prefix: String,
    /// Number of random bytes behind the prefix
    key_bytes: usize,
}

impl ApiKeyGenerator {
    /// Create a new generator with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key_bytes: 24,
        }
    }

    /// Generator for production keys
    pub fn production() -> Self {
        Self::new("ak_live_")
    }

    /// Generator for test keys
    pub fn test() -> Self {
        Self::new("ak_test_")
    }

    /// Set the number of random bytes
    pub fn with_key_bytes(mut self, bytes: usize) -> Self {
        self.key_bytes = bytes;
        self
    }

    /// Generate a fresh key, truncated to the storage bound if oversized
    pub fn generate(&self) -> String {
        let mut random_bytes = vec![0u8; self.key_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let encoded = URL_SAFE_NO_PAD.encode(&random_bytes);
        let mut key = format!("{}{}", self.prefix, encoded);
        key.truncate(MAX_API_KEY_LEN);

        key
    }
}

impl Default for ApiKeyGenerator {
    fn default() -> Self {
        Self::production()
    }
}
