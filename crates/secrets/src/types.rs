//! Secure secret types with automatic memory zeroing
//!
//! - [`SecureSecret`]: A wrapper around `secrecy::SecretString` that auto-zeros on drop
//! - [`SecretVersion`]: The key/value payload returned by a versioned read

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// A secret value (resolved secret, session token, password) with automatic
/// memory zeroing on drop.
///
/// - Secret values are zeroed from memory when dropped
/// - Debug output shows `[REDACTED]` instead of the actual value
/// - Explicit `.expose()` call required to access the value
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Create a new secure secret from a string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Expose the secret value for use.
    ///
    /// The caller must ensure the exposed value is not logged or persisted.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Get the length of the secret value without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Check if the secret value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecureSecret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Result of a versioned read: key name to string value, plus the version
/// number when the backend reports one.
#[derive(Clone, Default)]
pub struct SecretVersion {
    data: HashMap<String, String>,
    version: Option<u64>,
}

impl SecretVersion {
    /// Wrap the data returned by a read
    #[must_use]
    pub fn new(data: HashMap<String, String>) -> Self {
        Self {
            data,
            version: None,
        }
    }

    /// Record the backend-assigned version
    #[must_use]
    pub const fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Look up a single key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Remove a single key, moving its value into secure storage
    #[must_use]
    pub fn take(&mut self, key: &str) -> Option<SecureSecret> {
        self.data.remove(key).map(SecureSecret::new)
    }

    /// Backend-assigned version, if reported
    #[must_use]
    pub const fn version(&self) -> Option<u64> {
        self.version
    }

    /// Iterate over key names (values stay hidden)
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Number of keys in the secret
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the secret has no keys
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for SecretVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.data.keys().collect();
        keys.sort();
        f.debug_struct("SecretVersion")
            .field("keys", &keys)
            .field("version", &self.version)
            .finish()
    }
}
