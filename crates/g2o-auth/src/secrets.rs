//! Nonce/secret lookup.
//!
//! This module defines the [`SecretProvider`] trait used by the validator to
//! resolve the shared secret for the nonce named in a data header, and the
//! [`NonceSecretTable`] implementation built once at startup.
//!
//! Several nonces may be configured at the same time so that secrets can be
//! rotated without rejecting requests signed with the previous one.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::G2oError;

/// Trait for looking up the shared secret for a nonce.
pub trait SecretProvider: Send + Sync + fmt::Debug {
    /// Return the secret configured for `nonce`, if any.
    fn secret_for(&self, nonce: &str) -> Option<&str>;
}

/// An immutable mapping from nonce to shared secret.
///
/// Keys are case-sensitive. The table is never empty and is never mutated
/// after construction, so it can be shared freely between threads.
///
/// # Examples
///
/// ```
/// use g2o_auth::{NonceSecretTable, SecretProvider};
///
/// let table = NonceSecretTable::parse("v1:s3cr3tk3y, v2:n3wk3y").unwrap();
/// assert_eq!(table.secret_for("v2"), Some("n3wk3y"));
/// assert_eq!(table.secret_for("V2"), None);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct NonceSecretTable {
    secrets: HashMap<String, String>,
}

impl NonceSecretTable {
    /// Build a table from `(nonce, secret)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`G2oError::Configuration`] if no pairs are given.
    pub fn new(secrets: impl IntoIterator<Item = (String, String)>) -> Result<Self, G2oError> {
        let secrets: HashMap<String, String> = secrets.into_iter().collect();
        if secrets.is_empty() {
            return Err(G2oError::Configuration(
                "must specify at least one nonce".to_owned(),
            ));
        }
        Ok(Self { secrets })
    }

    /// Build a table from the compact `"key1:secret1,key2:secret2"` form.
    ///
    /// Entries are trimmed. Trailing empty `:`-separated parts are ignored,
    /// then an entry that does not split into exactly a nonce and a secret
    /// is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`G2oError::Configuration`] if no valid entry remains.
    pub fn parse(encoded: &str) -> Result<Self, G2oError> {
        let mut secrets = HashMap::new();
        for (index, entry) in encoded.split(',').enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let mut parts: Vec<&str> = entry.split(':').collect();
            while parts.last().is_some_and(|part| part.is_empty()) {
                parts.pop();
            }
            match parts.as_slice() {
                [nonce, secret] => {
                    secrets.insert(nonce.trim().to_owned(), secret.trim().to_owned());
                }
                _ => {
                    // Never log the entry itself, it may contain a secret.
                    warn!(entry = index, "skipping malformed nonce/secret entry");
                }
            }
        }
        Self::new(secrets)
    }

    /// Number of configured nonces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Always `false`; kept for API symmetry with [`len`](Self::len).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Iterate over the configured nonces.
    pub fn nonces(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }
}

impl SecretProvider for NonceSecretTable {
    fn secret_for(&self, nonce: &str) -> Option<&str> {
        self.secrets.get(nonce).map(String::as_str)
    }
}

impl FromStr for NonceSecretTable {
    type Err = G2oError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for NonceSecretTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nonces: Vec<&str> = self.nonces().collect();
        nonces.sort_unstable();
        f.debug_struct("NonceSecretTable")
            .field("nonces", &nonces)
            .finish_non_exhaustive()
    }
}
