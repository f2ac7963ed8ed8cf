//! Shared secrets and constant-time comparison.
//!
//! Both sides of a comparison are hashed with SHA-256 before the bytes are
//! compared, so neither the length nor the matching prefix of the expected
//! value leaks through timing.

use std::fmt;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare two secrets without short-circuiting on the first differing byte.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    expected.as_slice().ct_eq(presented.as_slice()).into()
}

/// Shared secret that authenticates revalidation webhooks.
#[derive(Clone, PartialEq, Eq)]
pub struct RevalidationSecret(String);

impl RevalidationSecret {
    /// Strips trailing line terminators left by secret files and env
    /// exports. Other whitespace is part of the secret. Returns `None` for a
    /// blank value.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let secret = value.trim_end_matches(['\r', '\n']);
        (!secret.trim().is_empty()).then(|| Self(secret.to_string()))
    }

    pub fn verify(&self, presented: &str) -> bool {
        secrets_match(&self.0, presented)
    }
}

impl fmt::Debug for RevalidationSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RevalidationSecret(<redacted>)")
    }
}
