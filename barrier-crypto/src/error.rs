//! Error types for JOSE/JWE primitives.

use std::fmt;

/// Failure modes surfaced by the [`crate::Crypto`] contract.
///
/// These map directly onto the `MalformedCiphertext`/`Invalid`/`Unsealable`
/// kinds of the barrier's own error taxonomy; `barrier-core` converts them
/// with `From`.
#[derive(Debug)]
pub enum CryptoError {
    /// Caller-supplied argument violates a precondition (empty plaintext,
    /// wrong key length, ...).
    Invalid(String),
    /// A JWE failed to parse, its `kid` was missing/malformed, or AEAD tag
    /// verification failed.
    MalformedCiphertext(String),
    /// A wrapping/unsealing key was rejected.
    BadKey(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid argument: {}", msg),
            Self::MalformedCiphertext(msg) => write!(f, "malformed ciphertext: {}", msg),
            Self::BadKey(msg) => write!(f, "bad key: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}
