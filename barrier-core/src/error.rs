//! The barrier's error taxonomy. Every core operation (tiers, the facade,
//! the rotator) returns `Result<_, BarrierError>`.

use std::fmt;

use barrier_crypto::CryptoError;
use barrier_store::StoreError;
use barrier_unseal::UnsealError;

#[derive(Debug)]
pub enum BarrierError {
    /// Caller-supplied argument violates a precondition (empty plaintext,
    /// empty key material, ...).
    Invalid(String),
    /// A rotation `reason` fails its length constraint.
    Validation(String),
    /// The datastore lacks a row the core needs (e.g. no root key at
    /// rotation time). Indicates operator intervention.
    Inconsistent(String),
    /// A decrypt operation's referenced content key does not exist.
    /// Distinguishable from `MalformedCiphertext`.
    KeyGone,
    /// A JWE failed to parse, its `kid` was missing/malformed, or AEAD tag
    /// verification failed.
    MalformedCiphertext(String),
    /// The unseal provider rejected a wrapped root key.
    Unsealable(String),
    /// Insert of a row with an already-existing id.
    Conflict(String),
    /// Operation attempted after `Barrier::shutdown`.
    Closed,
    /// The surrounding context was cancelled during a transaction.
    Cancelled,
}

impl fmt::Display for BarrierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid argument: {}", msg),
            Self::Validation(msg) => write!(f, "validation failed: {}", msg),
            Self::Inconsistent(msg) => write!(f, "inconsistent store state: {}", msg),
            Self::KeyGone => write!(f, "referenced content key no longer exists"),
            Self::MalformedCiphertext(msg) => write!(f, "malformed ciphertext: {}", msg),
            Self::Unsealable(msg) => write!(f, "unseal failed: {}", msg),
            Self::Conflict(msg) => write!(f, "conflict: {}", msg),
            Self::Closed => write!(f, "barrier is closed"),
            Self::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for BarrierError {}

/// Default mapping for store failures. `NotFound` defaults to
/// `Inconsistent`; tier methods that can distinguish a more specific
/// meaning (e.g. `KeyGone` for a missing content row) match on the
/// `StoreError` explicitly instead of relying on this conversion.
impl From<StoreError> for BarrierError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => BarrierError::Inconsistent("expected row not found".into()),
            StoreError::Conflict(id) => BarrierError::Conflict(format!("duplicate id {}", id)),
            StoreError::Invalid(msg) => BarrierError::Invalid(msg),
            StoreError::Cancelled => BarrierError::Cancelled,
            StoreError::Backend(msg) => BarrierError::Inconsistent(format!("store backend: {}", msg)),
        }
    }
}

impl From<CryptoError> for BarrierError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Invalid(msg) => BarrierError::Invalid(msg),
            CryptoError::MalformedCiphertext(msg) => BarrierError::MalformedCiphertext(msg),
            CryptoError::BadKey(msg) => BarrierError::Unsealable(msg),
        }
    }
}

impl From<UnsealError> for BarrierError {
    fn from(e: UnsealError) -> Self {
        match e {
            UnsealError::Invalid(msg) => BarrierError::Invalid(msg),
            UnsealError::BadKey(msg) => BarrierError::Unsealable(msg),
        }
    }
}
