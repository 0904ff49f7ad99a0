//! The unseal key provider contract.
//!
//! An `UnsealProvider` holds a non-empty, ordered set of unseal keys.
//! `encrypt` always wraps under the first (primary) key; `decrypt` tries
//! every key in order and returns the first that opens the ciphertext.
//! This indirection is what lets an operator roll the unseal key without
//! having to re-wrap every persisted root row: the old key simply moves to
//! a non-primary position until the last root row wrapped under it is
//! gone.

pub trait UnsealProvider: Send + Sync {
    /// Wraps `cleartext` (a root key's raw bytes) under the primary unseal
    /// key.
    fn encrypt(&self, cleartext: &[u8]) -> Result<Vec<u8>, crate::error::UnsealError>;

    /// Attempts to unwrap `wrapped` with each configured key in order,
    /// returning the cleartext from the first that succeeds.
    fn decrypt(&self, wrapped: &[u8]) -> Result<Vec<u8>, crate::error::UnsealError>;
}

/// An `UnsealProvider` backed by a fixed, in-process set of AES-256 keys,
/// each wrapped/unwrapped as `alg=A256KW`/`enc=A256GCM` JWEs.
///
/// Suitable for tests and for deployments that inject unseal keys via
/// configuration rather than an HSM/KMS. A production deployment would
/// implement this trait against its own key-management service instead.
pub struct StaticUnsealProvider {
    /// Ordered `(id, key)` pairs; index 0 is primary.
    keys: Vec<(String, [u8; 32])>,
}

impl StaticUnsealProvider {
    /// Builds a provider from an ordered, non-empty key set. The first
    /// entry is the primary key used for `encrypt`.
    pub fn new(keys: Vec<([u8; 32], String)>) -> Result<Self, crate::error::UnsealError> {
        if keys.is_empty() {
            return Err(crate::error::UnsealError::Invalid(
                "unseal key set must be non-empty".into(),
            ));
        }
        Ok(Self {
            keys: keys.into_iter().map(|(key, id)| (id, key)).collect(),
        })
    }

    /// Convenience constructor for a single-key deployment.
    pub fn single(id: impl Into<String>, key: [u8; 32]) -> Self {
        Self {
            keys: vec![(id.into(), key)],
        }
    }
}

impl UnsealProvider for StaticUnsealProvider {
    fn encrypt(&self, cleartext: &[u8]) -> Result<Vec<u8>, crate::error::UnsealError> {
        if cleartext.is_empty() {
            return Err(crate::error::UnsealError::Invalid("cleartext must be non-empty".into()));
        }
        let (id, key) = &self.keys[0];
        barrier_crypto::a256kw_wrap(id, key, cleartext)
            .map_err(|e| crate::error::UnsealError::Invalid(e.to_string()))
    }

    fn decrypt(&self, wrapped: &[u8]) -> Result<Vec<u8>, crate::error::UnsealError> {
        for (_id, key) in &self.keys {
            if let Ok(cleartext) = barrier_crypto::a256kw_unwrap(key, wrapped) {
                return Ok(cleartext);
            }
        }
        Err(crate::error::UnsealError::BadKey(
            "no configured unseal key could open the wrapped root key".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_roundtrips() {
        let provider = StaticUnsealProvider::single("k1", [1u8; 32]);
        let wrapped = provider.encrypt(b"root key material").unwrap();
        let opened = provider.decrypt(&wrapped).unwrap();
        assert_eq!(opened, b"root key material");
    }

    #[test]
    fn decrypt_tries_non_primary_keys() {
        let provider =
            StaticUnsealProvider::new(vec![([1u8; 32], "new".into()), ([2u8; 32], "old".into())]).unwrap();

        // Wrapped under the old key, which is no longer primary.
        let wrapped = barrier_crypto::a256kw_wrap("old", &[2u8; 32], b"legacy root").unwrap();
        let opened = provider.decrypt(&wrapped).unwrap();
        assert_eq!(opened, b"legacy root");
    }

    #[test]
    fn decrypt_fails_when_no_key_matches() {
        let provider = StaticUnsealProvider::single("k1", [1u8; 32]);
        let wrapped = barrier_crypto::a256kw_wrap("other", &[9u8; 32], b"root key material").unwrap();
        assert!(provider.decrypt(&wrapped).is_err());
    }

    #[test]
    fn empty_key_set_is_rejected() {
        assert!(StaticUnsealProvider::new(vec![]).is_err());
    }

    #[test]
    fn empty_cleartext_is_rejected() {
        let provider = StaticUnsealProvider::single("k1", [1u8; 32]);
        assert!(provider.encrypt(b"").is_err());
    }
}
