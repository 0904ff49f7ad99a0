//! Symmetric key material.
//!
//! Every tier's secret is a 32-byte AES-256 key. We never let the bytes
//! outlive their [`SymmetricKey`] wrapper: the key zeroizes on drop, and
//! `Debug` never prints the bytes.

use getrandom::getrandom;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::ids::KeyId;

/// An AES-256 key plus the [`KeyId`] under which it is addressed.
#[derive(ZeroizeOnDrop)]
pub struct SymmetricKey {
    #[zeroize(skip)]
    id: KeyId,
    bytes: [u8; 32],
}

impl SymmetricKey {
    /// Generates a fresh key from the OS CSPRNG, tagged with a fresh id.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; 32];
        getrandom(&mut bytes).map_err(|e| CryptoError::Invalid(format!("rng failure: {}", e)))?;
        Ok(Self {
            id: KeyId::generate(),
            bytes,
        })
    }

    /// Reconstructs a key previously produced by [`Self::generate`], e.g.
    /// after unwrapping it from storage.
    pub fn from_bytes(id: KeyId, bytes: [u8; 32]) -> Self {
        Self { id, bytes }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("id", &self.id)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_distinct_ids_and_bytes() {
        let a = SymmetricKey::generate().unwrap();
        let b = SymmetricKey::generate().unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn from_bytes_preserves_id_and_material() {
        let id = KeyId::generate();
        let key = SymmetricKey::from_bytes(id, [7u8; 32]);
        assert_eq!(key.id(), id);
        assert_eq!(key.as_bytes(), &[7u8; 32]);
    }
}
