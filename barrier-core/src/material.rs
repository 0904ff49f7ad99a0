use barrier_crypto::{KeyId, SymmetricKey};

use crate::error::BarrierError;

/// Rebuilds a [`SymmetricKey`] from raw bytes unwrapped out of storage,
/// rejecting anything that isn't a 32-byte AES-256 key.
pub(crate) fn symmetric_key_from_unwrapped(id: KeyId, bytes: Vec<u8>) -> Result<SymmetricKey, BarrierError> {
    let bytes: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
        BarrierError::MalformedCiphertext(format!("unwrapped key material is {} bytes, want 32", bytes.len()))
    })?;
    Ok(SymmetricKey::from_bytes(id, bytes))
}
