//! The root tier: the top of the key hierarchy. Its own key is wrapped by
//! an externally supplied unseal key rather than by another tier.

use std::sync::Arc;

use barrier_crypto::Crypto;
use barrier_store::{RootKeyRow, StoreError, Txn};
use barrier_unseal::UnsealProvider;

use crate::error::BarrierError;
use crate::material::symmetric_key_from_unwrapped;
use crate::time::now_ms;

/// Operates purely on whatever `&mut dyn Txn` its caller hands it — the
/// store handle itself lives one level up, on `Barrier`/`Rotator`, which
/// open the transaction this tier runs inside.
pub struct RootTier {
    crypto: Arc<dyn Crypto>,
    unseal: Arc<dyn UnsealProvider>,
}

impl RootTier {
    pub fn new(crypto: Arc<dyn Crypto>, unseal: Arc<dyn UnsealProvider>) -> Self {
        Self { crypto, unseal }
    }

    /// The only implicit write the core performs outside of rotation: if
    /// no root key exists yet, mint one and wrap it under the unseal
    /// provider. A no-op if a root key is already present.
    pub fn bootstrap(&self, txn: &mut dyn Txn) -> Result<(), BarrierError> {
        match txn.get_root_latest() {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) => {
                let key = self.crypto.generate_wrap_key()?;
                let wrapped = self.unseal.encrypt(key.as_bytes())?;
                let now = now_ms();
                txn.add_root(RootKeyRow {
                    id: key.id(),
                    wrapped,
                    parent_id: None,
                    created_at_ms: now,
                    updated_at_ms: now,
                })?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Wraps `child_key` under the latest root key, returning the wrapped
    /// bytes and the root id the caller should record as parent linkage.
    pub fn wrap(&self, txn: &mut dyn Txn, child_key: &[u8]) -> Result<(Vec<u8>, barrier_crypto::KeyId), BarrierError> {
        let row = txn.get_root_latest().map_err(|e| match e {
            StoreError::NotFound => BarrierError::Inconsistent("no root key present".into()),
            other => other.into(),
        })?;
        let root_bytes = self.unseal.decrypt(&row.wrapped)?;
        let root_key = symmetric_key_from_unwrapped(row.id, root_bytes)?;
        let wrapped = self.crypto.wrap(&root_key, child_key)?;
        Ok((wrapped, row.id))
    }

    /// Unwraps `wrapped_bytes` (produced by [`Self::wrap`]) back to the
    /// child key's raw bytes, locating the root key by the `kid` embedded
    /// in `wrapped_bytes` rather than by "latest" — so ciphertexts wrapped
    /// under an old root key remain decryptable after rotation.
    pub fn unwrap(&self, txn: &mut dyn Txn, wrapped_bytes: &[u8]) -> Result<Vec<u8>, BarrierError> {
        let root_id = self.crypto.parse_kid(wrapped_bytes)?;
        let row = txn.get_root(root_id).map_err(|e| match e {
            StoreError::NotFound => BarrierError::Inconsistent(format!("root key {} referenced but missing", root_id)),
            other => other.into(),
        })?;
        let root_bytes = self.unseal.decrypt(&row.wrapped)?;
        let root_key = symmetric_key_from_unwrapped(row.id, root_bytes)?;
        self.crypto.unwrap(&root_key, wrapped_bytes).map_err(BarrierError::from)
    }
}
