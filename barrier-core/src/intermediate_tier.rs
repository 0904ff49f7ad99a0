//! The intermediate tier: mirrors [`crate::RootTier`] but wraps under a
//! root key instead of an unseal key, and bootstraps itself by asking the
//! root tier to wrap its first key.

use std::sync::Arc;

use barrier_crypto::Crypto;
use barrier_store::{IntermediateKeyRow, StoreError, Txn};

use crate::error::BarrierError;
use crate::material::symmetric_key_from_unwrapped;
use crate::root_tier::RootTier;
use crate::time::now_ms;

pub struct IntermediateTier {
    crypto: Arc<dyn Crypto>,
    root: Arc<RootTier>,
}

impl IntermediateTier {
    pub fn new(crypto: Arc<dyn Crypto>, root: Arc<RootTier>) -> Self {
        Self { crypto, root }
    }

    /// No-op if a latest intermediate key already exists.
    pub fn bootstrap(&self, txn: &mut dyn Txn) -> Result<(), BarrierError> {
        match txn.get_intermediate_latest() {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) => {
                let key = self.crypto.generate_wrap_key()?;
                let (wrapped, root_id) = self.root.wrap(txn, key.as_bytes())?;
                let now = now_ms();
                txn.add_intermediate(IntermediateKeyRow {
                    id: key.id(),
                    wrapped,
                    parent_id: root_id,
                    created_at_ms: now,
                    updated_at_ms: now,
                })?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn wrap(&self, txn: &mut dyn Txn, child_key: &[u8]) -> Result<(Vec<u8>, barrier_crypto::KeyId), BarrierError> {
        let row = txn.get_intermediate_latest().map_err(|e| match e {
            StoreError::NotFound => BarrierError::Inconsistent("no intermediate key present".into()),
            other => other.into(),
        })?;
        let intermediate_bytes = self.root.unwrap(txn, &row.wrapped)?;
        let intermediate_key = symmetric_key_from_unwrapped(row.id, intermediate_bytes)?;
        let wrapped = self.crypto.wrap(&intermediate_key, child_key)?;
        Ok((wrapped, row.id))
    }

    pub fn unwrap(&self, txn: &mut dyn Txn, wrapped_bytes: &[u8]) -> Result<Vec<u8>, BarrierError> {
        let intermediate_id = self.crypto.parse_kid(wrapped_bytes)?;
        let row = txn.get_intermediate(intermediate_id).map_err(|e| match e {
            StoreError::NotFound => {
                BarrierError::Inconsistent(format!("intermediate key {} referenced but missing", intermediate_id))
            }
            other => other.into(),
        })?;
        let intermediate_bytes = self.root.unwrap(txn, &row.wrapped)?;
        let intermediate_key = symmetric_key_from_unwrapped(row.id, intermediate_bytes)?;
        self.crypto
            .unwrap(&intermediate_key, wrapped_bytes)
            .map_err(BarrierError::from)
    }
}
