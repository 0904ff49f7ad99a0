//! The content tier: per-operation content-key generation, payload
//! sealing, and persistence of the wrapped content key.

use std::sync::Arc;

use barrier_crypto::{Crypto, KeyId};
use barrier_store::{ContentKeyRow, StoreError, Txn};

use crate::error::BarrierError;
use crate::intermediate_tier::IntermediateTier;
use crate::material::symmetric_key_from_unwrapped;
use crate::time::now_ms;

pub struct ContentTier {
    crypto: Arc<dyn Crypto>,
    intermediate: Arc<IntermediateTier>,
}

impl ContentTier {
    pub fn new(crypto: Arc<dyn Crypto>, intermediate: Arc<IntermediateTier>) -> Self {
        Self { crypto, intermediate }
    }

    /// Seals `plaintext` under a fresh, never-reused content key, wraps
    /// that key under the latest intermediate key, and persists the
    /// wrapped content key row. Returns the JWE and the content key's id
    /// (also embedded as the JWE's `kid`).
    pub fn seal(&self, txn: &mut dyn Txn, plaintext: &[u8]) -> Result<(Vec<u8>, KeyId), BarrierError> {
        if plaintext.is_empty() {
            return Err(BarrierError::Invalid("plaintext must be non-empty".into()));
        }

        let content_key = self.crypto.generate_content_key()?;
        let jwe = self.crypto.seal(&content_key, plaintext)?;
        let (wrapped, intermediate_id) = self.intermediate.wrap(txn, content_key.as_bytes())?;

        let now = now_ms();
        txn.add_content(ContentKeyRow {
            id: content_key.id(),
            wrapped,
            parent_id: intermediate_id,
            created_at_ms: now,
            updated_at_ms: now,
        })?;

        Ok((jwe, content_key.id()))
    }

    /// Opens a JWE produced by [`Self::seal`], looking up the content key
    /// by the `kid` embedded in `jwe_bytes`.
    pub fn open(&self, txn: &mut dyn Txn, jwe_bytes: &[u8]) -> Result<Vec<u8>, BarrierError> {
        let content_id = self.crypto.parse_kid(jwe_bytes)?;
        let row = txn.get_content(content_id).map_err(|e| match e {
            StoreError::NotFound => BarrierError::KeyGone,
            other => other.into(),
        })?;
        let content_bytes = self.intermediate.unwrap(txn, &row.wrapped)?;
        let content_key = symmetric_key_from_unwrapped(content_id, content_bytes)?;
        self.crypto.open(&content_key, jwe_bytes).map_err(BarrierError::from)
    }
}
