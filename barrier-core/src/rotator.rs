//! Rotation of the root, intermediate, and content tiers. Every rotation
//! leaves all previously issued ciphertexts decryptable: old rows are
//! never touched, only new "latest" rows are inserted.

use std::sync::Arc;

use barrier_crypto::{Crypto, KeyId};
use barrier_store::{ContentKeyRow, IntermediateKeyRow, RootKeyRow, Store, StoreError};
use barrier_unseal::UnsealProvider;

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::error::BarrierError;
use crate::intermediate_tier::IntermediateTier;
use crate::root_tier::RootTier;
use crate::time::now_ms;

const MIN_REASON_LEN: usize = 10;
pub const DEFAULT_MAX_REASON_LEN: usize = 500;

/// The outcome of a single rotation call.
#[derive(Debug, Clone)]
pub struct RotationRecord {
    /// The row that was "latest" immediately before this rotation, if
    /// rotating that tier requires one to already exist. `rotate_content`
    /// always reports `None` here: it doesn't retire anything, it just
    /// adds a new content key baseline (`encrypt` always mints a fresh one
    /// regardless).
    pub old_id: Option<KeyId>,
    pub new_id: KeyId,
    pub rotated_at_ms: i64,
    pub reason: String,
}

pub struct Rotator<S: Store> {
    store: Arc<S>,
    crypto: Arc<dyn Crypto>,
    unseal: Arc<dyn UnsealProvider>,
    root: Arc<RootTier>,
    intermediate: Arc<IntermediateTier>,
    audit: Arc<dyn AuditSink>,
    max_reason_len: usize,
}

impl<S: Store> Rotator<S> {
    pub fn new(
        store: Arc<S>,
        crypto: Arc<dyn Crypto>,
        unseal: Arc<dyn UnsealProvider>,
        root: Arc<RootTier>,
        intermediate: Arc<IntermediateTier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            crypto,
            unseal,
            root,
            intermediate,
            audit,
            max_reason_len: DEFAULT_MAX_REASON_LEN,
        }
    }

    pub fn with_max_reason_len(mut self, max_reason_len: usize) -> Self {
        self.max_reason_len = max_reason_len;
        self
    }

    fn validate_reason(&self, reason: &str) -> Result<(), BarrierError> {
        let len = reason.chars().count();
        if len < MIN_REASON_LEN {
            return Err(BarrierError::Validation(format!(
                "rotation reason must be at least {} characters",
                MIN_REASON_LEN
            )));
        }
        if len > self.max_reason_len {
            return Err(BarrierError::Validation(format!(
                "rotation reason must be at most {} characters",
                self.max_reason_len
            )));
        }
        Ok(())
    }

    /// Generates a new root key, wraps it under the unseal provider, and
    /// inserts it as the new "latest" root row. Old intermediate rows
    /// still point at the old root id and remain decryptable, since
    /// `RootTier::unwrap` resolves by `kid`, never by "latest".
    pub fn rotate_root(&self, reason: &str) -> Result<RotationRecord, BarrierError> {
        self.validate_reason(reason)?;
        let crypto = &self.crypto;
        let unseal = &self.unseal;
        let result = self.store.with_txn(|txn| {
            let previous = txn.get_root_latest().map_err(|e| match e {
                StoreError::NotFound => BarrierError::Inconsistent("no root key present to rotate".into()),
                other => other.into(),
            })?;

            let new_key = crypto.generate_wrap_key()?;
            let wrapped = unseal.encrypt(new_key.as_bytes())?;
            let now = now_ms();
            txn.add_root(RootKeyRow {
                id: new_key.id(),
                wrapped,
                parent_id: None,
                created_at_ms: now,
                updated_at_ms: now,
            })?;

            Ok(RotationRecord {
                old_id: Some(previous.id),
                new_id: new_key.id(),
                rotated_at_ms: now,
                reason: reason.to_string(),
            })
        });
        if let Ok(record) = &result {
            self.audit.record(AuditEvent::new(AuditAction::RootRotated {
                old_id: record.old_id,
                new_id: record.new_id,
            }));
        }
        result
    }

    /// Generates a new intermediate key wrapped under the *current*
    /// latest root key, and inserts it as the new "latest" intermediate
    /// row.
    pub fn rotate_intermediate(&self, reason: &str) -> Result<RotationRecord, BarrierError> {
        self.validate_reason(reason)?;
        let crypto = &self.crypto;
        let root = &self.root;
        let result = self.store.with_txn(|txn| {
            let previous = txn.get_intermediate_latest().map_err(|e| match e {
                StoreError::NotFound => BarrierError::Inconsistent("no intermediate key present to rotate".into()),
                other => other.into(),
            })?;

            let new_key = crypto.generate_wrap_key()?;
            let (wrapped, root_id) = root.wrap(txn, new_key.as_bytes())?;
            let now = now_ms();
            txn.add_intermediate(IntermediateKeyRow {
                id: new_key.id(),
                wrapped,
                parent_id: root_id,
                created_at_ms: now,
                updated_at_ms: now,
            })?;

            Ok(RotationRecord {
                old_id: Some(previous.id),
                new_id: new_key.id(),
                rotated_at_ms: now,
                reason: reason.to_string(),
            })
        });
        if let Ok(record) = &result {
            self.audit.record(AuditEvent::new(AuditAction::IntermediateRotated {
                old_id: record.old_id,
                new_id: record.new_id,
            }));
        }
        result
    }

    /// Mints and persists a fresh content key wrapped under the latest
    /// intermediate key. `encrypt` always mints its own fresh content key
    /// regardless, so this is effectively a baseline wrapping check rather
    /// than a retirement of anything — `old_id` is always `None`.
    pub fn rotate_content(&self, reason: &str) -> Result<RotationRecord, BarrierError> {
        self.validate_reason(reason)?;
        let crypto = &self.crypto;
        let intermediate = &self.intermediate;
        let result = self.store.with_txn(|txn| {
            let new_key = crypto.generate_content_key()?;
            let (wrapped, intermediate_id) = intermediate.wrap(txn, new_key.as_bytes())?;
            let now = now_ms();
            txn.add_content(ContentKeyRow {
                id: new_key.id(),
                wrapped,
                parent_id: intermediate_id,
                created_at_ms: now,
                updated_at_ms: now,
            })?;

            Ok(RotationRecord {
                old_id: None,
                new_id: new_key.id(),
                rotated_at_ms: now,
                reason: reason.to_string(),
            })
        });
        if let Ok(record) = &result {
            self.audit.record(AuditEvent::new(AuditAction::ContentRotated { new_id: record.new_id }));
        }
        result
    }
}
