//! The public facade: `encrypt`, `decrypt`, `shutdown`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use barrier_crypto::Crypto;
use barrier_store::Store;
use barrier_unseal::UnsealProvider;

use crate::audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
use crate::content_tier::ContentTier;
use crate::error::BarrierError;
use crate::intermediate_tier::IntermediateTier;
use crate::root_tier::RootTier;
use crate::rotator::Rotator;

/// The barrier facade. Holds exclusive ownership of the three tiers and
/// releases them on [`Self::shutdown`].
///
/// Constructing a `Barrier` bootstraps the root and intermediate tiers in
/// a single transaction (generating their first keys if none exist yet);
/// constructing a second `Barrier` over the same store is a no-op there.
pub struct Barrier<S: Store> {
    store: Arc<S>,
    content: ContentTier,
    root: Arc<RootTier>,
    intermediate: Arc<IntermediateTier>,
    crypto: Arc<dyn Crypto>,
    unseal: Arc<dyn UnsealProvider>,
    closed: AtomicBool,
    audit: Arc<dyn AuditSink>,
}

impl<S: Store> Barrier<S> {
    /// Builds a barrier over `store`, logging bootstrap and every
    /// encrypt/decrypt/rotate/shutdown event via `tracing`.
    pub fn new(store: Arc<S>, crypto: Arc<dyn Crypto>, unseal: Arc<dyn UnsealProvider>) -> Result<Self, BarrierError> {
        Self::with_audit_sink(store, crypto, unseal, Arc::new(TracingAuditSink::new()))
    }

    /// Builds a barrier with a caller-supplied audit sink, e.g. an
    /// in-memory one for tests that want to assert on what happened.
    pub fn with_audit_sink(
        store: Arc<S>,
        crypto: Arc<dyn Crypto>,
        unseal: Arc<dyn UnsealProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, BarrierError> {
        let root = Arc::new(RootTier::new(crypto.clone(), unseal.clone()));
        let intermediate = Arc::new(IntermediateTier::new(crypto.clone(), root.clone()));

        let root_for_txn = root.clone();
        let intermediate_for_txn = intermediate.clone();
        store.with_txn(|txn| -> Result<(), BarrierError> {
            root_for_txn.bootstrap(txn)?;
            intermediate_for_txn.bootstrap(txn)
        })?;

        let content = ContentTier::new(crypto.clone(), intermediate.clone());
        audit.record(AuditEvent::new(AuditAction::BarrierBootstrapped));

        Ok(Self {
            store,
            content,
            root,
            intermediate,
            crypto,
            unseal,
            closed: AtomicBool::new(false),
            audit,
        })
    }

    /// Whether [`Self::shutdown`] has already run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Builds a [`Rotator`] sharing this barrier's store, crypto, unseal
    /// provider, and tiers.
    pub fn rotator(&self) -> Rotator<S> {
        Rotator::new(
            self.store.clone(),
            self.crypto.clone(),
            self.unseal.clone(),
            self.root.clone(),
            self.intermediate.clone(),
            self.audit.clone(),
        )
    }

    /// Seals `plaintext` and returns a compact JWE. Fails with
    /// [`BarrierError::Closed`] after [`Self::shutdown`].
    pub async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, BarrierError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BarrierError::Closed);
        }

        let content = &self.content;
        let result = self.store.with_txn(|txn| content.seal(txn, plaintext));
        match &result {
            Ok((_, content_id)) => self.audit.record(AuditEvent::new(AuditAction::Encrypted {
                content_id: *content_id,
            })),
            Err(e) => self.audit.record(AuditEvent::new(AuditAction::OperationFailed {
                detail: e.to_string(),
            })),
        }
        result.map(|(jwe, _content_id)| jwe)
    }

    /// Opens a JWE produced by [`Self::encrypt`]. Fails with
    /// [`BarrierError::Closed`] after [`Self::shutdown`].
    pub async fn decrypt(&self, jwe_bytes: &[u8]) -> Result<Vec<u8>, BarrierError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BarrierError::Closed);
        }

        let content = &self.content;
        let result = self.store.with_txn(|txn| content.open(txn, jwe_bytes));
        if let Err(e) = &result {
            self.audit.record(AuditEvent::new(AuditAction::OperationFailed {
                detail: e.to_string(),
            }));
        }
        result
    }

    /// Marks the barrier closed. Idempotent across arbitrary thread
    /// interleavings: the flag is a single atomic store, so a second call
    /// (concurrent or sequential) observes no error and changes nothing
    /// further. Operations already past the `closed` check when this runs
    /// complete normally; every operation that checks afterward fails with
    /// [`BarrierError::Closed`].
    pub async fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.audit.record(AuditEvent::new(AuditAction::Shutdown));
        }
    }
}
