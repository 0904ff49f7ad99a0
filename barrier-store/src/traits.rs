//! The transactional persistence boundary.
//!
//! `Store::with_txn` is deliberately generic over its return type, so it
//! cannot be boxed as `dyn Store` — callers (the tiers in `barrier-core`)
//! are generic over `S: Store` instead, the same shape as
//! `diesel::Connection::transaction` or `sqlx`'s closure-based
//! transactions. `Txn` itself has no generic methods and stays
//! object-safe, so a transaction is always passed around as `&mut dyn Txn`.

use barrier_crypto::KeyId;

use crate::error::StoreError;
use crate::rows::{ContentKeyRow, IntermediateKeyRow, RootKeyRow};

/// A transactional persistence backend for the three key tables.
///
/// Re-entering `with_txn` from within `op` is undefined behavior: callers
/// must not nest transactions.
pub trait Store: Send + Sync {
    /// Runs `op` inside a single ACID transaction. The transaction commits
    /// iff `op` returns `Ok`; any `Err` rolls it back atomically and no
    /// partial writes become observable.
    ///
    /// Generic over the error type, the same shape as
    /// `diesel::Connection::transaction` — callers above the store
    /// typically fail for reasons beyond a bare `StoreError` (bad crypto
    /// material, a closed facade, ...), so `op` returns whatever error type
    /// the caller needs as long as it can be built from a `StoreError`.
    fn with_txn<T, E>(&self, op: impl FnOnce(&mut dyn Txn) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>;
}

/// Operations available inside a single transaction.
///
/// Reads observe prior writes made earlier in the same transaction.
pub trait Txn {
    fn get_root_latest(&mut self) -> Result<RootKeyRow, StoreError>;
    fn get_intermediate_latest(&mut self) -> Result<IntermediateKeyRow, StoreError>;

    fn get_root(&mut self, id: KeyId) -> Result<RootKeyRow, StoreError>;
    fn get_intermediate(&mut self, id: KeyId) -> Result<IntermediateKeyRow, StoreError>;
    fn get_content(&mut self, id: KeyId) -> Result<ContentKeyRow, StoreError>;

    fn add_root(&mut self, row: RootKeyRow) -> Result<(), StoreError>;
    fn add_intermediate(&mut self, row: IntermediateKeyRow) -> Result<(), StoreError>;
    fn add_content(&mut self, row: ContentKeyRow) -> Result<(), StoreError>;
}
