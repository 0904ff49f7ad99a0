//! An in-memory `Store`, mainly useful for tests and single-process
//! deployments that don't need durability across restarts.
//!
//! A transaction is implemented by cloning the current tables into a
//! staging area, running `op` against the staging copy, and only
//! publishing it back on success. This gives the same all-or-nothing
//! semantics a real transaction would without needing a write-ahead log.

use std::collections::BTreeMap;
use std::sync::Mutex;

use barrier_crypto::KeyId;

use crate::error::StoreError;
use crate::rows::{ContentKeyRow, IntermediateKeyRow, RootKeyRow};
use crate::traits::{Store, Txn};

#[derive(Clone, Default)]
struct Tables {
    roots: BTreeMap<KeyId, RootKeyRow>,
    intermediates: BTreeMap<KeyId, IntermediateKeyRow>,
    contents: BTreeMap<KeyId, ContentKeyRow>,
}

/// `Store` backed by in-process `BTreeMap`s, one Mutex deep.
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    fn with_txn<T, E>(&self, op: impl FnOnce(&mut dyn Txn) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let mut staging = guard.clone();
        let mut txn = InMemoryTxn { tables: &mut staging };
        let result = op(&mut txn);
        if result.is_ok() {
            *guard = staging;
        }
        result
    }
}

struct InMemoryTxn<'a> {
    tables: &'a mut Tables,
}

impl<'a> Txn for InMemoryTxn<'a> {
    fn get_root_latest(&mut self) -> Result<RootKeyRow, StoreError> {
        self.tables
            .roots
            .values()
            .next_back()
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_intermediate_latest(&mut self) -> Result<IntermediateKeyRow, StoreError> {
        self.tables
            .intermediates
            .values()
            .next_back()
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_root(&mut self, id: KeyId) -> Result<RootKeyRow, StoreError> {
        self.tables.roots.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn get_intermediate(&mut self, id: KeyId) -> Result<IntermediateKeyRow, StoreError> {
        self.tables
            .intermediates
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_content(&mut self, id: KeyId) -> Result<ContentKeyRow, StoreError> {
        self.tables.contents.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    fn add_root(&mut self, row: RootKeyRow) -> Result<(), StoreError> {
        if row.wrapped.is_empty() {
            return Err(StoreError::Invalid("wrapped must be non-empty".into()));
        }
        if self.tables.roots.contains_key(&row.id) {
            return Err(StoreError::Conflict(row.id));
        }
        self.tables.roots.insert(row.id, row);
        Ok(())
    }

    fn add_intermediate(&mut self, row: IntermediateKeyRow) -> Result<(), StoreError> {
        if row.wrapped.is_empty() {
            return Err(StoreError::Invalid("wrapped must be non-empty".into()));
        }
        if self.tables.intermediates.contains_key(&row.id) {
            return Err(StoreError::Conflict(row.id));
        }
        self.tables.intermediates.insert(row.id, row);
        Ok(())
    }

    fn add_content(&mut self, row: ContentKeyRow) -> Result<(), StoreError> {
        if row.wrapped.is_empty() {
            return Err(StoreError::Invalid("wrapped must be non-empty".into()));
        }
        if self.tables.contents.contains_key(&row.id) {
            return Err(StoreError::Conflict(row.id));
        }
        self.tables.contents.insert(row.id, row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: KeyId, parent: Option<KeyId>) -> RootKeyRow {
        RootKeyRow {
            id,
            wrapped: vec![1, 2, 3],
            parent_id: parent,
            created_at_ms: 1,
            updated_at_ms: 1,
        }
    }

    #[test]
    fn latest_is_newest_inserted() {
        let store = InMemoryStore::new();
        let first = KeyId::generate();
        let second = KeyId::generate();
        store
            .with_txn(|txn| {
                txn.add_root(row(first, None))?;
                txn.add_root(row(second, None))
            })
            .unwrap();

        let latest = store.with_txn(|txn| txn.get_root_latest()).unwrap();
        assert_eq!(latest.id, second);
    }

    #[test]
    fn duplicate_insert_conflicts_and_rolls_back() {
        let store = InMemoryStore::new();
        let id = KeyId::generate();
        store.with_txn(|txn| txn.add_root(row(id, None))).unwrap();

        let err = store
            .with_txn(|txn| txn.add_root(row(id, None)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(conflicting) if conflicting == id));
    }

    #[test]
    fn failed_transaction_leaves_no_partial_writes() {
        let store = InMemoryStore::new();
        let first = KeyId::generate();
        let second = KeyId::generate();

        let result = store.with_txn(|txn| -> Result<(), StoreError> {
            txn.add_root(row(first, None))?;
            txn.add_root(row(second, None))?;
            Err(StoreError::Invalid("forced rollback".into()))
        });
        assert!(result.is_err());

        let err = store.with_txn(|txn| txn.get_root(first)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn get_missing_row_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.with_txn(|txn| txn.get_root(KeyId::generate())).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
