//! A `rusqlite`-backed `Store`, for deployments that want the key tables
//! durable on disk. Table shape matches the three-table design exactly:
//! one table per tier, `id` as primary key, `parent_id` nullable only on
//! `roots`.

use std::path::Path;
use std::sync::Mutex;

use barrier_crypto::KeyId;
use rusqlite::{Connection, OptionalExtension, Transaction};

use crate::error::StoreError;
use crate::rows::{ContentKeyRow, IntermediateKeyRow, RootKeyRow};
use crate::traits::{Store, Txn};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS roots (
    id TEXT PRIMARY KEY,
    wrapped BLOB NOT NULL,
    parent_id TEXT,
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS intermediates (
    id TEXT PRIMARY KEY,
    wrapped BLOB NOT NULL,
    parent_id TEXT NOT NULL REFERENCES roots(id),
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS contents (
    id TEXT PRIMARY KEY,
    wrapped BLOB NOT NULL,
    parent_id TEXT NOT NULL REFERENCES intermediates(id),
    created_at_ms INTEGER NOT NULL,
    updated_at_ms INTEGER NOT NULL
);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend_err)?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Store for SqliteStore {
    fn with_txn<T, E>(&self, op: impl FnOnce(&mut dyn Txn) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock().expect("store mutex poisoned");
        let tx = conn.transaction().map_err(|e| E::from(backend_err(e)))?;
        let mut txn = SqliteTxn { tx };
        match op(&mut txn) {
            Ok(value) => {
                txn.tx.commit().map_err(|e| E::from(backend_err(e)))?;
                Ok(value)
            }
            Err(e) => {
                let _ = txn.tx.rollback();
                Err(e)
            }
        }
    }
}

struct SqliteTxn<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> SqliteTxn<'conn> {
    fn insert(&self, table: &str, id: KeyId, wrapped: &[u8], parent_id: Option<KeyId>, now_ms: i64) -> Result<(), StoreError> {
        if wrapped.is_empty() {
            return Err(StoreError::Invalid("wrapped must be non-empty".into()));
        }
        let sql = format!(
            "INSERT INTO {table} (id, wrapped, parent_id, created_at_ms, updated_at_ms) VALUES (?1, ?2, ?3, ?4, ?4)"
        );
        let result = self.tx.execute(
            &sql,
            rusqlite::params![id.to_string(), wrapped, parent_id.map(|p| p.to_string()), now_ms],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict(id))
            }
            Err(e) => Err(backend_err(e)),
        }
    }
}

fn row_from_query(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(String, Vec<u8>, Option<String>, i64, i64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn parse_key_id(raw: &str) -> Result<KeyId, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Backend(format!("corrupt id in store: {:?}", raw)))
}

impl<'conn> Txn for SqliteTxn<'conn> {
    fn get_root_latest(&mut self) -> Result<RootKeyRow, StoreError> {
        let found = self
            .tx
            .query_row(
                "SELECT id, wrapped, parent_id, created_at_ms, updated_at_ms FROM roots ORDER BY id DESC LIMIT 1",
                [],
                row_from_query,
            )
            .optional()
            .map_err(backend_err)?;
        let (id, wrapped, _parent, created, updated) = found.ok_or(StoreError::NotFound)?;
        Ok(RootKeyRow {
            id: parse_key_id(&id)?,
            wrapped,
            parent_id: None,
            created_at_ms: created,
            updated_at_ms: updated,
        })
    }

    fn get_intermediate_latest(&mut self) -> Result<IntermediateKeyRow, StoreError> {
        let found = self
            .tx
            .query_row(
                "SELECT id, wrapped, parent_id, created_at_ms, updated_at_ms FROM intermediates ORDER BY id DESC LIMIT 1",
                [],
                row_from_query,
            )
            .optional()
            .map_err(backend_err)?;
        let (id, wrapped, parent, created, updated) = found.ok_or(StoreError::NotFound)?;
        let parent = parent.ok_or_else(|| StoreError::Backend("intermediate row missing parent_id".into()))?;
        Ok(IntermediateKeyRow {
            id: parse_key_id(&id)?,
            wrapped,
            parent_id: parse_key_id(&parent)?,
            created_at_ms: created,
            updated_at_ms: updated,
        })
    }

    fn get_root(&mut self, id: KeyId) -> Result<RootKeyRow, StoreError> {
        let found = self
            .tx
            .query_row(
                "SELECT id, wrapped, parent_id, created_at_ms, updated_at_ms FROM roots WHERE id = ?1",
                rusqlite::params![id.to_string()],
                row_from_query,
            )
            .optional()
            .map_err(backend_err)?;
        let (id, wrapped, _parent, created, updated) = found.ok_or(StoreError::NotFound)?;
        Ok(RootKeyRow {
            id: parse_key_id(&id)?,
            wrapped,
            parent_id: None,
            created_at_ms: created,
            updated_at_ms: updated,
        })
    }

    fn get_intermediate(&mut self, id: KeyId) -> Result<IntermediateKeyRow, StoreError> {
        let found = self
            .tx
            .query_row(
                "SELECT id, wrapped, parent_id, created_at_ms, updated_at_ms FROM intermediates WHERE id = ?1",
                rusqlite::params![id.to_string()],
                row_from_query,
            )
            .optional()
            .map_err(backend_err)?;
        let (id, wrapped, parent, created, updated) = found.ok_or(StoreError::NotFound)?;
        let parent = parent.ok_or_else(|| StoreError::Backend("intermediate row missing parent_id".into()))?;
        Ok(IntermediateKeyRow {
            id: parse_key_id(&id)?,
            wrapped,
            parent_id: parse_key_id(&parent)?,
            created_at_ms: created,
            updated_at_ms: updated,
        })
    }

    fn get_content(&mut self, id: KeyId) -> Result<ContentKeyRow, StoreError> {
        let found = self
            .tx
            .query_row(
                "SELECT id, wrapped, parent_id, created_at_ms, updated_at_ms FROM contents WHERE id = ?1",
                rusqlite::params![id.to_string()],
                row_from_query,
            )
            .optional()
            .map_err(backend_err)?;
        let (id, wrapped, parent, created, updated) = found.ok_or(StoreError::NotFound)?;
        let parent = parent.ok_or_else(|| StoreError::Backend("content row missing parent_id".into()))?;
        Ok(ContentKeyRow {
            id: parse_key_id(&id)?,
            wrapped,
            parent_id: parse_key_id(&parent)?,
            created_at_ms: created,
            updated_at_ms: updated,
        })
    }

    fn add_root(&mut self, row: RootKeyRow) -> Result<(), StoreError> {
        self.insert("roots", row.id, &row.wrapped, row.parent_id, row.created_at_ms)
    }

    fn add_intermediate(&mut self, row: IntermediateKeyRow) -> Result<(), StoreError> {
        self.insert(
            "intermediates",
            row.id,
            &row.wrapped,
            Some(row.parent_id),
            row.created_at_ms,
        )
    }

    fn add_content(&mut self, row: ContentKeyRow) -> Result<(), StoreError> {
        self.insert("contents", row.id, &row.wrapped, Some(row.parent_id), row.created_at_ms)
    }
}

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_row(id: KeyId) -> RootKeyRow {
        RootKeyRow {
            id,
            wrapped: vec![9, 9, 9],
            parent_id: None,
            created_at_ms: 1000,
            updated_at_ms: 1000,
        }
    }

    #[test]
    fn insert_then_fetch_roundtrips() {
        let store = SqliteStore::in_memory().unwrap();
        let id = KeyId::generate();
        store.with_txn(|txn| txn.add_root(root_row(id))).unwrap();

        let fetched = store.with_txn(|txn| txn.get_root(id)).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.wrapped, vec![9, 9, 9]);
    }

    #[test]
    fn duplicate_id_conflicts() {
        let store = SqliteStore::in_memory().unwrap();
        let id = KeyId::generate();
        store.with_txn(|txn| txn.add_root(root_row(id))).unwrap();

        let err = store.with_txn(|txn| txn.add_root(root_row(id))).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(conflicting) if conflicting == id));
    }

    #[test]
    fn latest_root_is_newest_by_id() {
        let store = SqliteStore::in_memory().unwrap();
        let first = KeyId::generate();
        let second = KeyId::generate();
        store
            .with_txn(|txn| {
                txn.add_root(root_row(first))?;
                txn.add_root(root_row(second))
            })
            .unwrap();

        let latest = store.with_txn(|txn| txn.get_root_latest()).unwrap();
        assert_eq!(latest.id, second);
    }

    #[test]
    fn rolled_back_transaction_leaves_no_row() {
        let store = SqliteStore::in_memory().unwrap();
        let id = KeyId::generate();
        let result = store.with_txn(|txn| -> Result<(), StoreError> {
            txn.add_root(root_row(id))?;
            Err(StoreError::Invalid("forced".into()))
        });
        assert!(result.is_err());

        let err = store.with_txn(|txn| txn.get_root(id)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barrier.sqlite3");
        let id = KeyId::generate();

        {
            let store = SqliteStore::open(&path).unwrap();
            store.with_txn(|txn| txn.add_root(root_row(id))).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let fetched = reopened.with_txn(|txn| txn.get_root(id)).unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.wrapped, vec![9, 9, 9]);
    }
}
