//! Errors surfaced by the `Store`/`Txn` contract.

use std::fmt;

use barrier_crypto::KeyId;

#[derive(Debug)]
pub enum StoreError {
    /// The requested row does not exist.
    NotFound,
    /// Insert of a row whose id already exists.
    Conflict(KeyId),
    /// Caller passed a row that fails a storage-level precondition (empty
    /// `wrapped`, missing required `parent_id`, ...).
    Invalid(String),
    /// The surrounding context was cancelled while a transaction was in
    /// flight; the transaction was rolled back.
    Cancelled,
    /// The underlying datastore itself failed (connection lost, disk full,
    /// corrupt file, ...) independent of anything the caller did.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "row not found"),
            Self::Conflict(id) => write!(f, "row with id {} already exists", id),
            Self::Invalid(msg) => write!(f, "invalid row: {}", msg),
            Self::Cancelled => write!(f, "transaction cancelled"),
            Self::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
