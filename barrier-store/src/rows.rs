//! Row types for the three key tables. All three share a shape; only the
//! allowed value of `parent_id` differs between them (enforced by the
//! tiers, not by these types).

use barrier_crypto::KeyId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootKeyRow {
    pub id: KeyId,
    pub wrapped: Vec<u8>,
    pub parent_id: Option<KeyId>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateKeyRow {
    pub id: KeyId,
    pub wrapped: Vec<u8>,
    pub parent_id: KeyId,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKeyRow {
    pub id: KeyId,
    pub wrapped: Vec<u8>,
    pub parent_id: KeyId,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
