//! Key identifiers.
//!
//! Every row in every tier's table is addressed by a [`KeyId`]. IDs are
//! UUIDv7: the leading 48 bits are a millisecond timestamp, so lexicographic
//! (and numeric) ordering of IDs matches creation order. Tiers rely on this
//! to find "the latest row" with a single `MAX(id)`-style query instead of
//! an extra `created_at` index.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CryptoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyId(Uuid);

impl KeyId {
    /// Mints a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for KeyId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CryptoError::MalformedCiphertext(format!("bad kid {:?}: {}", s, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_sort_by_creation_order() {
        let a = KeyId::generate();
        let b = KeyId::generate();
        assert!(a < b, "uuidv7 ids must be monotonically increasing");
    }

    #[test]
    fn roundtrips_through_display_and_parse() {
        let id = KeyId::generate();
        let parsed: KeyId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-uuid".parse::<KeyId>().is_err());
    }
}
