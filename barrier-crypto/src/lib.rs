//! JOSE/JWE primitives shared by every tier of the key hierarchy.
//!
//! This crate has no notion of tiers, storage, or rotation — it only knows
//! how to mint AES-256 keys, seal/open payloads under them as compact JWEs,
//! and wrap/unwrap one key's bytes under another. `barrier-core` composes
//! these primitives into the root/intermediate/content hierarchy;
//! `barrier-unseal` reuses the `A256KW` wrapping functions to seal the root
//! key under an external unseal key.

mod error;
mod ids;
mod jwe;
mod keys;

pub use error::CryptoError;
pub use ids::KeyId;
pub use jwe::{a256kw_unwrap, a256kw_wrap, parse_compact_kid, Crypto, JoseCrypto};
pub use keys::SymmetricKey;
