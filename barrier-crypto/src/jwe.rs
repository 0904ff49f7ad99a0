//! JWE compact serialization backing the `Crypto` contract.
//!
//! Two JWE profiles are used across the key hierarchy, both fixed by the
//! wire format and never negotiated at runtime:
//!
//! * `alg=dir`, `enc=A256GCM` — sealing payloads directly under a tier's
//!   own key (content encryption, and wrapping a child tier's key under its
//!   parent).
//! * `alg=A256KW`, `enc=A256GCM` — wrapping the root key under an unseal
//!   key. This profile is exposed as free functions rather than methods on
//!   [`Crypto`], since producing it is the unseal provider's job, not a
//!   tier's.
//!
//! In both cases the JWE `kid` header carries the [`KeyId`] of the key that
//! was used, so a ciphertext is self-describing about which row to look up
//! when unwrapping it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use josekit::jwe::{Dir, JweHeader, A256KW};
use josekit::JoseError;

use crate::error::CryptoError;
use crate::ids::KeyId;
use crate::keys::SymmetricKey;

const CONTENT_ENCRYPTION: &str = "A256GCM";

/// JOSE/JWE sealing, wrapping, and key-generation primitives for the
/// content and intermediate tiers.
///
/// Object-safe: tiers hold an `Arc<dyn Crypto>` rather than being generic
/// over it, since nothing here needs a generic return type.
pub trait Crypto: Send + Sync {
    /// Mints a fresh content-encryption key.
    fn generate_content_key(&self) -> Result<SymmetricKey, CryptoError>;

    /// Mints a fresh key-wrapping key (used by the intermediate and root
    /// tiers to wrap their child's key).
    fn generate_wrap_key(&self) -> Result<SymmetricKey, CryptoError>;

    /// Seals `plaintext` under `key`, producing a compact JWE tagged with
    /// `key`'s id.
    fn seal(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Opens a compact JWE produced by [`Self::seal`] under `key`.
    fn open(&self, key: &SymmetricKey, jwe: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Wraps `key_to_wrap`'s raw bytes under `wrapping_key`, producing a
    /// compact JWE tagged with `wrapping_key`'s id.
    fn wrap(&self, wrapping_key: &SymmetricKey, key_to_wrap: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Unwraps a compact JWE produced by [`Self::wrap`] under
    /// `wrapping_key`, returning the wrapped key's raw bytes.
    fn unwrap(&self, wrapping_key: &SymmetricKey, jwe: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Reads the `kid` header out of a compact JWE without decrypting it,
    /// so a tier can look up the right row before it has the key in hand.
    fn parse_kid(&self, jwe: &[u8]) -> Result<KeyId, CryptoError>;
}

/// [`Crypto`] backed by the real `josekit` JOSE implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct JoseCrypto;

impl JoseCrypto {
    pub fn new() -> Self {
        Self
    }

    fn seal_dir(&self, key: &SymmetricKey, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut header = JweHeader::new();
        header.set_content_encryption(CONTENT_ENCRYPTION);
        header.set_key_id(key.id().to_string());

        let encrypter = Dir
            .encrypter_from_bytes(key.as_bytes())
            .map_err(map_jose_err("building dir encrypter"))?;

        josekit::jwe::serialize_compact(payload, &header, &*encrypter)
            .map(String::into_bytes)
            .map_err(map_jose_err("sealing payload"))
    }

    fn open_dir(&self, key: &SymmetricKey, jwe: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let input = std::str::from_utf8(jwe)
            .map_err(|e| CryptoError::MalformedCiphertext(format!("jwe is not utf-8: {}", e)))?;

        let decrypter = Dir
            .decrypter_from_bytes(key.as_bytes())
            .map_err(map_jose_err("building dir decrypter"))?;

        let (payload, _header) = josekit::jwe::deserialize_compact(input, &*decrypter)
            .map_err(map_jose_err("opening jwe"))?;
        Ok(payload)
    }
}

impl Crypto for JoseCrypto {
    fn generate_content_key(&self) -> Result<SymmetricKey, CryptoError> {
        SymmetricKey::generate()
    }

    fn generate_wrap_key(&self) -> Result<SymmetricKey, CryptoError> {
        SymmetricKey::generate()
    }

    fn seal(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.seal_dir(key, plaintext)
    }

    fn open(&self, key: &SymmetricKey, jwe: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.open_dir(key, jwe)
    }

    fn wrap(&self, wrapping_key: &SymmetricKey, key_to_wrap: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.seal_dir(wrapping_key, key_to_wrap)
    }

    fn unwrap(&self, wrapping_key: &SymmetricKey, jwe: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.open_dir(wrapping_key, jwe)
    }

    fn parse_kid(&self, jwe: &[u8]) -> Result<KeyId, CryptoError> {
        parse_compact_kid(jwe)
    }
}

/// Wraps `root_key_bytes` under an unseal key using `alg=A256KW`,
/// `enc=A256GCM`, tagging the JWE with `unseal_key_id` so the matching
/// unseal key can be picked out of an ordered set on unwrap.
pub fn a256kw_wrap(
    unseal_key_id: &str,
    unseal_key: &[u8],
    root_key_bytes: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let mut header = JweHeader::new();
    header.set_content_encryption(CONTENT_ENCRYPTION);
    header.set_key_id(unseal_key_id.to_string());

    let encrypter = A256KW
        .encrypter_from_bytes(unseal_key)
        .map_err(map_jose_err("building a256kw encrypter"))?;

    josekit::jwe::serialize_compact(root_key_bytes, &header, &*encrypter)
        .map(String::into_bytes)
        .map_err(map_jose_err("wrapping root key"))
}

/// Inverse of [`a256kw_wrap`].
pub fn a256kw_unwrap(unseal_key: &[u8], jwe: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let input = std::str::from_utf8(jwe)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("jwe is not utf-8: {}", e)))?;

    let decrypter = A256KW
        .decrypter_from_bytes(unseal_key)
        .map_err(map_jose_err("building a256kw decrypter"))?;

    let (payload, _header) = josekit::jwe::deserialize_compact(input, &*decrypter)
        .map_err(map_jose_err("unwrapping root key"))?;
    Ok(payload)
}

/// Reads the `kid` header claim out of a compact JWE without touching the
/// ciphertext, by base64url-decoding the protected header segment directly.
/// Used both by [`JoseCrypto::parse_kid`] and by unseal providers picking a
/// candidate key before attempting a full unwrap.
pub fn parse_compact_kid(jwe: &[u8]) -> Result<KeyId, CryptoError> {
    let input = std::str::from_utf8(jwe)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("jwe is not utf-8: {}", e)))?;

    let protected_b64 = input
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CryptoError::MalformedCiphertext("missing protected header segment".into()))?;

    let protected_json = URL_SAFE_NO_PAD
        .decode(protected_b64)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("bad header base64: {}", e)))?;

    let header: serde_json::Value = serde_json::from_slice(&protected_json)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("bad header json: {}", e)))?;

    let kid = header
        .get("kid")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CryptoError::MalformedCiphertext("header has no kid".into()))?;

    kid.parse()
}

fn map_jose_err(context: &'static str) -> impl Fn(JoseError) -> CryptoError {
    move |e| CryptoError::MalformedCiphertext(format!("{}: {}", context, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_roundtrips() {
        let crypto = JoseCrypto::new();
        let key = crypto.generate_content_key().unwrap();
        let jwe = crypto.seal(&key, b"plaintext payload").unwrap();
        let opened = crypto.open(&key, &jwe).unwrap();
        assert_eq!(opened, b"plaintext payload");
    }

    #[test]
    fn open_under_wrong_key_fails() {
        let crypto = JoseCrypto::new();
        let key = crypto.generate_content_key().unwrap();
        let other = crypto.generate_content_key().unwrap();
        let jwe = crypto.seal(&key, b"secret").unwrap();
        assert!(crypto.open(&other, &jwe).is_err());
    }

    #[test]
    fn wrap_then_unwrap_roundtrips_key_material() {
        let crypto = JoseCrypto::new();
        let wrapping_key = crypto.generate_wrap_key().unwrap();
        let child = crypto.generate_content_key().unwrap();
        let wrapped = crypto.wrap(&wrapping_key, child.as_bytes()).unwrap();
        let unwrapped = crypto.unwrap(&wrapping_key, &wrapped).unwrap();
        assert_eq!(unwrapped, child.as_bytes());
    }

    #[test]
    fn parse_kid_matches_sealing_key_without_decrypting() {
        let crypto = JoseCrypto::new();
        let key = crypto.generate_content_key().unwrap();
        let jwe = crypto.seal(&key, b"payload").unwrap();
        assert_eq!(crypto.parse_kid(&jwe).unwrap(), key.id());
    }

    #[test]
    fn a256kw_wrap_unwrap_roundtrips() {
        let unseal_key = [9u8; 32];
        let root_key = SymmetricKey::generate().unwrap();
        let jwe = a256kw_wrap("unseal-1", &unseal_key, root_key.as_bytes()).unwrap();
        let opened = a256kw_unwrap(&unseal_key, &jwe).unwrap();
        assert_eq!(opened, root_key.as_bytes());
    }

    #[test]
    fn a256kw_unwrap_with_wrong_key_fails() {
        let root_key = SymmetricKey::generate().unwrap();
        let jwe = a256kw_wrap("unseal-1", &[1u8; 32], root_key.as_bytes()).unwrap();
        assert!(a256kw_unwrap(&[2u8; 32], &jwe).is_err());
    }

    #[test]
    fn parse_kid_rejects_truncated_input() {
        let crypto = JoseCrypto::new();
        assert!(crypto.parse_kid(b"not-a-jwe").is_err());
    }
}
