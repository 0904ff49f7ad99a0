//! The hierarchical data-at-rest encryption barrier.
//!
//! Three tiers of AES-256 keys — root, intermediate, content — each wrap
//! the next, with the root key itself wrapped by an externally supplied
//! unseal key ([`barrier_unseal::UnsealProvider`]). `encrypt`/`decrypt`
//! generate and persist a fresh content key per call; [`Rotator`] retires
//! the current "latest" key of any tier without invalidating ciphertext
//! produced under an older one — old rows are never deleted, so the
//! lookup chain from an old `kid` is always still reachable.
//!
//! ```text
//! Barrier::encrypt
//!   -> ContentTier::seal     generates + AEAD-seals a fresh content key
//!        -> IntermediateTier::wrap
//!             -> RootTier::unwrap   (recovers cleartext latest intermediate key)
//!        -> persists wrapped ContentKey row
//! ```
//!
//! Every tier is generic over nothing but the shared `Store`; they talk to
//! it only through the `&mut dyn Txn` a caller (`Barrier` or `Rotator`)
//! hands them, so a single `with_txn` call covers an entire operation's
//! reads, unwraps, and writes atomically.

mod audit;
mod barrier;
mod content_tier;
mod error;
mod intermediate_tier;
mod material;
mod root_tier;
mod rotator;
mod time;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use barrier::Barrier;
pub use content_tier::ContentTier;
pub use error::BarrierError;
pub use intermediate_tier::IntermediateTier;
pub use root_tier::RootTier;
pub use rotator::{RotationRecord, Rotator, DEFAULT_MAX_REASON_LEN};
