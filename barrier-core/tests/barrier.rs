//! End-to-end tests for the barrier facade and rotator, covering the
//! roundtrip/elasticity/concurrency/validation properties that any
//! `Store` implementation must satisfy.

use std::sync::Arc;

use barrier_core::{Barrier, BarrierError, InMemoryAuditSink};
use barrier_crypto::JoseCrypto;
use barrier_store::InMemoryStore;
use barrier_unseal::StaticUnsealProvider;

fn fresh_barrier() -> Barrier<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let crypto = Arc::new(JoseCrypto::new());
    let unseal = Arc::new(StaticUnsealProvider::single("u1", [7u8; 32]));
    Barrier::new(store, crypto, unseal).unwrap()
}

#[tokio::test]
async fn s1_roundtrip_through_fresh_barrier() {
    let barrier = fresh_barrier();
    let ciphertext = barrier.encrypt(b"test data for encryption").await.unwrap();
    let plaintext = barrier.decrypt(&ciphertext).await.unwrap();
    assert_eq!(plaintext, b"test data for encryption");
}

#[tokio::test]
async fn s2_roundtrips_binary_payload_and_differs_from_input() {
    let barrier = fresh_barrier();
    let payload = [0x00u8, 0x01, 0x02, 0xFF, 0xFE, 0xFD];
    let ciphertext = barrier.encrypt(&payload).await.unwrap();
    assert_ne!(ciphertext.as_slice(), payload.as_slice());
    let plaintext = barrier.decrypt(&ciphertext).await.unwrap();
    assert_eq!(plaintext, payload);
}

#[tokio::test]
async fn s3_empty_plaintext_is_invalid() {
    let barrier = fresh_barrier();
    let err = barrier.encrypt(b"").await.unwrap_err();
    assert!(matches!(err, BarrierError::Invalid(_)));
}

#[tokio::test]
async fn s4_elasticity_across_root_rotation() {
    let barrier = fresh_barrier();
    let before = barrier.encrypt(b"before").await.unwrap();

    let record = barrier
        .rotator()
        .rotate_root("scheduled quarterly rotation")
        .unwrap();
    assert_ne!(record.old_id, Some(record.new_id));
    assert!(record.rotated_at_ms > 0);
    assert_eq!(record.reason, "scheduled quarterly rotation");

    let decrypted_before = barrier.decrypt(&before).await.unwrap();
    assert_eq!(decrypted_before, b"before");

    let after = barrier.encrypt(b"after").await.unwrap();
    let decrypted_after = barrier.decrypt(&after).await.unwrap();
    assert_eq!(decrypted_after, b"after");
}

#[tokio::test]
async fn s5_short_rotation_reason_is_rejected() {
    let barrier = fresh_barrier();
    let err = barrier.rotator().rotate_root("short").unwrap_err();
    match err {
        BarrierError::Validation(msg) => assert!(msg.contains("at least 10 characters")),
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[tokio::test]
async fn s6_ten_concurrent_encrypts_all_roundtrip_and_are_distinct() {
    let barrier = Arc::new(fresh_barrier());
    let mut handles = Vec::new();
    for i in 0..10 {
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            let plaintext = format!("concurrent test data {}", i);
            let ciphertext = barrier.encrypt(plaintext.as_bytes()).await.unwrap();
            (plaintext, ciphertext)
        }));
    }

    let mut pairs = Vec::new();
    for handle in handles {
        pairs.push(handle.await.unwrap());
    }

    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            assert_ne!(pairs[i].1, pairs[j].1, "ciphertexts must be pairwise distinct");
        }
    }

    for (plaintext, ciphertext) in &pairs {
        let decrypted = barrier.decrypt(ciphertext).await.unwrap();
        assert_eq!(&decrypted, plaintext.as_bytes());
    }
}

#[tokio::test]
async fn s7_shutdown_closes_and_is_idempotent() {
    let barrier = fresh_barrier();
    let ciphertext = barrier.encrypt(b"payload").await.unwrap();
    barrier.shutdown().await;

    assert!(matches!(barrier.encrypt(b"more").await.unwrap_err(), BarrierError::Closed));
    assert!(matches!(barrier.decrypt(&ciphertext).await.unwrap_err(), BarrierError::Closed));

    // Idempotent: a second shutdown does not panic or error.
    barrier.shutdown().await;
}

#[tokio::test]
async fn elasticity_across_intermediate_rotation() {
    let barrier = fresh_barrier();
    let ciphertext = barrier.encrypt(b"intermediate-rotation-target").await.unwrap();

    barrier
        .rotator()
        .rotate_intermediate("rolling intermediate key ahead of schedule")
        .unwrap();

    let decrypted = barrier.decrypt(&ciphertext).await.unwrap();
    assert_eq!(decrypted, b"intermediate-rotation-target");
}

#[tokio::test]
async fn elasticity_across_content_rotation() {
    let barrier = fresh_barrier();
    let ciphertext = barrier.encrypt(b"content-rotation-target").await.unwrap();

    let record = barrier.rotator().rotate_content("baseline content key check").unwrap();
    assert_eq!(record.old_id, None);

    let decrypted = barrier.decrypt(&ciphertext).await.unwrap();
    assert_eq!(decrypted, b"content-rotation-target");
}

#[tokio::test]
async fn elasticity_across_chained_rotations() {
    let barrier = fresh_barrier();
    let ciphertext = barrier.encrypt(b"chained-rotation-target").await.unwrap();

    barrier.rotator().rotate_root("first link in the chain").unwrap();
    barrier.rotator().rotate_intermediate("second link in the chain").unwrap();
    barrier.rotator().rotate_content("third link in the chain").unwrap();

    let decrypted = barrier.decrypt(&ciphertext).await.unwrap();
    assert_eq!(decrypted, b"chained-rotation-target");

    let after = barrier.encrypt(b"after-chain").await.unwrap();
    assert_eq!(barrier.decrypt(&after).await.unwrap(), b"after-chain");
}

#[tokio::test]
async fn bootstrap_is_idempotent_across_two_barriers() {
    let store = Arc::new(InMemoryStore::new());
    let crypto: Arc<dyn barrier_crypto::Crypto> = Arc::new(JoseCrypto::new());
    let unseal: Arc<dyn barrier_unseal::UnsealProvider> =
        Arc::new(StaticUnsealProvider::single("u1", [3u8; 32]));

    let first = Barrier::new(store.clone(), crypto.clone(), unseal.clone()).unwrap();
    let second = Barrier::new(store.clone(), crypto, unseal).unwrap();

    // Both barriers observe the same, single bootstrap row: a ciphertext
    // from one decrypts fine under the other.
    let ciphertext = first.encrypt(b"shared store").await.unwrap();
    let decrypted = second.decrypt(&ciphertext).await.unwrap();
    assert_eq!(decrypted, b"shared store");
}

#[tokio::test]
async fn decrypt_of_garbage_is_malformed_ciphertext() {
    let barrier = fresh_barrier();
    let err = barrier.decrypt(b"not a jwe at all").await.unwrap_err();
    assert!(matches!(err, BarrierError::MalformedCiphertext(_)));
}

#[tokio::test]
async fn decrypt_of_empty_bytes_is_malformed_ciphertext() {
    let barrier = fresh_barrier();
    let err = barrier.decrypt(b"").await.unwrap_err();
    assert!(matches!(err, BarrierError::MalformedCiphertext(_)));
}

#[tokio::test]
async fn decrypt_of_unknown_kid_is_key_gone() {
    let barrier = fresh_barrier();
    let ciphertext = barrier.encrypt(b"will be orphaned").await.unwrap();

    // Rotate content so the reported kid still parses as a well-formed id
    // but swap in a fresh, never-persisted id to simulate a vanished row.
    let orphan_id = barrier_crypto::KeyId::generate();
    let mut text = String::from_utf8(ciphertext).unwrap();
    let parts: Vec<&str> = text.split('.').collect();
    let header_json = {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let raw = URL_SAFE_NO_PAD.decode(parts[0]).unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        value["kid"] = serde_json::Value::String(orphan_id.to_string());
        value
    };
    let reencoded = {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header_json).unwrap())
    };
    text = format!("{}.{}", reencoded, parts[1..].join("."));

    let err = barrier.decrypt(text.as_bytes()).await.unwrap_err();
    assert!(matches!(err, BarrierError::KeyGone));
}

#[tokio::test]
async fn cross_barrier_key_isolation() {
    let store = Arc::new(InMemoryStore::new());
    let crypto = Arc::new(JoseCrypto::new());
    let unseal_u1 = Arc::new(StaticUnsealProvider::single("u1", [1u8; 32]));

    let barrier_u1 = Barrier::new(store.clone(), crypto.clone(), unseal_u1).unwrap();
    let ciphertext = barrier_u1.encrypt(b"sealed under u1").await.unwrap();
    drop(barrier_u1);

    // A fresh store with only an unrelated unseal key set cannot recover
    // anything wrapped under U1's root.
    let other_store = Arc::new(InMemoryStore::new());
    let unseal_u2 = Arc::new(StaticUnsealProvider::single("u2", [2u8; 32]));
    let barrier_u2 = Barrier::new(other_store, crypto, unseal_u2).unwrap();

    assert!(barrier_u2.decrypt(&ciphertext).await.is_err());
}

#[tokio::test]
async fn audit_sink_observes_bootstrap_encrypt_and_rotation() {
    let store = Arc::new(InMemoryStore::new());
    let crypto = Arc::new(JoseCrypto::new());
    let unseal = Arc::new(StaticUnsealProvider::single("u1", [4u8; 32]));
    let audit = Arc::new(InMemoryAuditSink::new());

    let barrier = Barrier::with_audit_sink(store, crypto, unseal, audit.clone()).unwrap();
    barrier.encrypt(b"observed payload").await.unwrap();
    barrier.rotator().rotate_root("audited rotation of the root tier").unwrap();

    let events = audit.events();
    assert!(events
        .iter()
        .any(|e| matches!(e.action, barrier_core::AuditAction::BarrierBootstrapped)));
    assert!(events
        .iter()
        .any(|e| matches!(e.action, barrier_core::AuditAction::Encrypted { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e.action, barrier_core::AuditAction::RootRotated { .. })));
}
