//! Ambient observability for the barrier. Not part of any contract in the
//! core's own request/response path — callers can ignore it entirely, wire
//! it to `tracing`, or capture it in memory for tests.

use std::sync::Mutex;

use barrier_crypto::KeyId;

use crate::time::now_ms;

#[derive(Debug, Clone)]
pub enum AuditAction {
    BarrierBootstrapped,
    Encrypted { content_id: KeyId },
    Decrypted { content_id: KeyId },
    OperationFailed { detail: String },
    RootRotated { old_id: Option<KeyId>, new_id: KeyId },
    IntermediateRotated { old_id: Option<KeyId>, new_id: KeyId },
    ContentRotated { new_id: KeyId },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub timestamp_ms: i64,
    pub action: AuditAction,
}

impl AuditEvent {
    pub fn new(action: AuditAction) -> Self {
        Self {
            timestamp_ms: now_ms(),
            action,
        }
    }
}

/// A sink for [`AuditEvent`]s. Implementations must not block the caller
/// for long — the facade calls this synchronously on the hot path.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Logs every event at `info` via `tracing`. The default sink.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(timestamp_ms = event.timestamp_ms, action = ?event.action, "barrier audit event");
    }
}

/// Collects events in memory, for tests that want to assert on what
/// happened rather than just on the return value.
#[derive(Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit mutex poisoned").push(event);
    }
}
