//! Audit sinks: fire-and-forget callbacks an emitter fans events out to in
//! registration order (§4.8). A sink that errors aborts the current emit —
//! documented in §7 as a deliberate choice, not a bug. Sinks run
//! synchronously with the emitting rule/policy event, matching
//! `AuditEmitter::emit`'s own synchronous contract.

use crate::wire::to_wire;
use bantai_core::AuditEvent;
use std::sync::Mutex;

/// One destination for audit events.
pub trait Sink: Send + Sync {
    fn handle(&self, event: &AuditEvent) -> bantai_core::Result<()>;
}

/// Captures every event it receives, in order. Used by tests and by
/// callers that want to build an explain tree in-process.
#[derive(Default)]
pub struct InMemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything captured so far, in emit order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Sink for InMemorySink {
    fn handle(&self, event: &AuditEvent) -> bantai_core::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Logs each event as a structured `tracing` record, wire-encoded, at
/// `info` for decisions and `debug` for lifecycle bookkeeping.
#[derive(Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl Sink for TracingSink {
    fn handle(&self, event: &AuditEvent) -> bantai_core::Result<()> {
        let wire = to_wire(event);
        let json = serde_json::to_string(&wire).map_err(|e| bantai_core::Error::Sink(e.to_string()))?;
        match event.event_type {
            bantai_core::AuditEventType::RuleDecision | bantai_core::AuditEventType::PolicyDecision => {
                tracing::info!(audit.event = %json, "bantai audit event");
            }
            _ => {
                tracing::debug!(audit.event = %json, "bantai audit event");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bantai_core::{AuditEventType, RuleIdentity};

    fn event() -> AuditEvent {
        AuditEvent {
            id: "event:1-a".into(),
            event_type: AuditEventType::RuleDecision,
            timestamp_ms: 1,
            evaluation_id: "eval:1-a".into(),
            policy_id: "policy:p".into(),
            policy_name: "p".into(),
            policy_version: "v1",
            rule: Some(RuleIdentity { id: "rule:r".into(), name: "r".into(), version: "v1" }),
            decision: None,
            trace: None,
            meta: Default::default(),
            parent_id: None,
            duration_ms: None,
        }
    }

    #[test]
    fn in_memory_sink_captures_in_order() {
        let sink = InMemorySink::new();
        sink.handle(&event()).unwrap();
        sink.handle(&event()).unwrap();
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn tracing_sink_never_errors_on_well_formed_events() {
        let sink = TracingSink::new();
        assert!(sink.handle(&event()).is_ok());
    }
}
