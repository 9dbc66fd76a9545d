//! The concrete `AuditEmitter` the `"audit"` tool registers: fans each event
//! out to every sink in registration order, aborting on the first error
//! (§4.8, §7).

use crate::sink::Sink;
use bantai_core::{AuditEmitter, AuditEvent};
use std::sync::Arc;

pub struct SinkFanoutEmitter {
    sinks: Vec<Arc<dyn Sink>>,
}

impl SinkFanoutEmitter {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self { sinks }
    }
}

impl AuditEmitter for SinkFanoutEmitter {
    fn emit(&self, event: AuditEvent) -> bantai_core::Result<()> {
        for sink in &self.sinks {
            sink.handle(&event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemorySink;
    use bantai_core::{AuditEventType, RuleIdentity};

    fn event(id: &str) -> AuditEvent {
        AuditEvent {
            id: id.to_string(),
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

    struct FailingSink;
    impl Sink for FailingSink {
        fn handle(&self, _event: &AuditEvent) -> bantai_core::Result<()> {
            Err(bantai_core::Error::Sink("boom".to_string()))
        }
    }

    #[test]
    fn fans_out_to_every_sink_in_order() {
        let a = Arc::new(InMemorySink::new());
        let b = Arc::new(InMemorySink::new());
        let emitter = SinkFanoutEmitter::new(vec![a.clone(), b.clone()]);
        emitter.emit(event("event:1")).unwrap();
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }

    #[test]
    fn a_failing_sink_aborts_the_emit() {
        let a = Arc::new(InMemorySink::new());
        let emitter = SinkFanoutEmitter::new(vec![a.clone(), Arc::new(FailingSink)]);
        assert!(emitter.emit(event("event:1")).is_err());
    }

    #[test]
    fn sinks_after_a_failure_do_not_run() {
        let after = Arc::new(InMemorySink::new());
        let emitter = SinkFanoutEmitter::new(vec![Arc::new(FailingSink), after.clone()]);
        assert!(emitter.emit(event("event:1")).is_err());
        assert_eq!(after.events().len(), 0);
    }
}
