//! Conversion from the internal [`bantai_core::AuditEvent`] to the stable
//! external JSON shape of §6.

use bantai_core::{AuditEvent, AuditEventType};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

const AUDIT_VERSION: &str = "v1";

#[derive(Debug, Clone, Serialize)]
struct WireIdentity {
    name: String,
    id: String,
    version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct WireDecision {
    outcome: String,
    reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

/// The wire-format event, field order and names matching §6 exactly.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: u64,
    pub evaluation_id: String,
    pub policy: WireIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<WireIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<WireDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<WireTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
    pub audit_version: &'static str,
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

fn event_type_name(event_type: AuditEventType) -> &'static str {
    match event_type {
        AuditEventType::PolicyStart => "policy.start",
        AuditEventType::RuleStart => "rule.start",
        AuditEventType::RuleEnd => "rule.end",
        AuditEventType::RuleDecision => "rule.decision",
        AuditEventType::PolicyDecision => "policy.decision",
        AuditEventType::PolicyEnd => "policy.end",
        AuditEventType::ExtensionEvent => "extension.event",
    }
}

/// Render an internal event into the stable wire shape (§6). IDs already
/// carry their namespace prefix (`policy:`, `rule:`, `event:`, `eval:`) from
/// `bantai-core`'s id generators.
pub fn to_wire(event: &AuditEvent) -> WireEvent {
    WireEvent {
        id: event.id.clone(),
        kind: event_type_name(event.event_type).to_string(),
        timestamp: event.timestamp_ms,
        evaluation_id: event.evaluation_id.clone(),
        policy: WireIdentity {
            name: event.policy_name.clone(),
            id: event.policy_id.clone(),
            version: event.policy_version,
        },
        rule: event.rule.as_ref().map(|r| WireIdentity { name: r.name.clone(), id: r.id.clone(), version: r.version }),
        decision: event.decision.as_ref().map(|d| WireDecision { outcome: d.outcome.clone(), reason: d.reason.clone() }),
        trace: event.trace.as_ref().map(|t| WireTrace { trace_id: t.trace_id.clone(), request_id: t.request_id.clone() }),
        meta: if event.meta.is_empty() { None } else { Some(event.meta.clone()) },
        audit_version: AUDIT_VERSION,
        duration_ms: event.duration_ms,
        parent_id: event.parent_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bantai_core::RuleIdentity;

    fn sample_event() -> AuditEvent {
        AuditEvent {
            id: "event:1-abc".into(),
            event_type: AuditEventType::RuleDecision,
            timestamp_ms: 1_710_000_000_000,
            evaluation_id: "eval:1-abc".into(),
            policy_id: "policy:admission".into(),
            policy_name: "admission".into(),
            policy_version: "v1",
            rule: Some(RuleIdentity { id: "rule:age-check".into(), name: "age check".into(), version: "v1" }),
            decision: None,
            trace: None,
            meta: Default::default(),
            parent_id: Some("event:0-xyz".into()),
            duration_ms: None,
        }
    }

    #[test]
    fn dotted_event_type_names() {
        let wire = to_wire(&sample_event());
        assert_eq!(wire.kind, "rule.decision");
        assert_eq!(wire.audit_version, "v1");
    }

    #[test]
    fn json_uses_camel_case_field_names() {
        let wire = to_wire(&sample_event());
        let json = serde_json::to_value(&wire).unwrap();
        assert!(json.get("evaluationId").is_some());
        assert!(json.get("auditVersion").is_some());
        assert_eq!(json["policy"]["id"], "policy:admission");
        assert_eq!(json["rule"]["name"], "age check");
    }

    #[test]
    fn empty_meta_is_omitted() {
        let wire = to_wire(&sample_event());
        let json = serde_json::to_value(&wire).unwrap();
        assert!(json.get("meta").is_none());
    }
}
