//! A pure post-processor that groups a flat audit-event stream by
//! `evaluationId` and reconstructs the policy → rule → decision tree via
//! `parentId` (§4.8: "a post-processor ... produces a human-readable
//! trace").

use bantai_core::AuditEvent;
use std::collections::HashMap;

/// One node in a reconstructed evaluation tree: the event at this node plus
/// its children, in emission order.
#[derive(Debug, Clone)]
pub struct ExplainNode {
    pub event: AuditEvent,
    pub children: Vec<ExplainNode>,
}

/// Group `events` by `evaluation_id` and build one root-level forest per
/// evaluation (an evaluation's `policy.start` has no parent and is the root;
/// everything else nests under its `parent_id`). Events with a `parent_id`
/// that never appears in the stream are treated as additional roots rather
/// than dropped.
pub fn build_explain_trees(events: &[AuditEvent]) -> HashMap<String, Vec<ExplainNode>> {
    let mut by_evaluation: HashMap<String, Vec<AuditEvent>> = HashMap::new();
    for event in events {
        by_evaluation.entry(event.evaluation_id.clone()).or_default().push(event.clone());
    }

    by_evaluation
        .into_iter()
        .map(|(evaluation_id, events)| (evaluation_id, build_tree(events)))
        .collect()
}

fn build_tree(events: Vec<AuditEvent>) -> Vec<ExplainNode> {
    let mut children_of: HashMap<Option<String>, Vec<AuditEvent>> = HashMap::new();
    for event in events {
        children_of.entry(event.parent_id.clone()).or_default().push(event);
    }

    fn attach(id: Option<String>, children_of: &HashMap<Option<String>, Vec<AuditEvent>>) -> Vec<ExplainNode> {
        children_of
            .get(&id)
            .into_iter()
            .flatten()
            .map(|event| ExplainNode { children: attach(Some(event.id.clone()), children_of), event: event.clone() })
            .collect()
    }

    attach(None, &children_of)
}

/// Render one tree as indented lines: `policy → rules (decisions, reasons,
/// durations) → decision` (§4.8).
pub fn render_tree(node: &ExplainNode, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let mut lines = vec![format!("{indent}{}", describe(node))];
    for child in &node.children {
        lines.push(render_tree(child, depth + 1));
    }
    lines.join("\n")
}

fn describe(node: &ExplainNode) -> String {
    let event = &node.event;
    let label = match &event.rule {
        Some(rule) => format!("{} [{}]", rule.name, event.event_type_label()),
        None => format!("{} [{}]", event.policy_name, event.event_type_label()),
    };
    match &event.decision {
        Some(decision) => format!(
            "{label}: {}{}",
            decision.outcome,
            decision.reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default()
        ),
        None => label,
    }
}

trait EventTypeLabel {
    fn event_type_label(&self) -> &'static str;
}

impl EventTypeLabel for AuditEvent {
    fn event_type_label(&self) -> &'static str {
        use bantai_core::AuditEventType::*;
        match self.event_type {
            PolicyStart => "policy.start",
            RuleStart => "rule.start",
            RuleEnd => "rule.end",
            RuleDecision => "rule.decision",
            PolicyDecision => "policy.decision",
            PolicyEnd => "policy.end",
            ExtensionEvent => "extension.event",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bantai_core::{AuditEventType, EventDecision, RuleIdentity};

    fn event(id: &str, parent: Option<&str>, event_type: AuditEventType, rule: Option<&str>) -> AuditEvent {
        AuditEvent {
            id: id.to_string(),
            event_type,
            timestamp_ms: 0,
            evaluation_id: "eval:1".into(),
            policy_id: "policy:p".into(),
            policy_name: "p".into(),
            policy_version: "v1",
            rule: rule.map(|name| RuleIdentity { id: format!("rule:{name}"), name: name.to_string(), version: "v1" }),
            decision: None,
            trace: None,
            meta: Default::default(),
            parent_id: parent.map(str::to_string),
            duration_ms: None,
        }
    }

    #[test]
    fn groups_events_by_evaluation_id() {
        let events = vec![
            event("e1", None, AuditEventType::PolicyStart, None),
            event("e2", None, AuditEventType::PolicyStart, None),
        ];
        let mut other = events[1].clone();
        other.evaluation_id = "eval:2".into();
        let all = vec![events[0].clone(), other];
        let trees = build_explain_trees(&all);
        assert_eq!(trees.len(), 2);
    }

    #[test]
    fn reconstructs_parent_child_structure() {
        let events = vec![
            event("e1", None, AuditEventType::PolicyStart, None),
            event("e2", Some("e1"), AuditEventType::RuleStart, Some("age check")),
            event("e3", Some("e2"), AuditEventType::RuleDecision, Some("age check")),
        ];
        let trees = build_explain_trees(&events);
        let roots = &trees["eval:1"];
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].event.id, "e1");
        assert_eq!(roots[0].children[0].event.id, "e2");
        assert_eq!(roots[0].children[0].children[0].event.id, "e3");
    }

    #[test]
    fn render_names_rule_and_decision() {
        let mut decision_event = event("e2", Some("e1"), AuditEventType::RuleDecision, Some("age check"));
        decision_event.decision = Some(EventDecision { outcome: "deny".into(), reason: Some("too young".into()) });
        let node = ExplainNode { event: decision_event, children: vec![] };
        let rendered = render_tree(&node, 0);
        assert!(rendered.contains("age check"));
        assert!(rendered.contains("deny"));
        assert!(rendered.contains("too young"));
    }
}
