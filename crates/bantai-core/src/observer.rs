//! Audit event types and the emitter trait rules/policies publish through
//! (§4.2 "audit" tool, §6 wire format).
//!
//! The concrete emitter, its sinks, and the explain-tree builder live in the
//! audit extension crate; this module only fixes the event shape and the
//! trait boundary so `bantai-core` never depends on it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The six lifecycle event kinds an evaluation can emit, plus an open slot
/// for extensions (§6: `extension.event`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    PolicyStart,
    RuleStart,
    RuleEnd,
    RuleDecision,
    PolicyDecision,
    PolicyEnd,
    ExtensionEvent,
}

/// Which rule an event concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleIdentity {
    pub id: String,
    pub name: String,
    pub version: &'static str,
}

/// The outcome carried by a `rule.decision`/`policy.decision` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDecision {
    pub outcome: String,
    pub reason: Option<String>,
}

/// Distributed-tracing correlation, passed through from the caller's input
/// rather than generated by the engine (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: Option<String>,
    pub request_id: Option<String>,
}

/// One node in the evaluation tree (§6). `parent_id` is how the explain-tree
/// builder reconstructs structure from a flat stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub event_type: AuditEventType,
    pub timestamp_ms: u64,
    pub evaluation_id: String,
    pub policy_id: String,
    pub policy_name: String,
    pub policy_version: &'static str,
    pub rule: Option<RuleIdentity>,
    pub decision: Option<EventDecision>,
    pub trace: Option<TraceContext>,
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>,
    pub parent_id: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Sink-facing emitter contract. Implementations stream events to sinks
/// synchronously, in emit order (§6: "streamed to sinks synchronously in
/// emit order"); a failing sink is a hard error that aborts the evaluation
/// (§7: "sink failures propagate out of evaluatePolicy").
pub trait AuditEmitter: Send + Sync {
    /// Publish `event`. An `Err` here must propagate out of the evaluator.
    fn emit(&self, event: AuditEvent) -> crate::error::Result<()>;
}

/// Tool-bag wrapper so an [`AuditEmitter`] can be registered under the
/// `"audit"` key and looked up with [`crate::tools::ToolBag::get`].
#[derive(Clone)]
pub struct AuditTool(pub Arc<dyn AuditEmitter>);
