//! Deterministic policy evaluation: Context, Rule, Policy, and the
//! `evaluate_policy` algorithm, plus the storage and audit extension points
//! the rate-limit and audit crates build on.

pub mod clock;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod ids;
pub mod observer;
pub mod policy;
pub mod rule;
pub mod schema;
pub mod storage;
pub mod tools;
pub mod verdict;

pub use clock::{system_clock, Clock, ClockTool, ManualClock, SharedClock, SystemClock};
pub use context::Context;
pub use error::{Error, Result};
pub use evaluator::{
    evaluate_policy, throw_policy_violation_error_on_deny, Decision, EvaluateOptions,
    EvaluatedRule, PolicyResult, PolicyViolationError, Reason,
};
pub use observer::{
    AuditEmitter, AuditEvent, AuditEventType, AuditTool, EventDecision, RuleIdentity, TraceContext,
};
pub use policy::{define_policy, Policy, Strategy};
pub use rule::{define_rule, Hook, Hooks, Rule, RuleContext, RuleEvaluator};
pub use schema::{FieldKind, Schema};
pub use storage::{with_storage, InMemoryStorageAdapter, StorageAdapter, StorageTool};
pub use tools::ToolBag;
pub use verdict::{Verdict, VerdictKind};

/// Crate version, exported for diagnostics and audit-event metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a default `tracing` subscriber. Embedding hosts that already
/// configure `tracing` should skip this and initialize their own subscriber
/// instead.
pub fn init() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .init();
}
