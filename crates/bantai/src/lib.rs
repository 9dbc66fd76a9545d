//! # Bantai
//!
//! A deterministic policy evaluation engine for access, quota, and admission
//! decisions.
//!
//! ## Overview
//!
//! Bantai evaluates a `Policy` — an ordered list of `Rule`s bound to a
//! shared `Context` — against an input record, producing a `PolicyResult`
//! that is either `allow` or `deny`, carrying every rule's verdict along the
//! way:
//!
//! - **Context**: the schema, defaults, and pluggable tools (storage, audit,
//!   a clock) a set of rules share.
//! - **Rule**: one async evaluator plus optional `onAllow`/`onDeny` hooks.
//! - **Policy**: rules run in declaration order, either stopping at the
//!   first `deny` (`preemptive`) or collecting every violation
//!   (`exhaustive`).
//! - **Evaluator**: `evaluate_policy` runs the algorithm above and emits
//!   audit events when an audit tool is registered.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bantai::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> bantai::Result<()> {
//!     let schema = Schema::record([("age", FieldKind::Int)]);
//!     let ctx = Context::define_simple(schema)?;
//!     let rule = define_rule(ctx.clone(), "adult", my_evaluator, Hooks::none())?;
//!     let policy = define_policy(ctx, "admission", vec![rule], None)?;
//!
//!     let result = evaluate_policy(&policy, &serde_json::json!({"age": 30}), EvaluateOptions::default()).await?;
//!     println!("{:?}", result.decision);
//!     Ok(())
//! }
//! ```
//!
//! ## Rate limiting
//!
//! `with_rate_limit` and `define_rate_limit_rule` add fixed-window,
//! sliding-window, or token-bucket rate limiting backed by any
//! `StorageAdapter` — an in-memory reference adapter ships in this crate,
//! and `bantai-storage-redis` (enabled by the `redis-storage` feature)
//! provides a distributed one.
//!
//! ## Audit trail
//!
//! `with_audit` registers sinks that receive the lifecycle events of every
//! evaluation; `bantai_audit::build_explain_trees` reconstructs a
//! human-readable trace from the flat event stream.

pub mod prelude;

pub use bantai_core::{
    define_policy, define_rule, evaluate_policy, throw_policy_violation_error_on_deny, Clock,
    ClockTool, Context, Decision, Error, EvaluateOptions, EvaluatedRule, Hook, Hooks,
    InMemoryStorageAdapter, Policy, PolicyResult, PolicyViolationError, Reason, Result, Rule,
    RuleContext, RuleEvaluator, SharedClock, Schema, FieldKind, Strategy, StorageAdapter,
    StorageTool, SystemClock, ToolBag, Verdict, VerdictKind, with_storage,
};

pub use bantai_ratelimit::{
    define_rate_limit_rule, load_tiers, with_rate_limit, CheckResult, RateLimitAlgorithm,
    RateLimitConfig, RateLimitKind, RateLimitRuleConfig, RateLimitTierConfig, RateLimitTiers,
};

pub use bantai_audit::{
    build_explain_trees, render_tree, to_wire, with_audit, ExplainNode, InMemorySink, Sink,
    TracingSink, WireEvent,
};

#[cfg(feature = "redis-storage")]
pub use bantai_storage_redis::RedisStorageAdapter;

/// Crate version, exported for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a default `tracing` subscriber driven by `RUST_LOG`. Embedding
/// hosts that already configure `tracing` should skip this and initialize
/// their own subscriber instead.
pub fn init() {
    bantai_core::init();
}
