//! Common imports for embedding hosts: `use bantai::prelude::*;`.

pub use crate::{
    define_policy, define_rule, define_rate_limit_rule, evaluate_policy,
    throw_policy_violation_error_on_deny, with_audit, with_rate_limit, with_storage, Context,
    Decision, Error, EvaluateOptions, Hook, Hooks, InMemoryStorageAdapter, Policy, PolicyResult,
    PolicyViolationError, Reason, Result, Rule, RuleContext, RuleEvaluator, Schema, FieldKind,
    Strategy, StorageAdapter, Verdict, VerdictKind,
};
