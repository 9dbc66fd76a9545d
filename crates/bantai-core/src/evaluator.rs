//! The evaluator: the core `evaluate_policy` algorithm (§4.5).

use crate::clock::clock_from;
use crate::error::Error;
use crate::ids::{new_event_id, new_evaluation_id};
use crate::observer::{
    AuditEvent, AuditEventType, AuditTool, EventDecision, RuleIdentity, TraceContext,
};
use crate::policy::{Policy, Strategy};
use crate::rule::RuleContext;
use crate::verdict::{Verdict, VerdictKind};
use futures::FutureExt;
use serde_json::Value;
use std::fmt;

/// The binary verdict a policy evaluation produces (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Why a decision came out the way it did (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    PolicyEnforced,
    PolicyViolated,
}

/// One rule's place in a [`PolicyResult`]: its identity and the verdict it
/// produced.
#[derive(Debug, Clone)]
pub struct EvaluatedRule {
    pub id: String,
    pub name: String,
    pub result: Verdict,
}

/// The full record of one `evaluate_policy` call (§3).
#[derive(Debug, Clone)]
pub struct PolicyResult {
    pub decision: Decision,
    pub reason: Reason,
    pub strategy: Strategy,
    pub evaluated_rules: Vec<EvaluatedRule>,
    pub violated_rules: Vec<EvaluatedRule>,
}

/// Per-call overrides for `evaluate_policy` (§4.5: "strategy argument
/// overrides the policy default for that call only").
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateOptions {
    pub strategy: Option<Strategy>,
}

/// Raised by [`throw_policy_violation_error_on_deny`] when a result denies.
/// Distinct from [`crate::error::Error`]: this carries a full `PolicyResult`
/// for callers that prefer exceptional control flow over inspecting the
/// return value (§4.5, §7).
#[derive(Debug, Clone)]
pub struct PolicyViolationError {
    pub policy_id: String,
    pub policy_name: String,
    pub result: PolicyResult,
    message: Option<String>,
}

impl PolicyViolationError {
    /// A multi-line summary naming each violated rule and its reason (§7).
    pub fn prettify(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "policy '{}' ({}) denied{}",
            self.policy_name,
            self.policy_id,
            self.message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
        ));
        for rule in &self.result.violated_rules {
            let reason = rule.result.reason.as_deref().unwrap_or("no reason given");
            lines.push(format!("  - {} ({}): {}", rule.name, rule.id, reason));
        }
        lines.join("\n")
    }
}

impl fmt::Display for PolicyViolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prettify())
    }
}

impl std::error::Error for PolicyViolationError {}

/// Run `policy` against `input` (§4.5).
///
/// 1. Parses `input` against the policy's context, applying defaults; schema
///    failure propagates and no rule runs.
/// 2. Runs each rule in declaration order, converting evaluator/hook panics
///    of the typed kind into a synthetic `deny` rather than aborting.
/// 3. Stops early under `preemptive` at the first `deny`; runs every rule
///    under `exhaustive`.
/// 4. Emits the lifecycle audit events of §6 when an `"audit"` tool is
///    registered on the context.
pub async fn evaluate_policy(
    policy: &Policy,
    input: &Value,
    options: EvaluateOptions,
) -> crate::error::Result<PolicyResult> {
    let parsed = policy.context().parse(input)?;
    let strategy = options.strategy.unwrap_or_else(|| policy.default_strategy());
    let tools = policy.context().tools();
    let clock = clock_from(tools);
    let audit = tools.get::<AuditTool>("audit");
    let trace = trace_from(&parsed);
    let evaluation_id = new_evaluation_id();
    let policy_version = policy.context().version();

    let policy_start_id = new_event_id();
    let eval_start_ms = clock.now_ms();
    if let Some(audit) = &audit {
        audit.0.emit(AuditEvent {
            id: policy_start_id.clone(),
            event_type: AuditEventType::PolicyStart,
            timestamp_ms: eval_start_ms,
            evaluation_id: evaluation_id.clone(),
            policy_id: policy.id().to_string(),
            policy_name: policy.name().to_string(),
            policy_version,
            rule: None,
            decision: None,
            trace: trace.clone(),
            meta: Default::default(),
            parent_id: None,
            duration_ms: None,
        })?;
    }

    let mut evaluated_rules = Vec::with_capacity(policy.rules().len());
    let mut violated_rules = Vec::new();

    for rule in policy.rules() {
        let rule_identity =
            RuleIdentity { id: rule.id().to_string(), name: rule.name().to_string(), version: rule.version() };
        let rule_start_ms = clock.now_ms();
        let rule_start_id = new_event_id();
        if let Some(audit) = &audit {
            audit.0.emit(AuditEvent {
                id: rule_start_id.clone(),
                event_type: AuditEventType::RuleStart,
                timestamp_ms: rule_start_ms,
                evaluation_id: evaluation_id.clone(),
                policy_id: policy.id().to_string(),
                policy_name: policy.name().to_string(),
                policy_version,
                rule: Some(rule_identity.clone()),
                decision: None,
                trace: trace.clone(),
                meta: Default::default(),
                parent_id: Some(policy_start_id.clone()),
                duration_ms: None,
            })?;
        }

        let rule_ctx = RuleContext::new(tools.clone());
        let eval_future = std::panic::AssertUnwindSafe(rule.evaluator().evaluate(&parsed, &rule_ctx));
        let mut verdict = match eval_future.catch_unwind().await {
            Ok(verdict) => verdict,
            Err(panic) => {
                let wrapped = Error::RuleEvaluation {
                    rule: rule.name().to_string(),
                    message: panic_message(&panic),
                };
                tracing::warn!(rule = rule.name(), error = %wrapped, "rule evaluator panicked");
                Verdict::synthetic_error(wrapped.to_string(), false)
            }
        };

        if !verdict.is_skip() {
            let hook = match verdict.kind {
                VerdictKind::Allow => rule.hooks().on_allow.as_ref(),
                VerdictKind::Deny => rule.hooks().on_deny.as_ref(),
                VerdictKind::Skip => None,
            };
            if let Some(hook) = hook {
                if let Err(err) = hook.run(&verdict, &rule_ctx).await {
                    let wrapped = Error::Hook { rule: rule.name().to_string(), message: err.to_string() };
                    tracing::warn!(rule = rule.name(), error = %wrapped, "rule hook failed");
                    verdict = Verdict::synthetic_error(wrapped.to_string(), err.is_transient());
                }
            }
        }

        let public_verdict = verdict.public();
        let outcome = match public_verdict.kind {
            VerdictKind::Allow => "allow",
            VerdictKind::Deny => "deny",
            VerdictKind::Skip => "skip",
        };
        let rule_end_ms = clock.now_ms();
        if let Some(audit) = &audit {
            audit.0.emit(AuditEvent {
                id: new_event_id(),
                event_type: AuditEventType::RuleDecision,
                timestamp_ms: rule_end_ms,
                evaluation_id: evaluation_id.clone(),
                policy_id: policy.id().to_string(),
                policy_name: policy.name().to_string(),
                policy_version,
                rule: Some(rule_identity.clone()),
                decision: Some(EventDecision { outcome: outcome.to_string(), reason: public_verdict.reason.clone() }),
                trace: trace.clone(),
                meta: public_verdict.meta.clone(),
                parent_id: Some(rule_start_id.clone()),
                duration_ms: None,
            })?;
            audit.0.emit(AuditEvent {
                id: new_event_id(),
                event_type: AuditEventType::RuleEnd,
                timestamp_ms: rule_end_ms,
                evaluation_id: evaluation_id.clone(),
                policy_id: policy.id().to_string(),
                policy_name: policy.name().to_string(),
                policy_version,
                rule: Some(rule_identity.clone()),
                decision: None,
                trace: trace.clone(),
                meta: Default::default(),
                parent_id: Some(rule_start_id),
                duration_ms: Some(rule_end_ms.saturating_sub(rule_start_ms)),
            })?;
        }

        let evaluated = EvaluatedRule { id: rule.id().to_string(), name: rule.name().to_string(), result: public_verdict.clone() };
        evaluated_rules.push(evaluated.clone());

        match public_verdict.kind {
            VerdictKind::Allow | VerdictKind::Skip => {}
            VerdictKind::Deny => {
                violated_rules.push(evaluated);
                if strategy == Strategy::Preemptive {
                    break;
                }
            }
        }
    }

    let decision = if violated_rules.is_empty() { Decision::Allow } else { Decision::Deny };
    let reason = if violated_rules.is_empty() { Reason::PolicyEnforced } else { Reason::PolicyViolated };

    let eval_end_ms = clock.now_ms();
    if let Some(audit) = &audit {
        audit.0.emit(AuditEvent {
            id: new_event_id(),
            event_type: AuditEventType::PolicyDecision,
            timestamp_ms: eval_end_ms,
            evaluation_id: evaluation_id.clone(),
            policy_id: policy.id().to_string(),
            policy_name: policy.name().to_string(),
            policy_version,
            rule: None,
            decision: Some(EventDecision {
                outcome: if decision == Decision::Allow { "allow".into() } else { "deny".into() },
                reason: Some(match reason {
                    Reason::PolicyEnforced => "policy_enforced".to_string(),
                    Reason::PolicyViolated => "policy_violated".to_string(),
                }),
            }),
            trace: trace.clone(),
            meta: Default::default(),
            parent_id: Some(policy_start_id.clone()),
            duration_ms: None,
        })?;
        audit.0.emit(AuditEvent {
            id: new_event_id(),
            event_type: AuditEventType::PolicyEnd,
            timestamp_ms: eval_end_ms,
            evaluation_id,
            policy_id: policy.id().to_string(),
            policy_name: policy.name().to_string(),
            policy_version,
            rule: None,
            decision: None,
            trace,
            meta: Default::default(),
            parent_id: Some(policy_start_id),
            duration_ms: Some(eval_end_ms.saturating_sub(eval_start_ms)),
        })?;
    }

    Ok(PolicyResult { decision, reason, strategy, evaluated_rules, violated_rules })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "rule evaluator panicked with a non-string payload".to_string()
    }
}

fn trace_from(parsed: &Value) -> Option<TraceContext> {
    let trace = parsed.get("trace")?.as_object()?;
    Some(TraceContext {
        trace_id: trace.get("traceId").and_then(Value::as_str).map(str::to_string),
        request_id: trace.get("requestId").and_then(Value::as_str).map(str::to_string),
    })
}

/// Raise a [`PolicyViolationError`] when `result.decision` is `deny`; a no-op
/// on `allow` (§4.5).
pub fn throw_policy_violation_error_on_deny(
    result: PolicyResult,
    policy: &Policy,
    message: Option<String>,
) -> Result<PolicyResult, PolicyViolationError> {
    if result.decision == Decision::Deny {
        Err(PolicyViolationError {
            policy_id: policy.id().to_string(),
            policy_name: policy.name().to_string(),
            result,
            message,
        })
    } else {
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::policy::define_policy;
    use crate::rule::{define_rule, Hooks, RuleEvaluator};
    use crate::schema::{FieldKind, Schema};
    use crate::tools::ToolBag;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct MinAge(i64);

    #[async_trait]
    impl RuleEvaluator for MinAge {
        async fn evaluate(&self, input: &Value, _ctx: &RuleContext) -> Verdict {
            match input.get("age").and_then(Value::as_i64) {
                Some(age) if age >= self.0 => Verdict::allow(),
                _ => Verdict::deny().with_reason("not adult"),
            }
        }
    }

    struct RequireRole(&'static str);

    #[async_trait]
    impl RuleEvaluator for RequireRole {
        async fn evaluate(&self, input: &Value, _ctx: &RuleContext) -> Verdict {
            match input.get("role").and_then(Value::as_str) {
                Some(role) if role == self.0 => Verdict::allow(),
                _ => Verdict::deny().with_reason("not admin"),
            }
        }
    }

    fn sample_context() -> Context {
        let schema = Schema::record([
            ("age", FieldKind::Int),
            ("role", FieldKind::Enum(vec!["admin".into(), "user".into()])),
        ]);
        Context::define_simple(schema).unwrap()
    }

    fn sample_policy(strategy: Option<Strategy>) -> Policy {
        let ctx = sample_context();
        let rules = vec![
            define_rule(ctx.clone(), "age check", Arc::new(MinAge(18)), Hooks::none()).unwrap(),
            define_rule(ctx.clone(), "role check", Arc::new(RequireRole("admin")), Hooks::none()).unwrap(),
        ];
        define_policy(ctx, "admission", rules, strategy).unwrap()
    }

    #[tokio::test]
    async fn preemptive_stops_at_first_deny() {
        let policy = sample_policy(Some(Strategy::Preemptive));
        let result = evaluate_policy(&policy, &json!({"age": 17, "role": "admin"}), EvaluateOptions::default())
            .await
            .unwrap();
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.evaluated_rules.len(), 1);
        assert_eq!(result.violated_rules.len(), 1);
        assert_eq!(result.violated_rules[0].name, "age check");
    }

    #[tokio::test]
    async fn exhaustive_collects_all_violations() {
        let policy = sample_policy(Some(Strategy::Exhaustive));
        let result = evaluate_policy(&policy, &json!({"age": 17, "role": "user"}), EvaluateOptions::default())
            .await
            .unwrap();
        assert_eq!(result.evaluated_rules.len(), 2);
        assert_eq!(result.violated_rules.len(), 2);
    }

    #[tokio::test]
    async fn call_strategy_overrides_policy_default() {
        let policy = sample_policy(Some(Strategy::Preemptive));
        let result = evaluate_policy(
            &policy,
            &json!({"age": 17, "role": "user"}),
            EvaluateOptions { strategy: Some(Strategy::Exhaustive) },
        )
        .await
        .unwrap();
        assert_eq!(result.strategy, Strategy::Exhaustive);
        assert_eq!(result.evaluated_rules.len(), 2);
    }

    #[tokio::test]
    async fn empty_rule_list_allows() {
        let ctx = sample_context();
        let policy = define_policy(ctx, "noop", vec![], None).unwrap();
        let result = evaluate_policy(&policy, &json!({"age": 30, "role": "admin"}), EvaluateOptions::default())
            .await
            .unwrap();
        assert_eq!(result.decision, Decision::Allow);
    }

    #[tokio::test]
    async fn all_rules_allow_yields_allow() {
        let policy = sample_policy(None);
        let result = evaluate_policy(&policy, &json!({"age": 30, "role": "admin"}), EvaluateOptions::default())
            .await
            .unwrap();
        assert_eq!(result.decision, Decision::Allow);
        assert_eq!(result.reason, Reason::PolicyEnforced);
    }

    #[tokio::test]
    async fn schema_failure_propagates_before_any_rule_runs() {
        let policy = sample_policy(None);
        let err = evaluate_policy(&policy, &json!({"role": "admin"}), EvaluateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Schema(_)));
    }

    #[tokio::test]
    async fn throw_helper_is_noop_on_allow_and_raises_on_deny() {
        let policy = sample_policy(None);
        let allow_result = evaluate_policy(&policy, &json!({"age": 30, "role": "admin"}), EvaluateOptions::default())
            .await
            .unwrap();
        assert!(throw_policy_violation_error_on_deny(allow_result, &policy, None).is_ok());

        let deny_result = evaluate_policy(&policy, &json!({"age": 17, "role": "admin"}), EvaluateOptions::default())
            .await
            .unwrap();
        let err = throw_policy_violation_error_on_deny(deny_result, &policy, None).unwrap_err();
        assert!(err.prettify().contains("age check"));
    }

    struct FailingEvaluator;

    #[async_trait]
    impl RuleEvaluator for FailingEvaluator {
        async fn evaluate(&self, _input: &Value, ctx: &RuleContext) -> Verdict {
            if ctx.tools().contains("force-error") {
                Verdict::synthetic_error("boom", false)
            } else {
                Verdict::allow()
            }
        }
    }

    #[tokio::test]
    async fn evaluator_failure_becomes_synthetic_deny() {
        let schema = Schema::empty();
        let tools = ToolBag::new().with_tool("force-error", true);
        let ctx = Context::define(schema, json!({}), tools).unwrap();
        let rule = define_rule(ctx.clone(), "flaky", Arc::new(FailingEvaluator), Hooks::none()).unwrap();
        let policy = define_policy(ctx, "p", vec![rule], None).unwrap();
        let result = evaluate_policy(&policy, &json!({}), EvaluateOptions::default()).await.unwrap();
        assert_eq!(result.decision, Decision::Deny);
        assert_eq!(result.violated_rules[0].result.meta.get("error").unwrap(), &json!("boom"));
    }

    struct PanickingEvaluator;

    #[async_trait]
    impl RuleEvaluator for PanickingEvaluator {
        async fn evaluate(&self, _input: &Value, _ctx: &RuleContext) -> Verdict {
            panic!("rule blew up");
        }
    }

    #[tokio::test]
    async fn evaluator_panic_becomes_synthetic_deny_without_unwinding() {
        let ctx = Context::define_simple(Schema::empty()).unwrap();
        let rule = define_rule(ctx.clone(), "panics", Arc::new(PanickingEvaluator), Hooks::none()).unwrap();
        let policy = define_policy(ctx, "p", vec![rule], None).unwrap();
        let result = evaluate_policy(&policy, &json!({}), EvaluateOptions::default()).await.unwrap();
        assert_eq!(result.decision, Decision::Deny);
        let message = result.violated_rules[0].result.meta.get("error").unwrap().as_str().unwrap();
        assert!(message.contains("rule blew up"));
    }
}
