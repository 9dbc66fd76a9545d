//! `define_rate_limit_rule`: wraps user rule logic with the two-phase
//! pre-check / post-commit semantics of §4.7.

use crate::algorithm::RateLimitAlgorithm;
use crate::fixed_window::FixedWindow;
use crate::sliding_window::SlidingWindow;
use crate::token_bucket::TokenBucket;
use async_trait::async_trait;
use bantai_core::{
    clock::clock_from, ids::slugify, storage::StorageTool, Context, Error, Hook, Hooks, Result,
    Rule, RuleContext, RuleEvaluator, SharedClock, Verdict,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Internal verdict-meta key the pre-check evaluator uses to hand the
/// committed key and cost to the post-commit hook, so the two phases need no
/// shared mutable state across concurrent evaluations of the same rule. The
/// `__` prefix marks it as bookkeeping `evaluate_policy` strips via
/// `Verdict::public()` before the verdict is recorded or audited.
const PENDING_COMMIT_KEY: &str = "__bantai_rate_limit_pending";

/// Which algorithm a rate-limit rule enforces (§4.7.1-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    FixedWindow,
    SlidingWindow,
    TokenBucket,
}

/// The static configuration for one rate-limit rule; may be overridden
/// per-call by an input's own `rateLimit` field (§4.7: "merge per-rule
/// config into per-input config").
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub key: Option<String>,
    pub kind: RateLimitKind,
    pub limit: u64,
    pub period_ms: u64,
    pub cost: u64,
}

impl RateLimitConfig {
    /// Overlay any `rateLimit.{key,type,limit,period,cost}` fields present on
    /// `input` onto this configuration.
    fn merged_with_input(&self, input: &Value) -> Result<RateLimitConfig> {
        let Some(overrides) = input.get("rateLimit").and_then(Value::as_object) else {
            return Ok(self.clone());
        };

        let key = overrides
            .get("key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| self.key.clone());
        let kind = match overrides.get("type").and_then(Value::as_str) {
            Some("fixed-window") => RateLimitKind::FixedWindow,
            Some("sliding-window") => RateLimitKind::SlidingWindow,
            Some("token-bucket") => RateLimitKind::TokenBucket,
            _ => self.kind,
        };
        let limit = overrides.get("limit").and_then(Value::as_u64).unwrap_or(self.limit);
        let period_ms = match overrides.get("period").and_then(Value::as_str) {
            Some(period) => crate::duration::parse_duration(period)?,
            None => self.period_ms,
        };
        let cost = overrides.get("cost").and_then(Value::as_u64).unwrap_or(self.cost);

        Ok(RateLimitConfig { key, kind, limit, period_ms, cost })
    }

    fn build_algorithm(&self) -> Arc<dyn RateLimitAlgorithm> {
        match self.kind {
            RateLimitKind::FixedWindow => Arc::new(FixedWindow { limit: self.limit, period_ms: self.period_ms }),
            RateLimitKind::SlidingWindow => Arc::new(SlidingWindow { limit: self.limit, period_ms: self.period_ms }),
            RateLimitKind::TokenBucket => Arc::new(TokenBucket { limit: self.limit, period_ms: self.period_ms }),
        }
    }
}

/// Caller-supplied pieces for `define_rate_limit_rule`: the base config and
/// optional notification hooks layered on top of the built-in bookkeeping
/// hook (§4.7).
pub struct RateLimitRuleConfig {
    pub config: RateLimitConfig,
    pub on_allow: Option<Arc<dyn Hook>>,
    pub on_deny: Option<Arc<dyn Hook>>,
}

struct RateLimitEvaluator {
    rule_name_slug: String,
    config: RateLimitConfig,
    clock: SharedClock,
    user_evaluator: Arc<dyn RuleEvaluator>,
}

#[async_trait]
impl RuleEvaluator for RateLimitEvaluator {
    async fn evaluate(&self, input: &Value, ctx: &RuleContext) -> Verdict {
        let storage = match ctx.tools().get::<StorageTool>("storage") {
            Some(tool) => tool.0.clone(),
            None => {
                return Verdict::synthetic_error(
                    "rate limit rule requires a 'storage' tool registered on the context",
                    false,
                )
            }
        };

        let config = match self.config.merged_with_input(input) {
            Ok(config) => config,
            Err(err) => return Verdict::synthetic_error(err.to_string(), err.is_transient()),
        };
        let resolved_key = config.key.clone().unwrap_or_else(|| "unknown-key".to_string());
        let effective_key = format!("rules:{}:{}", self.rule_name_slug, resolved_key);
        let algorithm = config.build_algorithm();
        let now_ms = self.clock.now_ms();

        let check = match algorithm.check(storage.as_ref(), &effective_key, now_ms, config.cost).await {
            Ok(check) => check,
            Err(err) => return Verdict::synthetic_error(err.to_string(), err.is_transient()),
        };
        if !check.allowed {
            return Verdict::deny()
                .with_reason(check.reason.unwrap_or_else(|| "rate limit exceeded".into()))
                .with_meta("remaining", check.remaining)
                .with_meta("resetAt", check.reset_at_ms);
        }

        let mut augmented = input.clone();
        if let Some(obj) = augmented.as_object_mut() {
            obj.insert(
                "currentLimit".to_string(),
                json!({ "remaining": check.remaining, "resetAt": check.reset_at_ms }),
            );
        }

        let mut verdict = self.user_evaluator.evaluate(&augmented, ctx).await;
        if verdict.is_allow() {
            verdict = verdict.with_meta(
                PENDING_COMMIT_KEY,
                json!({ "key": effective_key, "cost": config.cost }),
            );
        }
        verdict
    }
}

struct RateLimitAllowHook {
    config: RateLimitConfig,
    clock: SharedClock,
    user_hook: Option<Arc<dyn Hook>>,
}

#[async_trait]
impl Hook for RateLimitAllowHook {
    async fn run(&self, verdict: &Verdict, ctx: &RuleContext) -> Result<()> {
        if let Some(pending) = verdict.meta.get(PENDING_COMMIT_KEY) {
            let key = pending
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Definition("malformed rate limit commit metadata".into()))?;
            let cost = pending.get("cost").and_then(Value::as_u64).unwrap_or(1);
            let storage = ctx
                .tools()
                .get::<StorageTool>("storage")
                .ok_or_else(|| Error::Definition("rate limit rule requires a 'storage' tool registered on the context".into()))?;
            let algorithm = self.config.build_algorithm();
            let now_ms = self.clock.now_ms();
            algorithm.increment(storage.0.as_ref(), key, now_ms, cost).await?;
        }

        if let Some(hook) = &self.user_hook {
            hook.run(verdict, ctx).await?;
        }
        Ok(())
    }
}

/// Build a rate-limited rule: pre-check inside the evaluator, capacity
/// consumption in an `onAllow` hook, composed with any caller-supplied
/// `onAllow`/`onDeny` hooks (§4.7).
pub fn define_rate_limit_rule(
    context: Context,
    name: impl Into<String>,
    user_evaluator: Arc<dyn RuleEvaluator>,
    rule_config: RateLimitRuleConfig,
) -> Result<Rule> {
    let name = name.into();
    let clock = clock_from(context.tools());

    let evaluator = Arc::new(RateLimitEvaluator {
        rule_name_slug: slugify(&name),
        config: rule_config.config.clone(),
        clock: clock.clone(),
        user_evaluator,
    });

    let on_allow = Arc::new(RateLimitAllowHook {
        config: rule_config.config,
        clock,
        user_hook: rule_config.on_allow,
    });

    let mut hooks = Hooks::none().with_on_allow(on_allow);
    if let Some(on_deny) = rule_config.on_deny {
        hooks = hooks.with_on_deny(on_deny);
    }

    bantai_core::define_rule(context, name, evaluator, hooks)
}
