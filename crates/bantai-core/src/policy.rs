//! Policy: an ordered, named collection of rules sharing one context (§3, §4.4).

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ids::policy_id;
use crate::rule::Rule;
use std::collections::HashSet;

/// The two evaluation strategies a policy can run under (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Stop at the first `deny`.
    Preemptive,
    /// Evaluate every rule regardless of prior denials.
    Exhaustive,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Preemptive
    }
}

/// A named, ordered sequence of rules bound to one context, plus a default
/// strategy (§3).
#[derive(Clone)]
pub struct Policy {
    id: String,
    name: String,
    context: Context,
    rules: Vec<Rule>,
    default_strategy: Strategy,
}

impl Policy {
    /// The policy's `policy:<slug>` id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The policy's human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context every rule in this policy is bound to.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The strategy used when a call to `evaluate_policy` omits one.
    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }
}

/// Define a policy. Rule order is preserved as given; duplicate rule names
/// are rejected (§4.4).
pub fn define_policy(
    context: Context,
    name: impl Into<String>,
    rules: Vec<Rule>,
    default_strategy: Option<Strategy>,
) -> Result<Policy> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(Error::Definition("policy name must not be empty".into()));
    }

    let mut seen = HashSet::with_capacity(rules.len());
    for rule in &rules {
        if !seen.insert(rule.name().to_string()) {
            return Err(Error::Definition(format!(
                "duplicate rule name '{}' in policy '{}'",
                rule.name(),
                name
            )));
        }
        if !rule.context().schema().is_superset_of(context.schema()) {
            return Err(Error::Definition(format!(
                "rule '{}' is bound to a context incompatible with policy '{}'",
                rule.name(),
                name
            )));
        }
    }

    let id = policy_id(&name);
    Ok(Policy {
        id,
        name,
        context,
        rules,
        default_strategy: default_strategy.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{define_rule, Hooks, RuleContext, RuleEvaluator};
    use crate::schema::Schema;
    use crate::verdict::Verdict;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct AlwaysAllow;

    #[async_trait]
    impl RuleEvaluator for AlwaysAllow {
        async fn evaluate(&self, _input: &Value, _ctx: &RuleContext) -> Verdict {
            Verdict::allow()
        }
    }

    fn ctx() -> Context {
        Context::define_simple(Schema::empty()).unwrap()
    }

    fn rule(name: &str) -> Rule {
        define_rule(ctx(), name, Arc::new(AlwaysAllow), Hooks::none()).unwrap()
    }

    #[test]
    fn default_strategy_is_preemptive() {
        let policy = define_policy(ctx(), "p", vec![], None).unwrap();
        assert_eq!(policy.default_strategy(), Strategy::Preemptive);
    }

    #[test]
    fn explicit_strategy_overrides_default() {
        let policy = define_policy(ctx(), "p", vec![], Some(Strategy::Exhaustive)).unwrap();
        assert_eq!(policy.default_strategy(), Strategy::Exhaustive);
    }

    #[test]
    fn preserves_rule_order() {
        let policy = define_policy(ctx(), "p", vec![rule("a"), rule("b")], None).unwrap();
        let names: Vec<&str> = policy.rules().iter().map(Rule::name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn rejects_duplicate_rule_names() {
        let err = define_policy(ctx(), "p", vec![rule("a"), rule("a")], None).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
    }

    #[test]
    fn rejects_empty_name() {
        let err = define_policy(ctx(), "  ", vec![], None).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
    }

    #[test]
    fn accepts_rule_with_superset_context() {
        let base = ctx();
        let wider = base
            .extend(crate::schema::Schema::record([("extra", crate::schema::FieldKind::Any.optional())]), serde_json::json!({}), crate::tools::ToolBag::new())
            .unwrap();
        let rule = define_rule(wider, "a", Arc::new(AlwaysAllow), Hooks::none()).unwrap();
        assert!(define_policy(base, "p", vec![rule], None).is_ok());
    }

    #[test]
    fn rejects_rule_with_incompatible_context() {
        let policy_ctx = Context::define_simple(crate::schema::Schema::record([(
            "age",
            crate::schema::FieldKind::Int,
        )]))
        .unwrap();
        let rule_ctx = ctx();
        let rule = define_rule(rule_ctx, "a", Arc::new(AlwaysAllow), Hooks::none()).unwrap();
        let err = define_policy(policy_ctx, "p", vec![rule], None).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
    }
}
