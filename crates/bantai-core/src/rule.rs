//! Rule: a named asynchronous predicate bound to a Context (§3, §4.3).

use crate::context::Context;
use crate::error::{Error, Result};
use crate::ids::rule_id;
use crate::tools::ToolBag;
use crate::verdict::Verdict;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// What a rule evaluator sees besides the parsed input: the context's tool
/// bag, and (when the rate-limit extension is in play) the current limit
/// state merged into scope by that extension.
#[derive(Clone)]
pub struct RuleContext {
    tools: ToolBag,
}

impl RuleContext {
    /// Build a rule context around a tool bag.
    pub fn new(tools: ToolBag) -> Self {
        Self { tools }
    }

    /// The tool bag exposed to the evaluator.
    pub fn tools(&self) -> &ToolBag {
        &self.tools
    }
}

/// Core trait every rule evaluator implements — an async, `Send + Sync`
/// predicate over the parsed input.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Evaluate `input` and produce a verdict.
    async fn evaluate(&self, input: &Value, ctx: &RuleContext) -> Verdict;
}

/// A hook run after the evaluator, keyed by the resulting verdict
/// (§4.3: `onAllow`/`onDeny`).
#[async_trait]
pub trait Hook: Send + Sync {
    /// Run the hook. An `Err` here is surfaced as a rule error (§4.3, §7).
    async fn run(&self, verdict: &Verdict, ctx: &RuleContext) -> Result<()>;
}

/// The optional `onAllow`/`onDeny` hook pair for a rule.
#[derive(Clone, Default)]
pub struct Hooks {
    pub on_allow: Option<Arc<dyn Hook>>,
    pub on_deny: Option<Arc<dyn Hook>>,
}

impl Hooks {
    /// No hooks.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the `onAllow` hook.
    pub fn with_on_allow(mut self, hook: Arc<dyn Hook>) -> Self {
        self.on_allow = Some(hook);
        self
    }

    /// Set the `onDeny` hook.
    pub fn with_on_deny(mut self, hook: Arc<dyn Hook>) -> Self {
        self.on_deny = Some(hook);
        self
    }
}

/// A named rule: id, evaluator, optional hooks, and the context it is bound
/// to (§3).
#[derive(Clone)]
pub struct Rule {
    id: String,
    name: String,
    version: &'static str,
    context: Context,
    evaluator: Arc<dyn RuleEvaluator>,
    hooks: Hooks,
}

impl Rule {
    /// The rule's `rule:<slug>` id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The rule's human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule's version tag, inherited from its bound context.
    pub fn version(&self) -> &'static str {
        self.version
    }

    /// The context this rule is bound to.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The evaluator function.
    pub fn evaluator(&self) -> &Arc<dyn RuleEvaluator> {
        &self.evaluator
    }

    /// The hook pair.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }
}

/// Define a new rule bound to `context`. `name` is normalized into `id` via
/// [`rule_id`] (§4.3).
pub fn define_rule(
    context: Context,
    name: impl Into<String>,
    evaluator: Arc<dyn RuleEvaluator>,
    hooks: Hooks,
) -> Result<Rule> {
    let name = name.into();
    if name.trim().is_empty() {
        return Err(Error::Definition("rule name must not be empty".into()));
    }
    let id = rule_id(&name);
    let version = context.version();
    Ok(Rule { id, name, version, context, evaluator, hooks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::tools::ToolBag;

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

    #[test]
    fn name_is_normalized_into_id() {
        let rule = define_rule(ctx(), "Is Adult?", Arc::new(AlwaysAllow), Hooks::none()).unwrap();
        assert_eq!(rule.id(), "rule:is-adult");
        assert_eq!(rule.name(), "Is Adult?");
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = define_rule(ctx(), "   ", Arc::new(AlwaysAllow), Hooks::none()).unwrap_err();
        assert!(matches!(err, Error::Definition(_)));
    }

    #[tokio::test]
    async fn evaluator_runs_through_trait_object() {
        let rule = define_rule(ctx(), "always", Arc::new(AlwaysAllow), Hooks::none()).unwrap();
        let result = rule
            .evaluator()
            .evaluate(&Value::Null, &RuleContext::new(ToolBag::new()))
            .await;
        assert!(result.is_allow());
    }
}
