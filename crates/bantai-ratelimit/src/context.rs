//! `with_rate_limit`: the context extension that reserves the input
//! schema's `rateLimit` field (§4.7 "Schema fragment").

use bantai_core::schema::{FieldKind, Schema};
use bantai_core::{Context, Result, ToolBag};
use serde_json::{json, Value};

/// Validate the `rateLimit.period` field, if present, against the duration
/// grammar at schema time — so a malformed period is `Error::Schema` raised
/// by `Context::parse` before any rule runs, not a rule-evaluator failure.
/// Other `rateLimit` fields stay unvalidated here and are read out by
/// [`crate::rule::RateLimitConfig::merged_with_input`].
fn validate_rate_limit_field(value: &Value) -> Result<()> {
    let Some(period) = value.get("period").and_then(Value::as_str) else {
        return Ok(());
    };
    crate::duration::parse_duration(period).map(|_| ())
}

/// Extend `context` with an optional `rateLimit` input field.
pub fn with_rate_limit(context: &Context) -> Result<Context> {
    let schema = Schema::record([("rateLimit", FieldKind::Custom(validate_rate_limit_field).optional())]);
    context.extend(schema, json!({}), ToolBag::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_optional_rate_limit_field() {
        let base = Context::define_simple(Schema::empty()).unwrap();
        let extended = with_rate_limit(&base).unwrap();
        assert!(extended.parse(&json!({})).is_ok());
        assert!(extended
            .parse(&json!({"rateLimit": {"key": "alice", "type": "fixed-window", "limit": 10, "period": "1m"}}))
            .is_ok());
    }

    #[test]
    fn rejects_invalid_period_before_any_rule_runs() {
        let base = Context::define_simple(Schema::empty()).unwrap();
        let extended = with_rate_limit(&base).unwrap();
        let err = extended
            .parse(&json!({"rateLimit": {"key": "alice", "type": "fixed-window", "limit": 10, "period": "nope"}}))
            .unwrap_err();
        assert!(matches!(err, bantai_core::Error::Schema(_)));
    }

    #[test]
    fn missing_period_is_not_validated() {
        let base = Context::define_simple(Schema::empty()).unwrap();
        let extended = with_rate_limit(&base).unwrap();
        assert!(extended.parse(&json!({"rateLimit": {"key": "alice"}})).is_ok());
    }
}
