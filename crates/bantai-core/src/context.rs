//! Context: schema + defaults + tools, bounding a Rule and Policy (§3, §4.2).

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::tools::ToolBag;
use serde_json::Value;

/// Forward-compatibility tag assigned to every `Context` (§4.2: "v1").
pub const CONTEXT_VERSION: &str = "v1";

/// Immutable bundle of input schema, partial defaults, and a tool bag.
/// Extensions (`with_rate_limit`, `with_audit`, `with_storage`) are
/// higher-order transformers that return a new, structurally extended
/// `Context` (§3: "extending a context never removes keys").
#[derive(Clone)]
pub struct Context {
    schema: Schema,
    defaults: Value,
    tools: ToolBag,
    version: &'static str,
}

impl Context {
    /// Define a new context. `defaults` must validate against `schema` in
    /// partial mode (§4.2).
    pub fn define(schema: Schema, defaults: Value, tools: ToolBag) -> Result<Self> {
        schema.validate(&defaults, true)?;
        Ok(Self { schema, defaults, tools, version: CONTEXT_VERSION })
    }

    /// Define a context with empty defaults and tools.
    pub fn define_simple(schema: Schema) -> Result<Self> {
        Self::define(schema, Value::Object(Default::default()), ToolBag::new())
    }

    /// The structural schema for this context's input.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The partial default input values.
    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    /// The tool bag.
    pub fn tools(&self) -> &ToolBag {
        &self.tools
    }

    /// The context's forward-compatibility version tag.
    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Parse `input` against this context: apply defaults, then validate the
    /// merged record against the schema (§4.5 step 1).
    pub fn parse(&self, input: &Value) -> Result<Value> {
        let merged = self.schema.apply_defaults(input, &self.defaults);
        self.schema.validate(&merged, false)?;
        Ok(merged)
    }

    /// Merge `contexts` into one: shallow field union of schemas (later
    /// wins), deep merge of defaults, and later-wins merge of tools (§4.2).
    /// Errors if `contexts` is empty.
    pub fn compose<'a, I>(contexts: I) -> Result<Context>
    where
        I: IntoIterator<Item = &'a Context>,
    {
        let mut iter = contexts.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::Definition("compose_context requires at least one context".into()))?;

        let mut schema = first.schema.clone();
        let mut defaults = first.defaults.clone();
        let mut tools = first.tools.clone();

        for next in iter {
            schema = schema.merge(&next.schema);
            defaults = deep_merge(&defaults, &next.defaults);
            tools = tools.merged_with(&next.tools);
        }

        Ok(Context { schema, defaults, tools, version: CONTEXT_VERSION })
    }

    /// Extend this context with additional schema fields, defaults, and
    /// tools — the shape every `with_*` extension uses (§4.2, §9: "copy on
    /// extend transformers").
    pub fn extend(&self, schema: Schema, defaults: Value, tools: ToolBag) -> Result<Context> {
        let extension = Context::define(schema, defaults, tools)?;
        Context::compose([self, &extension])
    }
}

/// Deep-merge two JSON objects: nested objects merge recursively, scalars and
/// arrays from `b` replace those in `a` (§4.2).
fn deep_merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Object(a_map), Value::Object(b_map)) => {
            let mut merged = a_map.clone();
            for (key, b_value) in b_map {
                let merged_value = match merged.get(key) {
                    Some(a_value) => deep_merge(a_value, b_value),
                    None => b_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => b.clone(),
    }
}
