//! The tool bag: a Context's pluggable dependency map (§3, §4.2).
//!
//! Tools are opaque, type-erased singletons — a storage adapter, a rate-limit
//! helper, an audit emitter — looked up by string key and downcast to a
//! concrete type at the call site. This plays the role `Vault` plays in the
//! corpus for cross-component state, specialized to hold live trait objects
//! rather than JSON-serializable scratch values.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A frozen map of named tools. Built once by `Context` construction/merge
/// and never mutated afterwards (§3: "Freezes tools map").
#[derive(Clone, Default)]
pub struct ToolBag {
    tools: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ToolBag {
    /// An empty tool bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool under `key`, returning a new bag (contexts are
    /// copy-on-extend, §3).
    pub fn with_tool<T: Any + Send + Sync>(mut self, key: impl Into<String>, tool: T) -> Self {
        self.tools.insert(key.into(), Arc::new(tool));
        self
    }

    /// Merge `other` into `self`, with `other`'s entries winning on key
    /// conflicts (§4.2: later wins).
    pub fn merged_with(&self, other: &ToolBag) -> ToolBag {
        let mut tools = self.tools.clone();
        tools.extend(other.tools.clone());
        ToolBag { tools }
    }

    /// Fetch a tool by key, downcast to `T`. Returns `None` if the key is
    /// absent or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.tools.get(key).and_then(|tool| Arc::downcast(tool.clone()).ok())
    }

    /// Whether a tool is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.tools.contains_key(key)
    }

    /// Registered tool keys, for diagnostics.
    pub fn keys(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Estimator(u32);

    #[test]
    fn stores_and_retrieves_typed_tool() {
        let bag = ToolBag::new().with_tool("estimator", Estimator(7));
        let got = bag.get::<Estimator>("estimator").unwrap();
        assert_eq!(got.0, 7);
    }

    #[test]
    fn wrong_type_returns_none() {
        let bag = ToolBag::new().with_tool("estimator", Estimator(7));
        assert!(bag.get::<String>("estimator").is_none());
    }

    #[test]
    fn merge_prefers_other_on_conflict() {
        let a = ToolBag::new().with_tool("k", Estimator(1));
        let b = ToolBag::new().with_tool("k", Estimator(2));
        let merged = a.merged_with(&b);
        assert_eq!(merged.get::<Estimator>("k").unwrap().0, 2);
    }

    #[test]
    fn contains_reflects_presence() {
        let bag = ToolBag::new().with_tool("k", Estimator(1));
        assert!(bag.contains("k"));
        assert!(!bag.contains("missing"));
    }
}
