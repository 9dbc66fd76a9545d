//! Verdict values returned by rule evaluators (§3, §4.1: "Result").
//!
//! Named `Verdict` rather than `Result` to stay out of the way of
//! `std::result::Result` / this crate's own fallible [`crate::error::Result`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The three-way outcome a rule evaluator can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictKind {
    /// Permit; contributes no violation.
    Allow,
    /// Block; contributes a violation unless the containing rule was
    /// converted to `deny` synthetically (still a violation either way).
    Deny,
    /// Not applicable to this input; contributes no violation and runs no
    /// hook (§3: "skip may not appear in policy violations").
    Skip,
}

/// A rule's verdict: immutable, structurally comparable, produced only by the
/// [`allow`], [`deny`], [`skip`] constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Which of the three outcomes this is.
    pub kind: VerdictKind,
    /// Optional human-readable reason.
    pub reason: Option<String>,
    /// Free-form metadata, never mutated after construction.
    pub meta: HashMap<String, serde_json::Value>,
}

impl Verdict {
    fn new(kind: VerdictKind) -> Self {
        Self { kind, reason: None, meta: HashMap::new() }
    }

    /// Construct an `allow` verdict.
    pub fn allow() -> Self {
        Self::new(VerdictKind::Allow)
    }

    /// Construct a `deny` verdict.
    pub fn deny() -> Self {
        Self::new(VerdictKind::Deny)
    }

    /// Construct a `skip` verdict: the rule does not apply to this input.
    pub fn skip() -> Self {
        Self::new(VerdictKind::Skip)
    }

    /// Attach a reason (builder-style, consistent with the rest of the crate).
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_meta<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.meta.insert(key.into(), json_value);
        }
        self
    }

    /// `true` for `Allow`.
    pub fn is_allow(&self) -> bool {
        self.kind == VerdictKind::Allow
    }

    /// `true` for `Deny`.
    pub fn is_deny(&self) -> bool {
        self.kind == VerdictKind::Deny
    }

    /// `true` for `Skip`.
    pub fn is_skip(&self) -> bool {
        self.kind == VerdictKind::Skip
    }

    /// Build a synthetic `deny` for a caught evaluator/hook failure (§7),
    /// carrying the failure under `meta.error` and, for storage-originated
    /// failures, `meta.transient = true` so callers can tell a transient
    /// storage failure apart from an ordinary policy violation (§5).
    pub fn synthetic_error(message: impl Into<String>, transient: bool) -> Self {
        let mut verdict = Self::deny().with_reason("internal error").with_meta("error", message.into());
        if transient {
            verdict = verdict.with_meta("transient", true);
        }
        verdict
    }

    /// Strip internal bookkeeping metadata — keys prefixed `__`, a
    /// convention extensions use to hand state to their own hooks — before
    /// this verdict is recorded into a [`crate::evaluator::PolicyResult`] or
    /// emitted on an audit event. Extensions must never leak such keys into
    /// the publicly visible verdict.
    pub fn public(&self) -> Verdict {
        let mut verdict = self.clone();
        verdict.meta.retain(|key, _| !key.starts_with("__"));
        verdict
    }
}
