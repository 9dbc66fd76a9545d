//! Error types for the Bantai policy engine
//!
//! ## Design Principles
//!
//! 1. **Specific Variants**: Each failure mode in §7 gets its own variant.
//! 2. **Context**: Errors carry the rule/policy/storage key involved.
//! 3. **Transient marking**: Storage errors distinguish transient (fail-closed,
//!    retryable) failures from hard configuration errors.

use thiserror::Error;

/// Result type alias for Bantai operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Bantai operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed schema validation before any rule ran (§7: schema validation error).
    #[error("schema validation failed: {0}")]
    Schema(String),

    /// A rule evaluator raised instead of returning a `Verdict` (§7: rule evaluator failure).
    #[error("rule '{rule}' evaluator failed: {message}")]
    RuleEvaluation { rule: String, message: String },

    /// An `onAllow`/`onDeny` hook raised (§7: hook failure).
    #[error("rule '{rule}' hook failed: {message}")]
    Hook { rule: String, message: String },

    /// A storage adapter call failed. `transient` distinguishes a timeout or
    /// lost lock (§5, fail-closed) from a hard configuration problem.
    #[error("storage error on key '{key}': {message}")]
    Storage {
        key: String,
        message: String,
        transient: bool,
    },

    /// A distributed lock token did not match on release, or the lock expired
    /// before release (§4.6: "write may have been lost").
    #[error("lock error on key '{key}': {message}")]
    Lock { key: String, message: String },

    /// A rate-limit `period` string did not match the duration grammar of §6.
    #[error("invalid duration '{0}': expected N(ms|s|m|h|d)")]
    Duration(String),

    /// A policy or rule definition violated a data-model invariant (§3), e.g.
    /// duplicate rule names within one policy.
    #[error("invalid definition: {0}")]
    Definition(String),

    /// An audit sink raised while handling an event (§7: sink failure).
    #[error("audit sink failed: {0}")]
    Sink(String),
}

impl Error {
    /// Whether a caller should treat this as retryable / fail-closed rather
    /// than a hard misconfiguration.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Storage { transient: true, .. } | Error::Lock { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_transient_flag_drives_is_transient() {
        let err = Error::Storage {
            key: "k".into(),
            message: "timeout".into(),
            transient: true,
        };
        assert!(err.is_transient());

        let err = Error::Storage {
            key: "k".into(),
            message: "bad config".into(),
            transient: false,
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn lock_errors_are_transient() {
        let err = Error::Lock { key: "k:lock".into(), message: "expired".into() };
        assert!(err.is_transient());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::RuleEvaluation { rule: "rule:age-check".into(), message: "boom".into() };
        let msg = err.to_string();
        assert!(msg.contains("rule:age-check"));
        assert!(msg.contains("boom"));
    }
}
