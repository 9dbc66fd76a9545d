//! The algorithm contract every rate-limit strategy implements: a read-only
//! `check` and a capacity-consuming `increment` (§4.7).

use async_trait::async_trait;
use bantai_core::{Result, StorageAdapter};

/// The outcome of a pre-check against the current window/bucket state.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub allowed: bool,
    pub remaining: u64,
    pub reset_at_ms: u64,
    pub reason: Option<String>,
}

/// One rate-limit algorithm (fixed window, sliding window, token bucket).
/// `check` never mutates storage; `increment` is the only write path, called
/// from the rate-limit rule's `onAllow` hook (§4.7).
#[async_trait]
pub trait RateLimitAlgorithm: Send + Sync {
    /// Evaluate whether `cost` more units fit under the limit, without
    /// consuming capacity.
    async fn check(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<CheckResult>;

    /// Consume `cost` units of capacity. Called only when the rule's final
    /// verdict is `allow` (§4.7 post-commit).
    async fn increment(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<()>;
}
