//! Sliding-window rate limiting (§4.7.2): storage holds the timestamps of
//! recent hits rather than a single counter.

use crate::algorithm::{CheckResult, RateLimitAlgorithm};
use async_trait::async_trait;
use bantai_core::{Result, StorageAdapter};
use serde_json::{json, Value};

/// Tracks hit timestamps and prunes everything older than `now - period`.
pub struct SlidingWindow {
    pub limit: u64,
    pub period_ms: u64,
}

fn timestamps_of(value: Option<&Value>) -> Vec<u64> {
    value
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

#[async_trait]
impl RateLimitAlgorithm for SlidingWindow {
    async fn check(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<CheckResult> {
        let current = storage.get(key).await?;
        let cutoff = now_ms.saturating_sub(self.period_ms);
        let live: Vec<u64> = timestamps_of(current.as_ref()).into_iter().filter(|&t| t >= cutoff).collect();
        let count = live.len() as u64;
        let allowed = count + cost <= self.limit;
        let reset_at_ms = live.iter().min().map(|&t| t + self.period_ms).unwrap_or(now_ms + self.period_ms);
        Ok(CheckResult {
            allowed,
            remaining: self.limit.saturating_sub(count),
            reset_at_ms,
            reason: if allowed { None } else { Some("sliding window limit exceeded".into()) },
        })
    }

    async fn increment(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<()> {
        let period_ms = self.period_ms;
        let updater = move |current: Option<&Value>| {
            let cutoff = now_ms.saturating_sub(period_ms);
            let mut live: Vec<u64> = timestamps_of(current).into_iter().filter(|&t| t >= cutoff).collect();
            for _ in 0..cost {
                live.push(now_ms);
            }
            Some((json!(live), Some(period_ms)))
        };
        storage.update(key, &updater).await?;
        Ok(())
    }
}
