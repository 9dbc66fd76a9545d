//! Fixed-window rate limiting (§4.7.1).

use crate::algorithm::{CheckResult, RateLimitAlgorithm};
use async_trait::async_trait;
use bantai_core::{Result, StorageAdapter};
use serde_json::{json, Value};

/// Counts hits within `floor(now / period) * period`-aligned windows.
pub struct FixedWindow {
    pub limit: u64,
    pub period_ms: u64,
}

impl FixedWindow {
    fn window_key(&self, key: &str, now_ms: u64) -> (String, u64) {
        let window_start = (now_ms / self.period_ms) * self.period_ms;
        (format!("{key}:{window_start}"), window_start)
    }
}

#[async_trait]
impl RateLimitAlgorithm for FixedWindow {
    async fn check(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<CheckResult> {
        let (storage_key, window_start) = self.window_key(key, now_ms);
        let count = storage.get(&storage_key).await?.and_then(|v| v.as_u64()).unwrap_or(0);
        let allowed = count + cost <= self.limit;
        Ok(CheckResult {
            allowed,
            remaining: self.limit.saturating_sub(count),
            reset_at_ms: window_start + self.period_ms,
            reason: if allowed { None } else { Some("fixed window limit exceeded".into()) },
        })
    }

    async fn increment(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<()> {
        let (storage_key, _) = self.window_key(key, now_ms);
        let limit = self.limit;
        let period_ms = self.period_ms;
        let updater = move |current: Option<&Value>| {
            let count = current.and_then(Value::as_u64).unwrap_or(0);
            if count + cost > limit {
                None
            } else {
                Some((json!(count + cost), Some(period_ms)))
            }
        };
        storage.update(&storage_key, &updater).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bantai_core::InMemoryStorageAdapter;
    use std::sync::Arc;

    fn adapter() -> InMemoryStorageAdapter {
        InMemoryStorageAdapter::new(Arc::new(bantai_core::SystemClock))
    }

    #[tokio::test]
    async fn allows_up_to_limit_then_denies() {
        let storage = adapter();
        let algo = FixedWindow { limit: 2, period_ms: 1_000 };
        assert!(algo.check(&storage, "k", 0, 1).await.unwrap().allowed);
        algo.increment(&storage, "k", 0, 1).await.unwrap();
        assert!(algo.check(&storage, "k", 0, 1).await.unwrap().allowed);
        algo.increment(&storage, "k", 0, 1).await.unwrap();
        let result = algo.check(&storage, "k", 0, 1).await.unwrap();
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[tokio::test]
    async fn new_window_resets_count() {
        let storage = adapter();
        let algo = FixedWindow { limit: 1, period_ms: 1_000 };
        algo.increment(&storage, "k", 0, 1).await.unwrap();
        assert!(!algo.check(&storage, "k", 500, 1).await.unwrap().allowed);
        assert!(algo.check(&storage, "k", 1_000, 1).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn increment_past_limit_is_skipped() {
        let storage = adapter();
        let algo = FixedWindow { limit: 1, period_ms: 1_000 };
        algo.increment(&storage, "k", 0, 1).await.unwrap();
        algo.increment(&storage, "k", 0, 1).await.unwrap();
        let count = storage.get("k:0").await.unwrap().unwrap().as_u64().unwrap();
        assert_eq!(count, 1);
    }
}
