//! Token-bucket rate limiting (§4.7.3): a continuously refilling pool of
//! tokens rather than a discrete window.

use crate::algorithm::{CheckResult, RateLimitAlgorithm};
use async_trait::async_trait;
use bantai_core::{Result, StorageAdapter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Burst capacity equal to `limit`, refilling at `limit` tokens per `period_ms`.
pub struct TokenBucket {
    pub limit: u64,
    pub period_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketState {
    remaining: f64,
    last_refill_at: u64,
}

impl TokenBucket {
    fn refilled(&self, state: Option<&Value>, now_ms: u64) -> BucketState {
        let BucketState { remaining, last_refill_at } = state
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(BucketState { remaining: self.limit as f64, last_refill_at: now_ms });

        let elapsed = now_ms.saturating_sub(last_refill_at) as f64;
        let refill_rate = self.limit as f64 / self.period_ms as f64;
        let refilled = (remaining + elapsed * refill_rate).min(self.limit as f64);
        BucketState { remaining: refilled, last_refill_at: now_ms }
    }

    fn time_to_available(&self, remaining: f64, cost: u64) -> u64 {
        let deficit = (cost as f64 - remaining).max(0.0);
        if deficit == 0.0 {
            0
        } else {
            (deficit * self.period_ms as f64 / self.limit as f64).ceil() as u64
        }
    }
}

#[async_trait]
impl RateLimitAlgorithm for TokenBucket {
    async fn check(
        &self,
        storage: &dyn StorageAdapter,
        key: &str,
        now_ms: u64,
        cost: u64,
    ) -> Result<CheckResult> {
        let current = storage.get(key).await?;
        let state = self.refilled(current.as_ref(), now_ms);
        let allowed = state.remaining >= cost as f64;
        Ok(CheckResult {
            allowed,
            remaining: state.remaining as u64,
            reset_at_ms: now_ms + self.time_to_available(state.remaining, cost),
            reason: if allowed { None } else { Some("token bucket exhausted".into()) },
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
            let refilled = self.refilled(current, now_ms);
            let spent = (refilled.remaining - cost as f64).max(0.0);
            let state = BucketState { remaining: spent, last_refill_at: now_ms };
            serde_json::to_value(state).ok().map(|v| (v, Some(period_ms * 10)))
        };
        storage.update(key, &updater).await?;
        Ok(())
    }
}
