//! Rate-limit extension: fixed-window, sliding-window, and token-bucket
//! algorithms behind a common [`algorithm::RateLimitAlgorithm`] contract,
//! plus `with_rate_limit` and `define_rate_limit_rule` (§4.7).

pub mod algorithm;
pub mod config;
pub mod context;
pub mod duration;
pub mod fixed_window;
pub mod rule;
pub mod sliding_window;
pub mod token_bucket;

pub use algorithm::{CheckResult, RateLimitAlgorithm};
pub use config::{load_tiers, RateLimitTierConfig, RateLimitTiers};
pub use context::with_rate_limit;
pub use duration::parse_duration;
pub use fixed_window::FixedWindow;
pub use rule::{define_rate_limit_rule, RateLimitConfig, RateLimitKind, RateLimitRuleConfig};
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;
