//! Named rate-limit tier presets loaded from TOML/env via the `config`
//! crate, so hosts can configure `{limit, period, cost}` per tier ("free",
//! "pro", ...) instead of writing `RateLimitConfig` literals inline.

use crate::rule::{RateLimitConfig, RateLimitKind};
use bantai_core::Error;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

fn default_cost() -> u64 {
    1
}

/// One named tier's raw, unparsed settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitTierConfig {
    pub limit: u64,
    pub period: String,
    #[serde(default = "default_cost")]
    pub cost: u64,
}

/// A table of tier name to settings, e.g. `[tiers.pro]` in TOML.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RateLimitTiers {
    #[serde(default)]
    pub tiers: HashMap<String, RateLimitTierConfig>,
}

/// Load tier presets from an optional config file plus `BANTAI_RATE_LIMIT_*`
/// environment overrides.
pub fn load_tiers(path: Option<&str>) -> Result<RateLimitTiers, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::with_name(path).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("BANTAI_RATE_LIMIT").separator("__"),
    );
    builder.build()?.try_deserialize()
}

impl RateLimitTierConfig {
    /// Resolve this tier into a usable [`RateLimitConfig`] for `kind`,
    /// parsing `period` per the duration grammar (§4.7, §6).
    pub fn resolve(&self, key: Option<String>, kind: RateLimitKind) -> bantai_core::Result<RateLimitConfig> {
        let period_ms = crate::duration::parse_duration(&self.period)?;
        Ok(RateLimitConfig { key, kind, limit: self.limit, period_ms, cost: self.cost })
    }
}

impl RateLimitTiers {
    /// Look up a named tier, or an error if it is not configured.
    pub fn get(&self, name: &str) -> bantai_core::Result<&RateLimitTierConfig> {
        self.tiers
            .get(name)
            .ok_or_else(|| Error::Definition(format!("unknown rate limit tier '{name}'")))
    }
}
