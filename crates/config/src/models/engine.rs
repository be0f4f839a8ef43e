use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigError;

/// Cadence periods and failure-policy knobs of the collection engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub raw_period_seconds: u64,
    pub rollup_period_seconds: u64,
    pub profile_period_seconds: u64,
    /// Attempts per tick, and the consecutive-failure count that degrades an entity.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub backoff_jitter: f64,
    pub fetch_timeout_seconds: u64,
    pub window_retention_seconds: u64,
    pub max_entities: usize,
    pub permanent_failure_confirmations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            raw_period_seconds: 30,
            rollup_period_seconds: 300,
            profile_period_seconds: 86_400,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_cap_ms: 10_000,
            backoff_jitter: 0.1,
            fetch_timeout_seconds: 10,
            window_retention_seconds: 1_800,
            max_entities: 50,
            permanent_failure_confirmations: 2,
        }
    }
}

impl EngineConfig {
    pub fn raw_period(&self) -> Duration {
        Duration::from_secs(self.raw_period_seconds)
    }

    pub fn rollup_period(&self) -> Duration {
        Duration::from_secs(self.rollup_period_seconds)
    }

    pub fn profile_period(&self) -> Duration {
        Duration::from_secs(self.profile_period_seconds)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    pub fn window_retention(&self) -> Duration {
        Duration::from_secs(self.window_retention_seconds)
    }
}

impl ConfigValidator for EngineConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_positive(self.raw_period_seconds, "engine.raw_period_seconds")?;
        ValidationUtils::validate_positive(
            self.rollup_period_seconds,
            "engine.rollup_period_seconds",
        )?;
        ValidationUtils::validate_positive(
            self.profile_period_seconds,
            "engine.profile_period_seconds",
        )?;
        ValidationUtils::validate_positive(
            self.window_retention_seconds,
            "engine.window_retention_seconds",
        )?;
        ValidationUtils::validate_positive(self.backoff_base_ms, "engine.backoff_base_ms")?;
        ValidationUtils::validate_timeout_seconds(
            self.fetch_timeout_seconds,
            "engine.fetch_timeout_seconds",
        )?;
        ValidationUtils::validate_count(self.max_retries as usize, "engine.max_retries")?;
        ValidationUtils::validate_count(self.max_entities, "engine.max_entities")?;
        ValidationUtils::validate_count(
            self.permanent_failure_confirmations as usize,
            "engine.permanent_failure_confirmations",
        )?;
        ValidationUtils::validate_ratio(self.backoff_jitter, "engine.backoff_jitter")?;

        if self.window_retention_seconds < self.rollup_period_seconds {
            return Err(ConfigError::Validation(
                "engine.window_retention_seconds must be at least rollup_period_seconds"
                    .to_string(),
            ));
        }

        if self.backoff_base_ms > self.backoff_cap_ms {
            return Err(ConfigError::Validation(
                "engine.backoff_base_ms must be less than or equal to backoff_cap_ms".to_string(),
            ));
        }

        if self.fetch_timeout_seconds >= self.raw_period_seconds {
            return Err(ConfigError::Validation(
                "engine.fetch_timeout_seconds must be less than raw_period_seconds".to_string(),
            ));
        }

        Ok(())
    }
}
