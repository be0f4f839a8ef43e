use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_config::EngineConfig;
use monitor_core::models::{Cadence, EntityStatus};
use monitor_core::{EngineClock, MonitorError};
use monitor_infrastructure::{MetricsCollector, StructuredLogger};
use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tracing::debug;

use crate::state::wait_removed;

/// Exponential backoff between attempts of one tick.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub base: Duration,
    pub cap: Duration,
    /// Relative jitter in `0.0..=1.0`.
    pub jitter: f64,
}

impl BackoffConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            base: config.backoff_base(),
            cap: config.backoff_cap(),
            jitter: config.backoff_jitter,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped,
    /// then spread by up to `jitter` in either direction without exceeding the cap.
    pub fn delay(&self, retry: u32) -> Duration {
        let base = self.base.as_secs_f64();
        let cap = self.cap.as_secs_f64();
        let exponential = base * 2f64.powi(retry.min(62) as i32);
        let capped = exponential.min(cap);

        let jitter = capped * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64((capped + jitter).clamp(0.0, cap))
    }
}

/// Health of one (entity, cadence) pair. Only that cadence's task writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CadenceHealth {
    pub status: EntityStatus,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub store_write_failures: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    Unchanged,
    Degraded,
    Recovered,
}

impl Default for CadenceHealth {
    fn default() -> Self {
        Self {
            status: EntityStatus::Active,
            consecutive_failures: 0,
            last_success_at: None,
            last_error: None,
            store_write_failures: 0,
        }
    }
}

impl CadenceHealth {
    pub fn is_degraded(&self) -> bool {
        self.status == EntityStatus::Degraded
    }

    pub fn record_success(&mut self, at: DateTime<Utc>) -> HealthTransition {
        let was_degraded = self.is_degraded();
        self.status = EntityStatus::Active;
        self.consecutive_failures = 0;
        self.last_success_at = Some(at);
        self.last_error = None;
        if was_degraded {
            HealthTransition::Recovered
        } else {
            HealthTransition::Unchanged
        }
    }

    pub fn record_failure(&mut self, error: &MonitorError, threshold: u32) -> HealthTransition {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
        if !self.is_degraded() && self.consecutive_failures >= threshold {
            self.status = EntityStatus::Degraded;
            HealthTransition::Degraded
        } else {
            HealthTransition::Unchanged
        }
    }

    /// Store failures are surfaced but never change the fetch status.
    pub fn record_store_failure(&mut self, error: &MonitorError) {
        self.store_write_failures = self.store_write_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
    }
}

/// Result of one policy-wrapped tick.
#[derive(Debug)]
pub enum TickOutcome<T> {
    Success(T),
    /// Attempts for this tick are exhausted; the last error is returned.
    Failed(MonitorError),
    /// The entity was removed while waiting to retry.
    Cancelled,
}

/// Retry, timeout and degradation rules around a single fetch.
#[derive(Clone)]
pub struct FailurePolicy {
    backoff: BackoffConfig,
    max_attempts: u32,
    degrade_threshold: u32,
    fetch_timeout: Duration,
    clock: EngineClock,
    metrics: Arc<MetricsCollector>,
}

impl FailurePolicy {
    pub fn new(config: &EngineConfig, clock: EngineClock, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            backoff: BackoffConfig::from_engine(config),
            max_attempts: config.max_retries.max(1),
            degrade_threshold: config.max_retries.max(1),
            fetch_timeout: config.fetch_timeout(),
            clock,
            metrics,
        }
    }

    /// Runs `fetch` for one tick.
    ///
    /// A healthy cadence gets up to `max_retries` attempts, separated by
    /// backoff, as long as each retry starts before `deadline`. A degraded
    /// cadence gets a single probe. Permanent errors are not retried. Every
    /// attempt is bounded by the fetch timeout; a timeout counts as a
    /// transient failure.
    pub async fn execute<T, F, Fut>(
        &self,
        entity_id: &str,
        cadence: Cadence,
        health: &RwLock<CadenceHealth>,
        cancel: &mut watch::Receiver<bool>,
        deadline: Instant,
        mut fetch: F,
    ) -> TickOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MonitorError>>,
    {
        let max_attempts = if health.read().await.is_degraded() {
            1
        } else {
            self.max_attempts
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let result = match tokio::time::timeout(self.fetch_timeout, fetch()).await {
                Ok(result) => result,
                Err(_) => Err(MonitorError::FetchTimeout {
                    entity_id: entity_id.to_string(),
                    timeout: self.fetch_timeout,
                }),
            };
            self.metrics
                .record_fetch_duration(cadence, started.elapsed().as_secs_f64());

            let error = match result {
                Ok(value) => {
                    let transition = health.write().await.record_success(self.clock.now());
                    if transition == HealthTransition::Recovered {
                        StructuredLogger::log_entity_recovered(entity_id, cadence);
                    }
                    return TickOutcome::Success(value);
                }
                Err(error) => error,
            };

            self.metrics.record_fetch_failure(cadence);
            StructuredLogger::log_fetch_failed(
                entity_id,
                cadence,
                attempt,
                max_attempts,
                &error.to_string(),
            );
            let (transition, failures) = {
                let mut health = health.write().await;
                let transition = health.record_failure(&error, self.degrade_threshold);
                (transition, health.consecutive_failures)
            };
            if transition == HealthTransition::Degraded {
                StructuredLogger::log_entity_degraded(entity_id, cadence, failures);
            }

            if !error.is_retryable() || attempt >= max_attempts {
                return TickOutcome::Failed(error);
            }

            let delay = self.backoff.delay(attempt - 1);
            if Instant::now() + delay >= deadline {
                debug!(entity_id, %cadence, "tick budget exhausted, giving up until next tick");
                return TickOutcome::Failed(error);
            }

            self.metrics.record_fetch_retry(cadence);
            tokio::select! {
                biased;
                _ = wait_removed(cancel) => return TickOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
