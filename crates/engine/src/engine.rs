use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use monitor_config::{ConfigValidator, EngineConfig};
use monitor_core::models::{
    AggregateRecord, EntityHealth, EntitySummary, PeriodType, Profile, Sample, TimeRange,
};
use monitor_core::traits::{MetricsFetcher, ProfileStore, SampleStore};
use monitor_core::{EngineClock, MonitorError, MonitorResult};
use monitor_infrastructure::{MetricsCollector, StructuredLogger};
use tracing::{info, warn};

use crate::failure_policy::FailurePolicy;
use crate::registry::{AddOutcome, EntityRegistry};
use crate::scheduler::{CadenceScheduler, SchedulerContext};
use crate::state::EntityHandle;

const MAX_ENTITY_ID_LEN: usize = 128;

/// Result of [`MonitorEngine::add_entity`].
#[derive(Debug, Clone, PartialEq)]
pub enum AddEntityOutcome {
    Created(EntitySummary),
    AlreadyExists(EntitySummary),
}

impl AddEntityOutcome {
    pub fn summary(&self) -> &EntitySummary {
        match self {
            AddEntityOutcome::Created(summary) | AddEntityOutcome::AlreadyExists(summary) => {
                summary
            }
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, AddEntityOutcome::Created(_))
    }
}

/// Entry point of the collection engine.
///
/// Owns the registry and spawns the cadence tasks. Collaborators are
/// injected; nothing here is process-global.
pub struct MonitorEngine {
    config: EngineConfig,
    registry: Arc<EntityRegistry>,
    scheduler: CadenceScheduler,
    fetcher: Arc<dyn MetricsFetcher>,
    store: Arc<dyn SampleStore>,
    profile_store: Arc<dyn ProfileStore>,
    metrics: Arc<MetricsCollector>,
    clock: EngineClock,
    rollup_period_type: PeriodType,
}

impl MonitorEngine {
    /// Validates `config` and builds an engine. No task starts until the
    /// first entity is added.
    pub fn new(
        config: EngineConfig,
        fetcher: Arc<dyn MetricsFetcher>,
        store: Arc<dyn SampleStore>,
        profile_store: Arc<dyn ProfileStore>,
    ) -> MonitorResult<Self> {
        Self::with_clock(config, fetcher, store, profile_store, EngineClock::new())
    }

    pub fn with_clock(
        config: EngineConfig,
        fetcher: Arc<dyn MetricsFetcher>,
        store: Arc<dyn SampleStore>,
        profile_store: Arc<dyn ProfileStore>,
        clock: EngineClock,
    ) -> MonitorResult<Self> {
        config.validate()?;

        let metrics = Arc::new(MetricsCollector::new());
        let registry = Arc::new(EntityRegistry::new(config.max_entities));
        let rollup_period_type = PeriodType::for_period(config.rollup_period());

        let context = SchedulerContext {
            fetcher: fetcher.clone(),
            store: store.clone(),
            profile_store: profile_store.clone(),
            registry: registry.clone(),
            policy: FailurePolicy::new(&config, clock, metrics.clone()),
            metrics: metrics.clone(),
            clock,
            rollup_period_type: rollup_period_type.clone(),
            permanent_failure_confirmations: config.permanent_failure_confirmations,
        };

        Ok(Self {
            config,
            registry,
            scheduler: CadenceScheduler::new(Arc::new(context)),
            fetcher,
            store,
            profile_store,
            metrics,
            clock,
            rollup_period_type,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Label of the aggregates this engine emits, e.g. `5min`.
    pub fn rollup_period_type(&self) -> &PeriodType {
        &self.rollup_period_type
    }

    /// Starts monitoring `entity_id`. Adding a registered id is a no-op that
    /// returns the current state.
    pub async fn add_entity(&self, entity_id: &str) -> MonitorResult<AddEntityOutcome> {
        validate_entity_id(entity_id)?;
        self.fetcher.validate_entity_id(entity_id)?;

        let outcome = self
            .registry
            .add(entity_id, || {
                EntityHandle::new(entity_id.to_string(), self.clock.now(), &self.config)
            })
            .await?;

        match outcome {
            AddOutcome::AlreadyExists(handle) => {
                Ok(AddEntityOutcome::AlreadyExists(handle.summary().await))
            }
            AddOutcome::Created(handle) => {
                let tasks = self.scheduler.start(&handle);
                handle.attach_tasks(tasks).await;

                let monitored = self.registry.len().await;
                self.metrics.set_monitored_entities(monitored);
                StructuredLogger::log_entity_registered(entity_id, monitored);
                Ok(AddEntityOutcome::Created(handle.summary().await))
            }
        }
    }

    /// Stops monitoring `entity_id`. Returns `false` for unknown ids.
    ///
    /// Tasks are signalled, not awaited: an in-flight fetch may still
    /// complete, but its result is discarded.
    pub async fn remove_entity(&self, entity_id: &str) -> bool {
        if !self.registry.remove(entity_id).await {
            return false;
        }
        let monitored = self.registry.len().await;
        self.metrics.set_monitored_entities(monitored);
        StructuredLogger::log_entity_removed(entity_id, monitored);
        true
    }

    pub async fn list_entities(&self) -> Vec<EntitySummary> {
        let handles = self.registry.list().await;
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.summary().await);
        }
        summaries
    }

    pub async fn get_entity(&self, entity_id: &str) -> MonitorResult<EntitySummary> {
        match self.registry.get(entity_id).await {
            Some(handle) => Ok(handle.summary().await),
            None => Err(MonitorError::entity_not_found(entity_id)),
        }
    }

    /// Merged health of a registered entity, or `Removed` for a recently
    /// removed one.
    pub async fn get_health(&self, entity_id: &str) -> MonitorResult<EntityHealth> {
        if let Some(handle) = self.registry.get(entity_id).await {
            return Ok(handle.health().await);
        }
        if self.registry.is_tombstoned(entity_id).await {
            return Ok(EntityHealth::removed(entity_id));
        }
        Err(MonitorError::entity_not_found(entity_id))
    }

    /// Most recent aggregate of `period_type`. Served from memory for
    /// registered entities, falling back to the store.
    pub async fn get_latest_aggregate(
        &self,
        entity_id: &str,
        period_type: &PeriodType,
    ) -> MonitorResult<Option<AggregateRecord>> {
        let handle = self.registry.get(entity_id).await;
        if let Some(handle) = &handle {
            if let Some(record) = handle.latest_aggregate(period_type).await {
                return Ok(Some(record));
            }
        }

        if handle.is_none() && !self.registry.is_tombstoned(entity_id).await {
            return Err(MonitorError::entity_not_found(entity_id));
        }

        // Inclusive of a record that closed exactly now.
        let until = self.clock.now() + TimeDelta::milliseconds(1);
        let mut records = self
            .store
            .query_aggregates(
                entity_id,
                period_type,
                TimeRange::new(DateTime::<Utc>::MIN_UTC, until),
            )
            .await?;
        Ok(records.pop())
    }

    pub async fn get_profile(&self, entity_id: &str) -> MonitorResult<Option<Profile>> {
        self.profile_store.get_profile(entity_id).await
    }

    pub async fn query_samples(
        &self,
        entity_id: &str,
        range: TimeRange,
    ) -> MonitorResult<Vec<Sample>> {
        self.store.query_samples(entity_id, range).await
    }

    pub async fn query_aggregates(
        &self,
        entity_id: &str,
        period_type: &PeriodType,
        range: TimeRange,
    ) -> MonitorResult<Vec<AggregateRecord>> {
        self.store
            .query_aggregates(entity_id, period_type, range)
            .await
    }

    pub async fn entity_count(&self) -> usize {
        self.registry.len().await
    }

    /// Cancels every cadence task and waits up to `timeout` for them to
    /// finish. Returns `false` if the wait timed out. Later adds fail with
    /// `EngineStopped`.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let handles = self.registry.drain().await;
        self.metrics.set_monitored_entities(0);

        let mut tasks = Vec::new();
        for handle in &handles {
            tasks.extend(handle.take_tasks().await);
        }
        info!(
            entities = handles.len(),
            tasks = tasks.len(),
            "Stopping monitor engine"
        );

        match tokio::time::timeout(timeout, join_all(tasks)).await {
            Ok(results) => {
                for result in results {
                    if let Err(err) = result {
                        warn!(error = %err, "Cadence task ended abnormally");
                    }
                }
                true
            }
            Err(_) => {
                warn!(?timeout, "Timed out waiting for cadence tasks to stop");
                false
            }
        }
    }
}

/// Engine-level id rules; fetchers may add their own.
fn validate_entity_id(entity_id: &str) -> MonitorResult<()> {
    if entity_id.is_empty() {
        return Err(MonitorError::invalid_entity_id(entity_id, "must not be empty"));
    }
    if entity_id.len() > MAX_ENTITY_ID_LEN {
        return Err(MonitorError::invalid_entity_id(
            entity_id,
            format!("must be at most {MAX_ENTITY_ID_LEN} bytes"),
        ));
    }
    if entity_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(MonitorError::invalid_entity_id(
            entity_id,
            "must not contain whitespace or control characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_entity_id() {
        assert!(validate_entity_id("dQw4w9WgXcQ").is_ok());
        assert!(validate_entity_id("").is_err());
        assert!(validate_entity_id("has space").is_err());
        assert!(validate_entity_id("tab\tid").is_err());
        assert!(validate_entity_id(&"x".repeat(129)).is_err());
        assert!(validate_entity_id(&"x".repeat(128)).is_ok());
    }
}
