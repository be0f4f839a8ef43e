//! One task per (entity, cadence), each on its own fixed-period timer.

use std::sync::Arc;

use chrono::TimeDelta;
use monitor_core::models::{Cadence, PeriodType, Sample, TimeRange};
use monitor_core::traits::{MetricsFetcher, ProfileStore, SampleStore};
use monitor_core::{EngineClock, MonitorError};
use monitor_infrastructure::{MetricsCollector, StructuredLogger};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::aggregator::Aggregator;
use crate::cadence::{first_fire_delay, next_fire};
use crate::failure_policy::{FailurePolicy, TickOutcome};
use crate::registry::EntityRegistry;
use crate::state::{wait_removed, CadenceState, EntityHandle};

/// Collaborators shared by every cadence task.
pub struct SchedulerContext {
    pub fetcher: Arc<dyn MetricsFetcher>,
    pub store: Arc<dyn SampleStore>,
    pub profile_store: Arc<dyn ProfileStore>,
    pub registry: Arc<EntityRegistry>,
    pub policy: FailurePolicy,
    pub metrics: Arc<MetricsCollector>,
    pub clock: EngineClock,
    pub rollup_period_type: PeriodType,
    pub permanent_failure_confirmations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickFlow {
    Continue,
    Stop,
}

pub struct CadenceScheduler {
    ctx: Arc<SchedulerContext>,
}

impl CadenceScheduler {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    /// Spawns the raw, rollup and profile tasks of `handle`.
    pub fn start(&self, handle: &Arc<EntityHandle>) -> Vec<JoinHandle<()>> {
        handle
            .cadences()
            .iter()
            .map(|state| {
                let task = CadenceTask {
                    ctx: self.ctx.clone(),
                    handle: handle.clone(),
                    state: state.clone(),
                    cancel: handle.subscribe(),
                    permanent_ticks: 0,
                };
                tokio::spawn(task.run())
            })
            .collect()
    }
}

struct CadenceTask {
    ctx: Arc<SchedulerContext>,
    handle: Arc<EntityHandle>,
    state: Arc<CadenceState>,
    cancel: watch::Receiver<bool>,
    /// Consecutive raw ticks that ended in a permanent failure.
    permanent_ticks: u32,
}

impl CadenceTask {
    async fn run(mut self) {
        let cadence = self.state.cadence;
        let period = self.state.period;
        let mut scheduled = Instant::now() + first_fire_delay(cadence, period);

        loop {
            self.state
                .set_next_fire_at(self.ctx.clock.wall_time(scheduled))
                .await;

            tokio::select! {
                biased;
                _ = wait_removed(&mut self.cancel) => break,
                _ = sleep_until(scheduled) => {}
            }
            if self.handle.is_removed() {
                break;
            }

            let flow = match cadence {
                Cadence::Raw => self.raw_tick(scheduled).await,
                Cadence::Rollup => self.rollup_tick(scheduled).await,
                Cadence::Profile => self.profile_tick(scheduled).await,
            };
            if flow == TickFlow::Stop {
                break;
            }

            let next = next_fire(scheduled, period, Instant::now());
            if next.coalesced > 0 {
                self.ctx.metrics.record_ticks_coalesced(next.coalesced);
                debug!(
                    entity.id = self.handle.entity_id(),
                    %cadence,
                    skipped = next.coalesced,
                    "Tick overran its period, missed ticks coalesced"
                );
            }
            scheduled = next.at;
        }

        debug!(
            entity.id = self.handle.entity_id(),
            %cadence,
            "Cadence task stopped"
        );
    }

    async fn raw_tick(&mut self, fire_at: Instant) -> TickFlow {
        let ctx = self.ctx.clone();
        let entity_id = self.handle.entity_id().to_string();
        let deadline = fire_at + self.state.period;
        let fetcher: &dyn MetricsFetcher = ctx.fetcher.as_ref();
        let id = entity_id.as_str();

        let outcome = ctx
            .policy
            .execute(
                id,
                Cadence::Raw,
                self.state.health(),
                &mut self.cancel,
                deadline,
                move || fetcher.fetch_live(id),
            )
            .await;

        let snapshot = match outcome {
            TickOutcome::Success(snapshot) => snapshot,
            TickOutcome::Cancelled => return TickFlow::Stop,
            TickOutcome::Failed(err) => return self.raw_failed(&err).await,
        };
        self.permanent_ticks = 0;

        if self.handle.is_removed() {
            return TickFlow::Stop;
        }
        // Stamped when the fetch succeeded, not when the tick was scheduled.
        let sample = Sample::from_snapshot(id, ctx.clock.now(), &snapshot);
        if let Err(err) = self.handle.window().write().await.push(sample.clone()) {
            warn!(entity.id = id, error = %err, "Sample rejected by window");
            return TickFlow::Continue;
        }

        if self.handle.is_removed() {
            return TickFlow::Stop;
        }
        match ctx.store.append_sample(&sample).await {
            Ok(()) => {
                ctx.metrics.record_sample();
                StructuredLogger::log_sample_recorded(id, sample.viewer_count, sample.timestamp);
            }
            Err(err) => self.store_failed("sample", err).await,
        }
        TickFlow::Continue
    }

    /// Counts permanent failures toward auto-removal; anything else resets
    /// the streak.
    async fn raw_failed(&mut self, err: &MonitorError) -> TickFlow {
        if !err.is_permanent() {
            self.permanent_ticks = 0;
            return TickFlow::Continue;
        }

        self.permanent_ticks += 1;
        if self.permanent_ticks < self.ctx.permanent_failure_confirmations {
            return TickFlow::Continue;
        }

        let entity_id = self.handle.entity_id();
        if self
            .ctx
            .registry
            .remove_if_current(entity_id, &self.handle)
            .await
        {
            StructuredLogger::log_entity_auto_removed(entity_id, &err.to_string());
            self.ctx
                .metrics
                .set_monitored_entities(self.ctx.registry.len().await);
        }
        TickFlow::Stop
    }

    async fn rollup_tick(&mut self, fire_at: Instant) -> TickFlow {
        let ctx = self.ctx.clone();
        let entity_id = self.handle.entity_id();
        let period_end = ctx.clock.wall_time(fire_at);
        let period_start = period_end
            - TimeDelta::from_std(self.state.period).unwrap_or(TimeDelta::zero());
        let range = TimeRange::new(period_start, period_end);

        let samples = self.handle.window().read().await.samples_in(range);
        let Some(record) = Aggregator::aggregate(
            entity_id,
            &samples,
            period_start,
            period_end,
            &ctx.rollup_period_type,
        ) else {
            StructuredLogger::log_aggregate_skipped(entity_id, &ctx.rollup_period_type);
            return TickFlow::Continue;
        };

        if self.handle.is_removed() {
            return TickFlow::Stop;
        }
        self.handle.set_latest_aggregate(record.clone()).await;
        match ctx.store.append_aggregate(&record).await {
            Ok(()) => {
                ctx.metrics.record_aggregate();
                StructuredLogger::log_aggregate_emitted(
                    entity_id,
                    &record.period_type,
                    record.sample_count,
                    record.average_viewers,
                    record.peak_viewers,
                );
            }
            Err(err) => self.store_failed("aggregate", err).await,
        }
        TickFlow::Continue
    }

    async fn profile_tick(&mut self, fire_at: Instant) -> TickFlow {
        let ctx = self.ctx.clone();
        let entity_id = self.handle.entity_id().to_string();
        let deadline = fire_at + self.state.period;
        let fetcher: &dyn MetricsFetcher = ctx.fetcher.as_ref();
        let id = entity_id.as_str();

        let outcome = ctx
            .policy
            .execute(
                id,
                Cadence::Profile,
                self.state.health(),
                &mut self.cancel,
                deadline,
                move || fetcher.fetch_profile(id),
            )
            .await;

        let profile = match outcome {
            TickOutcome::Success(profile) => profile,
            TickOutcome::Cancelled => return TickFlow::Stop,
            // Profile failures never remove the entity; the next tick retries.
            TickOutcome::Failed(_) => return TickFlow::Continue,
        };

        if self.handle.is_removed() {
            return TickFlow::Stop;
        }
        match ctx.profile_store.upsert_profile(&profile).await {
            Ok(()) => debug!(entity.id = id, event = "profile_refreshed", "Profile refreshed"),
            Err(err) => self.store_failed("profile", err).await,
        }
        TickFlow::Continue
    }

    async fn store_failed(&self, record: &str, err: MonitorError) {
        self.state.health().write().await.record_store_failure(&err);
        self.ctx.metrics.record_store_write_failure();
        StructuredLogger::log_store_write_failed(self.handle.entity_id(), record, &err.to_string());
    }
}
