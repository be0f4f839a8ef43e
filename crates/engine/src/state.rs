//! Per-entity runtime state shared between the facade and cadence tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_config::EngineConfig;
use monitor_core::models::{
    AggregateRecord, Cadence, CadenceSummary, EntityHealth, EntityStatus, EntitySummary,
    PeriodType,
};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::failure_policy::CadenceHealth;
use crate::window::SampleWindow;

/// Resolves once the entity has been cancelled.
pub(crate) async fn wait_removed(cancel: &mut watch::Receiver<bool>) {
    // A closed channel means the handle is gone, which is also a removal.
    let _ = cancel.wait_for(|removed| *removed).await;
}

/// Scheduling state of one cadence.
pub struct CadenceState {
    pub cadence: Cadence,
    pub period: Duration,
    next_fire_at: RwLock<Option<DateTime<Utc>>>,
    health: RwLock<CadenceHealth>,
}

impl CadenceState {
    fn new(cadence: Cadence, period: Duration) -> Self {
        Self {
            cadence,
            period,
            next_fire_at: RwLock::new(None),
            health: RwLock::new(CadenceHealth::default()),
        }
    }

    pub fn health(&self) -> &RwLock<CadenceHealth> {
        &self.health
    }

    pub async fn set_next_fire_at(&self, at: DateTime<Utc>) {
        *self.next_fire_at.write().await = Some(at);
    }

    pub async fn summary(&self) -> CadenceSummary {
        CadenceSummary {
            cadence: self.cadence,
            period_seconds: self.period.as_secs(),
            next_fire_at: *self.next_fire_at.read().await,
        }
    }
}

/// Everything the engine tracks for one registered entity.
///
/// The cancellation flag is a `watch` channel: tasks observe it at every
/// await point and before every write.
pub struct EntityHandle {
    entity_id: String,
    registered_at: DateTime<Utc>,
    cancel_tx: watch::Sender<bool>,
    cadences: Vec<Arc<CadenceState>>,
    window: RwLock<SampleWindow>,
    latest_aggregates: RwLock<HashMap<PeriodType, AggregateRecord>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EntityHandle {
    pub fn new(entity_id: String, registered_at: DateTime<Utc>, config: &EngineConfig) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        let cadences = vec![
            Arc::new(CadenceState::new(Cadence::Raw, config.raw_period())),
            Arc::new(CadenceState::new(Cadence::Rollup, config.rollup_period())),
            Arc::new(CadenceState::new(Cadence::Profile, config.profile_period())),
        ];

        Self {
            entity_id,
            registered_at,
            cancel_tx,
            cadences,
            window: RwLock::new(SampleWindow::new(config.window_retention())),
            latest_aggregates: RwLock::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn cadences(&self) -> &[Arc<CadenceState>] {
        &self.cadences
    }

    pub fn cadence(&self, cadence: Cadence) -> Option<&Arc<CadenceState>> {
        self.cadences.iter().find(|state| state.cadence == cadence)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }

    /// Marks the entity removed. Idempotent.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_removed(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    pub fn window(&self) -> &RwLock<SampleWindow> {
        &self.window
    }

    pub async fn set_latest_aggregate(&self, record: AggregateRecord) {
        self.latest_aggregates
            .write()
            .await
            .insert(record.period_type.clone(), record);
    }

    pub async fn latest_aggregate(&self, period_type: &PeriodType) -> Option<AggregateRecord> {
        self.latest_aggregates.read().await.get(period_type).cloned()
    }

    pub async fn attach_tasks(&self, handles: Vec<JoinHandle<()>>) {
        self.tasks.lock().await.extend(handles);
    }

    pub async fn take_tasks(&self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut *self.tasks.lock().await)
    }

    /// Health across all cadences: degraded if any cadence is degraded,
    /// worst failure streak, most recent success, total store failures.
    pub async fn health(&self) -> EntityHealth {
        let mut merged = EntityHealth::active(self.entity_id.clone());
        if self.is_removed() {
            merged.status = EntityStatus::Removed;
        }

        for state in &self.cadences {
            let health = state.health.read().await;
            if health.is_degraded() && merged.status == EntityStatus::Active {
                merged.status = EntityStatus::Degraded;
            }
            merged.consecutive_failures = merged.consecutive_failures.max(health.consecutive_failures);
            merged.last_success_at = merged.last_success_at.max(health.last_success_at);
            merged.store_write_failures += health.store_write_failures;
            if merged.last_error.is_none() {
                merged.last_error = health.last_error.clone();
            }
        }

        merged
    }

    pub async fn summary(&self) -> EntitySummary {
        let mut cadences = Vec::with_capacity(self.cadences.len());
        for state in &self.cadences {
            cadences.push(state.summary().await);
        }

        EntitySummary {
            entity_id: self.entity_id.clone(),
            registered_at: self.registered_at,
            health: self.health().await,
            cadences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::MonitorError;
    use monitor_testing_utils::{base_time, test_engine_config};

    fn handle() -> EntityHandle {
        EntityHandle::new("abc".to_string(), base_time(), &test_engine_config())
    }

    #[tokio::test]
    async fn test_new_handle_is_active() {
        let handle = handle();
        let health = handle.health().await;
        assert_eq!(health.status, EntityStatus::Active);
        assert_eq!(health.consecutive_failures, 0);
        assert!(!handle.is_removed());
        assert_eq!(handle.cadences().len(), 3);
    }

    #[tokio::test]
    async fn test_health_merges_cadences() {
        let handle = handle();
        let err = MonitorError::transient("abc", "503");

        let raw = handle.cadence(Cadence::Raw).unwrap();
        for _ in 0..3 {
            raw.health().write().await.record_failure(&err, 3);
        }
        let profile = handle.cadence(Cadence::Profile).unwrap();
        profile.health().write().await.record_success(base_time());
        let rollup = handle.cadence(Cadence::Rollup).unwrap();
        rollup
            .health()
            .write()
            .await
            .record_store_failure(&MonitorError::store_write("disk full"));

        let health = handle.health().await;
        assert_eq!(health.status, EntityStatus::Degraded);
        assert_eq!(health.consecutive_failures, 3);
        assert_eq!(health.last_success_at, Some(base_time()));
        assert_eq!(health.store_write_failures, 1);
        assert!(health.last_error.is_some());
    }

    #[tokio::test]
    async fn test_cancel_is_observed_by_subscribers() {
        let handle = handle();
        let mut rx = handle.subscribe();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_removed());
        wait_removed(&mut rx).await;
    }

    #[tokio::test]
    async fn test_summary_reports_periods() {
        let handle = handle();
        let at = base_time();
        handle
            .cadence(Cadence::Raw)
            .unwrap()
            .set_next_fire_at(at)
            .await;

        let summary = handle.summary().await;
        assert_eq!(summary.entity_id, "abc");
        let raw = summary
            .cadences
            .iter()
            .find(|c| c.cadence == Cadence::Raw)
            .unwrap();
        assert_eq!(raw.period_seconds, 30);
        assert_eq!(raw.next_fire_at, Some(at));
    }
}
