//! In-memory mock implementations of the collaborator traits.
//!
//! Every mock is cheaply cloneable and shares its state between clones, so a
//! test can hand one copy to the engine and keep another for assertions.

use async_trait::async_trait;
use chrono::Utc;
use monitor_core::models::{AggregateRecord, PeriodType, Profile, Sample, Snapshot, TimeRange};
use monitor_core::traits::{MetricsFetcher, ProfileStore, SampleStore};
use monitor_core::{MonitorError, MonitorResult};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of one scripted fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchBehavior {
    Viewers(u64),
    Transient,
    Permanent,
}

#[derive(Debug, Default)]
struct FetcherState {
    scripts: HashMap<String, VecDeque<FetchBehavior>>,
    defaults: HashMap<String, FetchBehavior>,
    profile_defaults: HashMap<String, FetchBehavior>,
    latency: HashMap<String, Duration>,
    live_calls: HashMap<String, Vec<Instant>>,
    profile_calls: HashMap<String, usize>,
    rejected: HashSet<String>,
}

/// Mock implementation of MetricsFetcher for testing
///
/// Outcomes are taken from a per-entity script first, then from the
/// per-entity default, then fall back to `Viewers(100)`.
#[derive(Debug, Clone, Default)]
pub struct MockMetricsFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockMetricsFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_default(&self, entity_id: &str, behavior: FetchBehavior) {
        self.state
            .lock()
            .unwrap()
            .defaults
            .insert(entity_id.to_string(), behavior);
    }

    pub fn push_script(&self, entity_id: &str, outcomes: Vec<FetchBehavior>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(entity_id.to_string())
            .or_default()
            .extend(outcomes);
    }

    pub fn set_profile_behavior(&self, entity_id: &str, behavior: FetchBehavior) {
        self.state
            .lock()
            .unwrap()
            .profile_defaults
            .insert(entity_id.to_string(), behavior);
    }

    /// Every fetch for `entity_id` sleeps this long before answering.
    pub fn set_latency(&self, entity_id: &str, latency: Duration) {
        self.state
            .lock()
            .unwrap()
            .latency
            .insert(entity_id.to_string(), latency);
    }

    pub fn reject_id(&self, entity_id: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected
            .insert(entity_id.to_string());
    }

    pub fn live_calls(&self, entity_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .live_calls
            .get(entity_id)
            .map_or(0, Vec::len)
    }

    /// Times at which `fetch_live` was entered for `entity_id`.
    pub fn live_call_times(&self, entity_id: &str) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .live_calls
            .get(entity_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn profile_calls(&self, entity_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .profile_calls
            .get(entity_id)
            .copied()
            .unwrap_or(0)
    }

    fn next_live(&self, entity_id: &str) -> (FetchBehavior, Option<Duration>) {
        let mut state = self.state.lock().unwrap();
        state
            .live_calls
            .entry(entity_id.to_string())
            .or_default()
            .push(Instant::now());
        let scripted = state
            .scripts
            .get_mut(entity_id)
            .and_then(VecDeque::pop_front);
        let behavior = scripted
            .or_else(|| state.defaults.get(entity_id).cloned())
            .unwrap_or(FetchBehavior::Viewers(100));
        (behavior, state.latency.get(entity_id).copied())
    }

    fn next_profile(&self, entity_id: &str) -> (FetchBehavior, Option<Duration>) {
        let mut state = self.state.lock().unwrap();
        *state
            .profile_calls
            .entry(entity_id.to_string())
            .or_default() += 1;
        let behavior = state
            .profile_defaults
            .get(entity_id)
            .cloned()
            .unwrap_or(FetchBehavior::Viewers(0));
        (behavior, state.latency.get(entity_id).copied())
    }
}

#[async_trait]
impl MetricsFetcher for MockMetricsFetcher {
    async fn fetch_live(&self, entity_id: &str) -> MonitorResult<Snapshot> {
        let (behavior, latency) = self.next_live(entity_id);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match behavior {
            FetchBehavior::Viewers(viewers) => Ok(Snapshot {
                viewer_count: viewers,
                like_count: viewers / 10,
                comment_count: viewers / 20,
                chat_message_count: viewers / 5,
                subscriber_count: 1_000,
                as_of_time: Utc::now(),
            }),
            FetchBehavior::Transient => Err(MonitorError::transient(entity_id, "mock upstream 503")),
            FetchBehavior::Permanent => Err(MonitorError::permanent(entity_id, "mock video gone")),
        }
    }

    async fn fetch_profile(&self, entity_id: &str) -> MonitorResult<Profile> {
        let (behavior, latency) = self.next_profile(entity_id);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match behavior {
            FetchBehavior::Viewers(_) => Ok(Profile {
                entity_id: entity_id.to_string(),
                channel_id: format!("UC-{entity_id}"),
                channel_name: format!("channel {entity_id}"),
                description: String::new(),
                subscriber_count: 1_000,
                view_count: 50_000,
                video_count: 42,
                fetched_at: Utc::now(),
            }),
            FetchBehavior::Transient => Err(MonitorError::transient(entity_id, "mock upstream 503")),
            FetchBehavior::Permanent => Err(MonitorError::permanent(entity_id, "mock channel gone")),
        }
    }

    fn validate_entity_id(&self, entity_id: &str) -> MonitorResult<()> {
        if self.state.lock().unwrap().rejected.contains(entity_id) {
            return Err(MonitorError::invalid_entity_id(entity_id, "rejected by mock fetcher"));
        }
        Ok(())
    }
}

/// Mock implementation of SampleStore recording every successful write
#[derive(Debug, Clone, Default)]
pub struct MockSampleStore {
    samples: Arc<Mutex<Vec<Sample>>>,
    aggregates: Arc<Mutex<Vec<AggregateRecord>>>,
    fail_sample_writes: Arc<AtomicBool>,
    fail_aggregate_writes: Arc<AtomicBool>,
}

impl MockSampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sample_writes(&self, fail: bool) {
        self.fail_sample_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_aggregate_writes(&self, fail: bool) {
        self.fail_aggregate_writes.store(fail, Ordering::SeqCst);
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.samples.lock().unwrap().clone()
    }

    pub fn samples_for(&self, entity_id: &str) -> Vec<Sample> {
        self.samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn aggregates(&self) -> Vec<AggregateRecord> {
        self.aggregates.lock().unwrap().clone()
    }

    pub fn aggregates_for(&self, entity_id: &str) -> Vec<AggregateRecord> {
        self.aggregates
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.samples.lock().unwrap().clear();
        self.aggregates.lock().unwrap().clear();
    }
}

#[async_trait]
impl SampleStore for MockSampleStore {
    async fn append_sample(&self, sample: &Sample) -> MonitorResult<()> {
        if self.fail_sample_writes.load(Ordering::SeqCst) {
            return Err(MonitorError::store_write("mock sample write failure"));
        }
        self.samples.lock().unwrap().push(sample.clone());
        Ok(())
    }

    async fn append_aggregate(&self, record: &AggregateRecord) -> MonitorResult<()> {
        if self.fail_aggregate_writes.load(Ordering::SeqCst) {
            return Err(MonitorError::store_write("mock aggregate write failure"));
        }
        self.aggregates.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn query_samples(&self, entity_id: &str, range: TimeRange) -> MonitorResult<Vec<Sample>> {
        let mut samples: Vec<Sample> = self
            .samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.entity_id == entity_id && range.contains(s.timestamp))
            .cloned()
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    async fn query_aggregates(
        &self,
        entity_id: &str,
        period_type: &PeriodType,
        range: TimeRange,
    ) -> MonitorResult<Vec<AggregateRecord>> {
        let mut records: Vec<AggregateRecord> = self
            .aggregates
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.entity_id == entity_id
                    && &a.period_type == period_type
                    && range.contains(a.period_end)
            })
            .cloned()
            .collect();
        records.sort_by_key(|a| a.period_end);
        Ok(records)
    }
}

/// Mock implementation of ProfileStore
#[derive(Debug, Clone, Default)]
pub struct MockProfileStore {
    profiles: Arc<Mutex<HashMap<String, Profile>>>,
    upserts: Arc<Mutex<usize>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        *self.upserts.lock().unwrap()
    }

    pub fn profile(&self, entity_id: &str) -> Option<Profile> {
        self.profiles.lock().unwrap().get(entity_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn upsert_profile(&self, profile: &Profile) -> MonitorResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MonitorError::store_write("mock profile write failure"));
        }
        *self.upserts.lock().unwrap() += 1;
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.entity_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, entity_id: &str) -> MonitorResult<Option<Profile>> {
        Ok(self.profiles.lock().unwrap().get(entity_id).cloned())
    }
}
