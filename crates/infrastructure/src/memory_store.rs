use async_trait::async_trait;
use monitor_core::models::{AggregateRecord, PeriodType, Profile, Sample, TimeRange};
use monitor_core::traits::{ProfileStore, SampleStore};
use monitor_core::MonitorResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 内存样本存储
///
/// Keeps every appended record for the life of the process. Used for the
/// `memory` storage backend and for local runs without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemorySampleStore {
    /// entity_id -> samples in append order
    samples: Arc<RwLock<HashMap<String, Vec<Sample>>>>,
    aggregates: Arc<RwLock<HashMap<String, Vec<AggregateRecord>>>>,
}

impl InMemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sample_count(&self) -> usize {
        self.samples.read().await.values().map(Vec::len).sum()
    }

    pub async fn aggregate_count(&self) -> usize {
        self.aggregates.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl SampleStore for InMemorySampleStore {
    async fn append_sample(&self, sample: &Sample) -> MonitorResult<()> {
        self.samples
            .write()
            .await
            .entry(sample.entity_id.clone())
            .or_default()
            .push(sample.clone());
        debug!(entity_id = %sample.entity_id, "sample appended to memory store");
        Ok(())
    }

    async fn append_aggregate(&self, record: &AggregateRecord) -> MonitorResult<()> {
        self.aggregates
            .write()
            .await
            .entry(record.entity_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn query_samples(&self, entity_id: &str, range: TimeRange) -> MonitorResult<Vec<Sample>> {
        let samples = self.samples.read().await;
        let mut result: Vec<Sample> = samples
            .get(entity_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|s| range.contains(s.timestamp))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        result.sort_by_key(|s| s.timestamp);
        Ok(result)
    }

    async fn query_aggregates(
        &self,
        entity_id: &str,
        period_type: &PeriodType,
        range: TimeRange,
    ) -> MonitorResult<Vec<AggregateRecord>> {
        let aggregates = self.aggregates.read().await;
        let mut result: Vec<AggregateRecord> = aggregates
            .get(entity_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|a| &a.period_type == period_type && range.contains(a.period_end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        result.sort_by_key(|a| a.period_end);
        Ok(result)
    }
}

/// 内存档案存储
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert_profile(&self, profile: &Profile) -> MonitorResult<()> {
        self.profiles
            .write()
            .await
            .insert(profile.entity_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, entity_id: &str) -> MonitorResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(entity_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use monitor_testing_utils::{base_time, sample_series};

    #[tokio::test]
    async fn test_query_samples_filters_by_entity_and_range() {
        let store = InMemorySampleStore::new();
        for sample in sample_series("a", 30, &[10, 20, 30, 40]) {
            store.append_sample(&sample).await.unwrap();
        }
        for sample in sample_series("b", 30, &[99]) {
            store.append_sample(&sample).await.unwrap();
        }

        let range = TimeRange::new(base_time() + Duration::seconds(30), base_time() + Duration::seconds(90));
        let samples = store.query_samples("a", range).await.unwrap();
        let viewers: Vec<u64> = samples.iter().map(|s| s.viewer_count).collect();
        assert_eq!(viewers, vec![20, 30]);
        assert_eq!(store.sample_count().await, 5);
    }

    #[tokio::test]
    async fn test_query_aggregates_filters_by_period_type() {
        let store = InMemorySampleStore::new();
        let record = AggregateRecord {
            entity_id: "a".to_string(),
            period_start: base_time(),
            period_end: base_time() + Duration::minutes(5),
            average_viewers: 20.0,
            peak_viewers: 30,
            sample_count: 3,
            duration_seconds: 300,
            period_type: PeriodType::new("5min"),
        };
        store.append_aggregate(&record).await.unwrap();

        let range = TimeRange::new(base_time(), base_time() + Duration::hours(1));
        let found = store
            .query_aggregates("a", &PeriodType::new("5min"), range)
            .await
            .unwrap();
        assert_eq!(found, vec![record]);

        let other = store
            .query_aggregates("a", &PeriodType::new("1h"), range)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_profile_upsert_replaces() {
        let store = InMemoryProfileStore::new();
        let mut profile = Profile {
            entity_id: "a".to_string(),
            channel_id: "UC1".to_string(),
            channel_name: "first".to_string(),
            description: String::new(),
            subscriber_count: 1,
            view_count: 2,
            video_count: 3,
            fetched_at: base_time(),
        };
        store.upsert_profile(&profile).await.unwrap();
        profile.subscriber_count = 10;
        store.upsert_profile(&profile).await.unwrap();

        let loaded = store.get_profile("a").await.unwrap().unwrap();
        assert_eq!(loaded.subscriber_count, 10);
        assert!(store.get_profile("missing").await.unwrap().is_none());
    }
}
