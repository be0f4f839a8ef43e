use async_trait::async_trait;

use crate::models::{AggregateRecord, PeriodType, Profile, Sample, TimeRange};
use crate::MonitorResult;

/// Append-only persistence for raw samples and aggregate records.
#[async_trait]
pub trait SampleStore: Send + Sync {
    async fn append_sample(&self, sample: &Sample) -> MonitorResult<()>;

    async fn append_aggregate(&self, record: &AggregateRecord) -> MonitorResult<()>;

    /// Samples with `timestamp` in `range`, ordered by timestamp.
    async fn query_samples(&self, entity_id: &str, range: TimeRange) -> MonitorResult<Vec<Sample>>;

    /// Aggregates of one period type whose `period_end` falls in `range`,
    /// ordered by `period_end`.
    async fn query_aggregates(
        &self,
        entity_id: &str,
        period_type: &PeriodType,
        range: TimeRange,
    ) -> MonitorResult<Vec<AggregateRecord>>;
}

/// Keyed store for the latest profile of each entity.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert_profile(&self, profile: &Profile) -> MonitorResult<()>;

    async fn get_profile(&self, entity_id: &str) -> MonitorResult<Option<Profile>>;
}
