//! Test data builders with sensible defaults.

use chrono::{DateTime, TimeZone, Utc};
use monitor_core::models::{EngagementMetrics, Sample, Snapshot};

/// Fixed reference instant used by builders, 2024-05-01T12:00:00Z.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Builder for creating test Sample values
pub struct SampleBuilder {
    sample: Sample,
}

impl SampleBuilder {
    pub fn new() -> Self {
        Self {
            sample: Sample {
                entity_id: "test_entity".to_string(),
                timestamp: base_time(),
                viewer_count: 100,
                engagement: EngagementMetrics::default(),
            },
        }
    }

    pub fn with_entity_id(mut self, entity_id: &str) -> Self {
        self.sample.entity_id = entity_id.to_string();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.sample.timestamp = timestamp;
        self
    }

    /// Offset from [`base_time`] in seconds.
    pub fn at_offset_secs(mut self, seconds: i64) -> Self {
        self.sample.timestamp = base_time() + chrono::Duration::seconds(seconds);
        self
    }

    pub fn with_viewers(mut self, viewer_count: u64) -> Self {
        self.sample.viewer_count = viewer_count;
        self
    }

    pub fn with_likes(mut self, like_count: u64) -> Self {
        self.sample.engagement.like_count = like_count;
        self
    }

    pub fn with_chat_messages(mut self, chat_message_count: u64) -> Self {
        self.sample.engagement.chat_message_count = chat_message_count;
        self
    }

    pub fn build(self) -> Sample {
        self.sample
    }
}

impl Default for SampleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating test Snapshot values
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot {
                viewer_count: 100,
                like_count: 10,
                comment_count: 5,
                chat_message_count: 20,
                subscriber_count: 1_000,
                as_of_time: base_time(),
            },
        }
    }

    pub fn with_viewers(mut self, viewer_count: u64) -> Self {
        self.snapshot.viewer_count = viewer_count;
        self
    }

    pub fn with_subscribers(mut self, subscriber_count: u64) -> Self {
        self.snapshot.subscriber_count = subscriber_count;
        self
    }

    pub fn with_as_of_time(mut self, as_of_time: DateTime<Utc>) -> Self {
        self.snapshot.as_of_time = as_of_time;
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Samples for one entity at `start + i * step_secs` with the given viewer counts.
pub fn sample_series(entity_id: &str, step_secs: i64, viewers: &[u64]) -> Vec<Sample> {
    viewers
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            SampleBuilder::new()
                .with_entity_id(entity_id)
                .at_offset_secs(i as i64 * step_secs)
                .with_viewers(v)
                .build()
        })
        .collect()
}
