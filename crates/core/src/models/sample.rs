use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time reading returned by a [`MetricsFetcher`](crate::traits::MetricsFetcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub viewer_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub chat_message_count: u64,
    pub subscriber_count: u64,
    pub as_of_time: DateTime<Utc>,
}

/// Engagement counters carried alongside the viewer count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    pub like_count: u64,
    pub comment_count: u64,
    pub chat_message_count: u64,
    pub subscriber_count: u64,
}

/// One raw observation recorded by the raw cadence. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub viewer_count: u64,
    #[serde(flatten)]
    pub engagement: EngagementMetrics,
}

impl Sample {
    pub fn new(entity_id: impl Into<String>, timestamp: DateTime<Utc>, viewer_count: u64) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            viewer_count,
            engagement: EngagementMetrics::default(),
        }
    }

    /// Builds a sample stamped with the engine clock at the moment the fetch
    /// succeeded rather than the upstream `as_of_time`.
    pub fn from_snapshot(entity_id: &str, timestamp: DateTime<Utc>, snapshot: &Snapshot) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            timestamp,
            viewer_count: snapshot.viewer_count,
            engagement: EngagementMetrics {
                like_count: snapshot.like_count,
                comment_count: snapshot.comment_count,
                chat_message_count: snapshot.chat_message_count,
                subscriber_count: snapshot.subscriber_count,
            },
        }
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_sample_from_snapshot_uses_tick_time() {
        let as_of = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let tick = as_of + Duration::seconds(2);
        let snapshot = Snapshot {
            viewer_count: 120,
            like_count: 7,
            comment_count: 3,
            chat_message_count: 42,
            subscriber_count: 1000,
            as_of_time: as_of,
        };

        let sample = Sample::from_snapshot("abc", tick, &snapshot);
        assert_eq!(sample.timestamp, tick);
        assert_eq!(sample.viewer_count, 120);
        assert_eq!(sample.engagement.chat_message_count, 42);
        assert_eq!(sample.engagement.subscriber_count, 1000);
    }

    #[test]
    fn test_time_range_is_half_open() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let end = start + Duration::minutes(5);
        let range = TimeRange::new(start, end);

        assert!(range.contains(start));
        assert!(range.contains(end - Duration::milliseconds(1)));
        assert!(!range.contains(end));
        assert!(!range.is_empty());
        assert!(TimeRange::new(end, start).is_empty());
    }
}
