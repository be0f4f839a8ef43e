use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use monitor_core::models::{Sample, TimeRange};
use monitor_core::{MonitorError, MonitorResult};

/// In-memory raw samples of one entity, bounded by age rather than count.
///
/// Written only by the entity's raw cadence task; readers take copies via
/// [`SampleWindow::samples_in`].
#[derive(Debug, Clone)]
pub struct SampleWindow {
    retention: TimeDelta,
    samples: VecDeque<Sample>,
}

impl SampleWindow {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
            samples: VecDeque::new(),
        }
    }

    /// Appends a sample and evicts everything older than `retention` relative
    /// to it. Timestamps must be strictly increasing.
    pub fn push(&mut self, sample: Sample) -> MonitorResult<()> {
        if let Some(last) = self.samples.back() {
            if sample.timestamp <= last.timestamp {
                return Err(MonitorError::Internal(format!(
                    "out-of-order sample for {}: {} is not after {}",
                    sample.entity_id, sample.timestamp, last.timestamp
                )));
            }
        }
        let now = sample.timestamp;
        self.samples.push_back(sample);
        self.prune(now);
        Ok(())
    }

    /// Drops samples with `timestamp < now - retention`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return;
        };
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.samples.pop_front();
        }
    }

    /// Copies of the samples whose timestamp falls in `range`, oldest first.
    pub fn samples_in(&self, range: TimeRange) -> Vec<Sample> {
        self.samples
            .iter()
            .filter(|s| range.contains(s.timestamp))
            .cloned()
            .collect()
    }

    pub fn oldest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_testing_utils::{base_time, SampleBuilder};

    fn sample_at(offset_secs: i64, viewers: u64) -> Sample {
        SampleBuilder::new()
            .at_offset_secs(offset_secs)
            .with_viewers(viewers)
            .build()
    }

    #[test]
    fn test_eviction_keeps_only_retention() {
        let mut window = SampleWindow::new(Duration::from_secs(30 * 60));
        // t, t+30s, ..., t+31min
        for i in 0..=62 {
            window.push(sample_at(i * 30, 100)).unwrap();
        }

        let t_plus_1min = base_time() + TimeDelta::minutes(1);
        let oldest = window.oldest().unwrap();
        assert!(oldest.timestamp >= t_plus_1min);
        assert_eq!(oldest.timestamp, t_plus_1min);
        assert_eq!(window.len(), 61);
    }

    #[test]
    fn test_rejects_non_increasing_timestamps() {
        let mut window = SampleWindow::new(Duration::from_secs(600));
        window.push(sample_at(30, 1)).unwrap();
        assert!(window.push(sample_at(30, 2)).is_err());
        assert!(window.push(sample_at(0, 3)).is_err());
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_samples_in_is_half_open() {
        let mut window = SampleWindow::new(Duration::from_secs(600));
        for (i, viewers) in [10, 20, 30, 40].into_iter().enumerate() {
            window.push(sample_at(i as i64 * 30, viewers)).unwrap();
        }

        let range = TimeRange::new(base_time(), base_time() + TimeDelta::seconds(90));
        let viewers: Vec<u64> = window
            .samples_in(range)
            .iter()
            .map(|s| s.viewer_count)
            .collect();
        assert_eq!(viewers, vec![10, 20, 30]);
    }

    #[test]
    fn test_prune_without_push() {
        let mut window = SampleWindow::new(Duration::from_secs(60));
        window.push(sample_at(0, 1)).unwrap();
        window.push(sample_at(30, 2)).unwrap();

        window.prune(base_time() + TimeDelta::seconds(75));
        assert_eq!(window.len(), 1);

        window.prune(base_time() + TimeDelta::seconds(500));
        assert!(window.is_empty());
    }
}
