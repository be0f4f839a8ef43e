use chrono::{DateTime, Utc};
use monitor_core::models::{AggregateRecord, PeriodType, Sample};

/// Turns a window of raw samples into an [`AggregateRecord`].
pub struct Aggregator;

impl Aggregator {
    /// Simple mean and peak of `viewer_count` over `samples`, which the
    /// caller has already restricted to `[period_start, period_end)`.
    ///
    /// Returns `None` for an empty input: there is no defined average.
    pub fn aggregate(
        entity_id: &str,
        samples: &[Sample],
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        period_type: &PeriodType,
    ) -> Option<AggregateRecord> {
        let peak_viewers = samples.iter().map(|s| s.viewer_count).max()?;
        let total: f64 = samples.iter().map(|s| s.viewer_count as f64).sum();
        let sample_count = samples.len() as u64;

        Some(AggregateRecord {
            entity_id: entity_id.to_string(),
            period_start,
            period_end,
            average_viewers: total / sample_count as f64,
            peak_viewers,
            sample_count,
            duration_seconds: (period_end - period_start).num_seconds().max(0) as u64,
            period_type: period_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use monitor_testing_utils::{base_time, sample_series};

    #[test]
    fn test_aggregate_mean_and_peak() {
        let samples = sample_series("a", 30, &[10, 20, 30]);
        let end = base_time() + TimeDelta::minutes(5);
        let record =
            Aggregator::aggregate("a", &samples, base_time(), end, &PeriodType::new("5min"))
                .unwrap();

        assert_eq!(record.average_viewers, 20.0);
        assert_eq!(record.peak_viewers, 30);
        assert_eq!(record.sample_count, 3);
        assert_eq!(record.duration_seconds, 300);
        assert_eq!(record.period_type.as_str(), "5min");
        assert_eq!(record.period_start, base_time());
        assert_eq!(record.period_end, end);
    }

    #[test]
    fn test_aggregate_empty_is_none() {
        let end = base_time() + TimeDelta::minutes(5);
        assert!(Aggregator::aggregate("a", &[], base_time(), end, &PeriodType::new("5min")).is_none());
    }

    #[test]
    fn test_aggregate_is_unweighted() {
        // Uneven spacing does not change the mean.
        let mut samples = sample_series("a", 1, &[0, 100]);
        samples[1].timestamp = base_time() + TimeDelta::seconds(250);
        let record = Aggregator::aggregate(
            "a",
            &samples,
            base_time(),
            base_time() + TimeDelta::minutes(5),
            &PeriodType::new("5min"),
        )
        .unwrap();
        assert_eq!(record.average_viewers, 50.0);
    }
}
