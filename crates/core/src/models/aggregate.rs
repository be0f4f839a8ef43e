use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label identifying the cadence that produced an aggregate, e.g. `5min`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodType(String);

impl PeriodType {
    pub const RAW: &'static str = "raw";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn raw() -> Self {
        Self(Self::RAW.to_string())
    }

    /// Derives the label from a period using the largest whole unit:
    /// 86400s -> `1d`, 3600s -> `1h`, 300s -> `5min`, 45s -> `45s`.
    pub fn for_period(period: Duration) -> Self {
        let secs = period.as_secs();
        let label = if secs == 0 {
            format!("{}ms", period.as_millis())
        } else if secs % 86_400 == 0 {
            format!("{}d", secs / 86_400)
        } else if secs % 3_600 == 0 {
            format!("{}h", secs / 3_600)
        } else if secs % 60 == 0 {
            format!("{}min", secs / 60)
        } else {
            format!("{secs}s")
        };
        Self(label)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeriodType {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Statistical summary of the raw samples in `[period_start, period_end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub entity_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub average_viewers: f64,
    pub peak_viewers: u64,
    pub sample_count: u64,
    pub duration_seconds: u64,
    pub period_type: PeriodType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_type_labels() {
        assert_eq!(PeriodType::for_period(Duration::from_secs(30)).as_str(), "30s");
        assert_eq!(PeriodType::for_period(Duration::from_secs(300)).as_str(), "5min");
        assert_eq!(PeriodType::for_period(Duration::from_secs(3600)).as_str(), "1h");
        assert_eq!(PeriodType::for_period(Duration::from_secs(86_400)).as_str(), "1d");
        assert_eq!(PeriodType::for_period(Duration::from_secs(90)).as_str(), "90s");
        assert_eq!(PeriodType::for_period(Duration::from_millis(250)).as_str(), "250ms");
    }

    #[test]
    fn test_period_type_serializes_as_plain_string() {
        let json = serde_json::to_string(&PeriodType::new("5min")).unwrap();
        assert_eq!(json, "\"5min\"");
    }
}
