use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Maps the tokio monotonic clock onto wall-clock timestamps.
///
/// Scheduling runs on [`tokio::time::Instant`], so a paused test runtime
/// advances both the timers and the timestamps the engine records.
#[derive(Debug, Clone, Copy)]
pub struct EngineClock {
    anchor: Instant,
    anchor_wall: DateTime<Utc>,
}

impl EngineClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Clock whose current instant reads as `wall`.
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            anchor: Instant::now(),
            anchor_wall: wall,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.wall_time(Instant::now())
    }

    pub fn wall_time(&self, at: Instant) -> DateTime<Utc> {
        if at >= self.anchor {
            let delta = TimeDelta::from_std(at - self.anchor).unwrap_or(TimeDelta::zero());
            self.anchor_wall + delta
        } else {
            let delta = TimeDelta::from_std(self.anchor - at).unwrap_or(TimeDelta::zero());
            self.anchor_wall - delta
        }
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::new()
    }
}
