//! Fixed-period tick arithmetic.

use std::time::Duration;

use monitor_core::models::Cadence;
use tokio::time::Instant;

/// Next fire time of a fixed-period cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextFire {
    pub at: Instant,
    /// Whole periods that elapsed while the previous tick was running and
    /// are folded into the immediate fire.
    pub coalesced: u64,
}

/// Computes when a cadence fires after the tick scheduled at `scheduled`.
///
/// The following fire is `scheduled + period`. If that moment has already
/// passed, the task fires once at `now` and any further missed ticks are
/// dropped.
pub fn next_fire(scheduled: Instant, period: Duration, now: Instant) -> NextFire {
    let on_time = scheduled + period;
    if on_time > now {
        return NextFire {
            at: on_time,
            coalesced: 0,
        };
    }

    let overdue = now.duration_since(on_time);
    let coalesced = if period.is_zero() {
        0
    } else {
        (overdue.as_nanos() / period.as_nanos()) as u64
    };
    NextFire { at: now, coalesced }
}

/// Delay between registration and the first tick of a cadence.
///
/// Fetching cadences start immediately; the rollup waits one full period so
/// its first window has had a chance to fill.
pub fn first_fire_delay(cadence: Cadence, period: Duration) -> Duration {
    match cadence {
        Cadence::Raw | Cadence::Profile => Duration::ZERO,
        Cadence::Rollup => period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_on_time_tick_keeps_fixed_period() {
        let start = Instant::now();
        // A fetch that took 12s does not shift the schedule.
        let next = next_fire(start, PERIOD, start + Duration::from_secs(12));
        assert_eq!(next.at, start + PERIOD);
        assert_eq!(next.coalesced, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_fires_immediately() {
        let start = Instant::now();
        let now = start + Duration::from_secs(35);
        let next = next_fire(start, PERIOD, now);
        assert_eq!(next.at, now);
        assert_eq!(next.coalesced, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_overrun_coalesces_missed_ticks() {
        let start = Instant::now();
        // Ticks at 30s, 60s and 90s were missed; only one fire happens, at 100s.
        let now = start + Duration::from_secs(100);
        let next = next_fire(start, PERIOD, now);
        assert_eq!(next.at, now);
        assert_eq!(next.coalesced, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_boundary_fires_now() {
        let start = Instant::now();
        let now = start + PERIOD;
        let next = next_fire(start, PERIOD, now);
        assert_eq!(next.at, now);
        assert_eq!(next.coalesced, 0);
    }

    #[test]
    fn test_first_fire_delay() {
        assert_eq!(first_fire_delay(Cadence::Raw, PERIOD), Duration::ZERO);
        assert_eq!(first_fire_delay(Cadence::Profile, PERIOD), Duration::ZERO);
        assert_eq!(first_fire_delay(Cadence::Rollup, PERIOD), PERIOD);
    }
}
