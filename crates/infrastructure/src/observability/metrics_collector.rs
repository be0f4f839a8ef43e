//! Metrics collector for the stream monitor
//!
//! Thin wrapper over the `metrics` facade. Without an installed recorder
//! every call is a no-op, so the engine always owns a collector.

use metrics::{counter, gauge, histogram, Counter, Gauge};
use monitor_core::models::Cadence;

pub const SAMPLES_RECORDED: &str = "stream_monitor_samples_recorded_total";
pub const AGGREGATES_EMITTED: &str = "stream_monitor_aggregates_emitted_total";
pub const FETCH_FAILURES: &str = "stream_monitor_fetch_failures_total";
pub const FETCH_RETRIES: &str = "stream_monitor_fetch_retries_total";
pub const STORE_WRITE_FAILURES: &str = "stream_monitor_store_write_failures_total";
pub const TICKS_COALESCED: &str = "stream_monitor_ticks_coalesced_total";
pub const MONITORED_ENTITIES: &str = "stream_monitor_monitored_entities";
pub const FETCH_DURATION: &str = "stream_monitor_fetch_duration_seconds";

#[derive(Debug, Clone)]
pub struct MetricsCollector {
    samples_recorded: Counter,
    aggregates_emitted: Counter,
    store_write_failures: Counter,
    ticks_coalesced: Counter,
    monitored_entities: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            samples_recorded: counter!(SAMPLES_RECORDED),
            aggregates_emitted: counter!(AGGREGATES_EMITTED),
            store_write_failures: counter!(STORE_WRITE_FAILURES),
            ticks_coalesced: counter!(TICKS_COALESCED),
            monitored_entities: gauge!(MONITORED_ENTITIES),
        }
    }

    pub fn record_sample(&self) {
        self.samples_recorded.increment(1);
    }

    pub fn record_aggregate(&self) {
        self.aggregates_emitted.increment(1);
    }

    pub fn record_store_write_failure(&self) {
        self.store_write_failures.increment(1);
    }

    pub fn record_ticks_coalesced(&self, skipped: u64) {
        self.ticks_coalesced.increment(skipped);
    }

    pub fn set_monitored_entities(&self, count: usize) {
        self.monitored_entities.set(count as f64);
    }

    pub fn record_fetch_failure(&self, cadence: Cadence) {
        counter!(FETCH_FAILURES, "cadence" => cadence.as_str()).increment(1);
    }

    pub fn record_fetch_retry(&self, cadence: Cadence) {
        counter!(FETCH_RETRIES, "cadence" => cadence.as_str()).increment(1);
    }

    pub fn record_fetch_duration(&self, cadence: Cadence, duration_seconds: f64) {
        histogram!(FETCH_DURATION, "cadence" => cadence.as_str()).record(duration_seconds);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
