//! Structured logging utilities
//!
//! Every record carries an `event` field so log pipelines can filter on the
//! engine lifecycle without parsing messages.

use chrono::{DateTime, Utc};
use monitor_core::models::{Cadence, PeriodType};
use tracing::{debug, error, info, warn};

pub struct StructuredLogger;

impl StructuredLogger {
    pub fn log_entity_registered(entity_id: &str, monitored: usize) {
        info!(
            event = "entity_registered",
            entity.id = entity_id,
            monitored = monitored,
            "Entity registered for monitoring"
        );
    }

    pub fn log_entity_removed(entity_id: &str, monitored: usize) {
        info!(
            event = "entity_removed",
            entity.id = entity_id,
            monitored = monitored,
            "Entity removed from monitoring"
        );
    }

    pub fn log_entity_auto_removed(entity_id: &str, reason: &str) {
        warn!(
            event = "entity_auto_removed",
            entity.id = entity_id,
            reason = reason,
            "Entity removed after permanent fetch failures"
        );
    }

    pub fn log_sample_recorded(entity_id: &str, viewer_count: u64, timestamp: DateTime<Utc>) {
        debug!(
            event = "sample_recorded",
            entity.id = entity_id,
            sample.viewers = viewer_count,
            sample.timestamp = %timestamp,
            "Raw sample recorded"
        );
    }

    pub fn log_aggregate_emitted(
        entity_id: &str,
        period_type: &PeriodType,
        sample_count: u64,
        average_viewers: f64,
        peak_viewers: u64,
    ) {
        info!(
            event = "aggregate_emitted",
            entity.id = entity_id,
            aggregate.period_type = %period_type,
            aggregate.samples = sample_count,
            aggregate.average = average_viewers,
            aggregate.peak = peak_viewers,
            "Aggregate emitted"
        );
    }

    pub fn log_aggregate_skipped(entity_id: &str, period_type: &PeriodType) {
        debug!(
            event = "aggregate_skipped",
            entity.id = entity_id,
            aggregate.period_type = %period_type,
            "No samples in rollup window, aggregate skipped"
        );
    }

    pub fn log_fetch_failed(
        entity_id: &str,
        cadence: Cadence,
        attempt: u32,
        max_attempts: u32,
        error_message: &str,
    ) {
        warn!(
            event = "fetch_failed",
            entity.id = entity_id,
            cadence = %cadence,
            fetch.attempt = attempt,
            fetch.max_attempts = max_attempts,
            error = error_message,
            "Metrics fetch failed"
        );
    }

    pub fn log_entity_degraded(entity_id: &str, cadence: Cadence, consecutive_failures: u32) {
        warn!(
            event = "entity_degraded",
            entity.id = entity_id,
            cadence = %cadence,
            consecutive_failures = consecutive_failures,
            "Entity degraded after repeated fetch failures"
        );
    }

    pub fn log_entity_recovered(entity_id: &str, cadence: Cadence) {
        info!(
            event = "entity_recovered",
            entity.id = entity_id,
            cadence = %cadence,
            "Entity recovered"
        );
    }

    pub fn log_store_write_failed(entity_id: &str, record: &str, error_message: &str) {
        error!(
            event = "store_write_failed",
            entity.id = entity_id,
            record = record,
            error = error_message,
            "Store write failed, record dropped"
        );
    }
}
