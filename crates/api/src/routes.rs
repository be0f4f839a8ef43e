use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use monitor_engine::MonitorEngine;
use std::sync::Arc;

use crate::handlers::{
    entities::{
        create_entity, delete_entity, get_entity, get_entity_health, get_latest_aggregate,
        get_profile, list_aggregates, list_entities, list_samples,
    },
    health::health_check,
    metrics::prometheus_metrics,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MonitorEngine>,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/entities", get(list_entities).post(create_entity))
        .route("/api/entities/{id}", get(get_entity).delete(delete_entity))
        .route("/api/entities/{id}/health", get(get_entity_health))
        .route("/api/entities/{id}/aggregates", get(list_aggregates))
        .route(
            "/api/entities/{id}/aggregates/latest",
            get(get_latest_aggregate),
        )
        .route("/api/entities/{id}/samples", get(list_samples))
        .route("/api/entities/{id}/profile", get(get_profile))
        .with_state(state)
}
