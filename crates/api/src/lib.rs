//! # Monitor API
//!
//! HTTP surface of the stream monitor, built on axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - liveness and number of monitored entities
//! - `GET /metrics` - Prometheus exposition, when a recorder is installed
//! - `GET /api/entities` - monitored entities with their health
//! - `POST /api/entities` - start monitoring `{"entity_id": "..."}`
//! - `GET /api/entities/{id}` / `DELETE /api/entities/{id}`
//! - `GET /api/entities/{id}/health`
//! - `GET /api/entities/{id}/aggregates/latest?period_type=5min`
//! - `GET /api/entities/{id}/aggregates?period_type=&from=&to=`
//! - `GET /api/entities/{id}/samples?from=&to=`
//! - `GET /api/entities/{id}/profile`
//!
//! Errors use a JSON envelope `{"error": {"message", "type", "code", "timestamp"}}`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use monitor_engine::MonitorEngine;
use std::sync::Arc;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};

/// Router with tracing, CORS and request logging layers.
pub fn create_app(engine: Arc<MonitorEngine>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let state = AppState {
        engine,
        metrics_handle,
    };

    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
