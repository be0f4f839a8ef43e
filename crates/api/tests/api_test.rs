use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use monitor_api::routes::{create_routes, AppState};
use monitor_config::EngineConfig;
use monitor_core::EngineClock;
use monitor_engine::MonitorEngine;
use monitor_testing_utils::{
    base_time, test_engine_config, FetchBehavior, MockMetricsFetcher, MockProfileStore,
    MockSampleStore,
};

struct TestApp {
    router: Router,
    fetcher: MockMetricsFetcher,
}

fn create_test_app(config: EngineConfig) -> TestApp {
    let fetcher = MockMetricsFetcher::new();
    let engine = MonitorEngine::with_clock(
        config,
        Arc::new(fetcher.clone()),
        Arc::new(MockSampleStore::new()),
        Arc::new(MockProfileStore::new()),
        EngineClock::starting_at(base_time()),
    )
    .unwrap();

    let state = AppState {
        engine: Arc::new(engine),
        metrics_handle: None,
    };
    TestApp {
        router: create_routes(state),
        fetcher,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_entity(entity_id: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/entities")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "entity_id": entity_id }).to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_health_endpoint() {
    let app = create_test_app(test_engine_config());

    let (status, json) = send(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "stream-monitor");
    assert_eq!(json["monitored_entities"], 0);
}

#[tokio::test(start_paused = true)]
async fn test_create_entity_then_existing() {
    let app = create_test_app(test_engine_config());

    let (status, json) = send(&app.router, post_entity("dQw4w9WgXcQ")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["success"].as_bool().unwrap());
    assert_eq!(json["data"]["entity_id"], "dQw4w9WgXcQ");
    assert_eq!(json["data"]["health"]["status"], "active");

    let (status, json) = send(&app.router, post_entity("dQw4w9WgXcQ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "entity already monitored");

    let (status, json) = send(&app.router, get("/api/entities")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_entity_id_is_bad_request() {
    let app = create_test_app(test_engine_config());

    let (status, json) = send(&app.router, post_entity("has space")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["type"], "INVALID_ENTITY_ID");
}

#[tokio::test(start_paused = true)]
async fn test_capacity_is_conflict() {
    let config = EngineConfig {
        max_entities: 1,
        ..test_engine_config()
    };
    let app = create_test_app(config);

    send(&app.router, post_entity("a")).await;
    let (status, json) = send(&app.router, post_entity("b")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], 409);
}

#[tokio::test(start_paused = true)]
async fn test_delete_entity() {
    let app = create_test_app(test_engine_config());
    send(&app.router, post_entity("a")).await;

    let (status, _) = send(&app.router, delete("/api/entities/a")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send(&app.router, get("/api/entities/a/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "removed");

    let (status, _) = send(&app.router, delete("/api/entities/a")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app.router, get("/api/entities/a")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_entity_is_not_found() {
    let app = create_test_app(test_engine_config());

    let (status, json) = send(&app.router, get("/api/entities/missing/health")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["type"], "ENTITY_NOT_FOUND");
}

#[tokio::test(start_paused = true)]
async fn test_degraded_health_is_reported() {
    let app = create_test_app(test_engine_config());
    app.fetcher.set_default("a", FetchBehavior::Transient);
    send(&app.router, post_entity("a")).await;

    tokio::time::sleep(Duration::from_secs(5)).await;

    let (status, json) = send(&app.router, get("/api/entities/a/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "degraded");
    assert_eq!(json["data"]["consecutive_failures"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_samples_and_latest_aggregate() {
    let config = EngineConfig {
        rollup_period_seconds: 60,
        ..test_engine_config()
    };
    let app = create_test_app(config);
    app.fetcher.push_script(
        "a",
        vec![FetchBehavior::Viewers(40), FetchBehavior::Viewers(60)],
    );
    send(&app.router, post_entity("a")).await;

    tokio::time::sleep(Duration::from_secs(65)).await;

    let (status, json) = send(
        &app.router,
        get("/api/entities/a/samples?from=2024-05-01T12:00:00Z&to=2024-05-01T12:01:00Z"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let samples = json["data"].as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["viewer_count"], 40);

    let (status, json) = send(&app.router, get("/api/entities/a/aggregates/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["average_viewers"], 50.0);
    assert_eq!(json["data"]["peak_viewers"], 60);
    assert_eq!(json["data"]["period_type"], "1min");

    let (status, _) = send(
        &app.router,
        get("/api/entities/a/aggregates/latest?period_type=1h"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_inverted_sample_range_is_bad_request() {
    let app = create_test_app(test_engine_config());
    send(&app.router, post_entity("a")).await;

    let (status, _) = send(
        &app.router,
        get("/api/entities/a/samples?from=2024-05-01T13:00:00Z&to=2024-05-01T12:00:00Z"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(start_paused = true)]
async fn test_profile_endpoint() {
    let app = create_test_app(test_engine_config());
    send(&app.router, post_entity("a")).await;

    tokio::time::sleep(Duration::from_secs(1)).await;

    let (status, json) = send(&app.router, get("/api/entities/a/profile")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["channel_id"], "UC-a");

    let (status, _) = send(&app.router, get("/api/entities/other/profile")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_without_recorder() {
    let app = create_test_app(test_engine_config());

    let (status, _) = send(&app.router, get("/metrics")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
