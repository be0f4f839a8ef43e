//! Exercises the YouTube fetcher against a local axum server that serves
//! canned Data API responses.

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use monitor_config::YouTubeConfig;
use monitor_core::traits::MetricsFetcher;
use monitor_infrastructure::YouTubeFetcher;
use serde_json::json;
use std::collections::HashMap;

const LIVE: &str = "liveVideo01";
const ENDED: &str = "endedVideo1";
const MISSING: &str = "missingVid1";
const THROTTLED: &str = "throttled01";

async fn videos(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
    let id = params.get("id").cloned().unwrap_or_default();
    match id.as_str() {
        LIVE => Json(json!({
            "items": [{
                "id": LIVE,
                "snippet": {"channelId": "UC-live", "title": "live show"},
                "statistics": {"viewCount": "9000", "likeCount": "150", "commentCount": "30"},
                "liveStreamingDetails": {"concurrentViewers": "1234", "activeLiveChatId": "chat-live"}
            }]
        }))
        .into_response(),
        ENDED => Json(json!({
            "items": [{
                "id": ENDED,
                "snippet": {"channelId": "UC-live"},
                "liveStreamingDetails": {"actualEndTime": "2024-05-01T14:00:00Z"}
            }]
        }))
        .into_response(),
        THROTTLED => (StatusCode::TOO_MANY_REQUESTS, "rateLimitExceeded").into_response(),
        _ => Json(json!({"items": []})).into_response(),
    }
}

async fn channels(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    match params.get("id").map(String::as_str) {
        Some("UC-live") => Json(json!({
            "items": [{
                "id": "UC-live",
                "snippet": {"title": "Live Channel", "description": "streams"},
                "statistics": {"subscriberCount": "4321", "viewCount": "100000", "videoCount": "77"}
            }]
        }))
        .into_response(),
        _ => Json(json!({"items": []})).into_response(),
    }
}

async fn chat(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    assert_eq!(params.get("liveChatId").map(String::as_str), Some("chat-live"));
    Json(json!({"pageInfo": {"totalResults": 58}, "items": [{}]}))
}

async fn start_fake_api() -> String {
    let app = Router::new()
        .route("/videos", get(videos))
        .route("/channels", get(channels))
        .route("/liveChat/messages", get(chat));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn fetcher() -> YouTubeFetcher {
    let config = YouTubeConfig {
        api_key: "test-key".to_string(),
        base_url: start_fake_api().await,
        request_timeout_seconds: 5,
    };
    YouTubeFetcher::new(&config).unwrap()
}

#[tokio::test]
async fn test_fetch_live_snapshot() {
    let fetcher = fetcher().await;
    let snapshot = fetcher.fetch_live(LIVE).await.unwrap();
    assert_eq!(snapshot.viewer_count, 1234);
    assert_eq!(snapshot.like_count, 150);
    assert_eq!(snapshot.comment_count, 30);
    assert_eq!(snapshot.chat_message_count, 58);
    assert_eq!(snapshot.subscriber_count, 4321);
}

#[tokio::test]
async fn test_fetch_profile() {
    let fetcher = fetcher().await;
    let profile = fetcher.fetch_profile(LIVE).await.unwrap();
    assert_eq!(profile.entity_id, LIVE);
    assert_eq!(profile.channel_id, "UC-live");
    assert_eq!(profile.channel_name, "Live Channel");
    assert_eq!(profile.video_count, 77);
}

#[tokio::test]
async fn test_ended_and_missing_videos_are_permanent() {
    let fetcher = fetcher().await;
    assert!(fetcher.fetch_live(ENDED).await.unwrap_err().is_permanent());
    assert!(fetcher.fetch_live(MISSING).await.unwrap_err().is_permanent());
    assert!(fetcher.fetch_profile(MISSING).await.unwrap_err().is_permanent());
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let fetcher = fetcher().await;
    let err = fetcher.fetch_live(THROTTLED).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_upstream_is_transient() {
    let config = YouTubeConfig {
        api_key: "test-key".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_seconds: 2,
    };
    let fetcher = YouTubeFetcher::new(&config).unwrap();
    assert!(fetcher.fetch_live(LIVE).await.unwrap_err().is_retryable());
}
