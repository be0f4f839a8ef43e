//! Test helper utilities and common testing patterns

use monitor_config::EngineConfig;
use std::time::Duration;
use tokio::time::sleep;

/// Engine settings for tests: default periods, fast backoff and no jitter so
/// that retries inside a tick are deterministic.
pub fn test_engine_config() -> EngineConfig {
    EngineConfig {
        backoff_base_ms: 100,
        backoff_cap_ms: 400,
        backoff_jitter: 0.0,
        fetch_timeout_seconds: 5,
        ..EngineConfig::default()
    }
}

/// Test environment setup utilities
pub struct TestEnv;

impl TestEnv {
    /// Poll `condition` every `poll_interval` until it holds or `timeout` elapses.
    ///
    /// Uses tokio time, so under a paused runtime the wait advances the clock.
    pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration, poll_interval: Duration) -> bool
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if condition().await {
                return true;
            }
            sleep(poll_interval).await;
        }

        condition().await
    }
}
