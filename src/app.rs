use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use monitor_api::create_app;
use monitor_config::{AppConfig, StorageBackend};
use monitor_core::traits::{MetricsFetcher, ProfileStore, SampleStore};
use monitor_engine::MonitorEngine;
use monitor_infrastructure::{
    DatabaseManager, InMemoryProfileStore, InMemorySampleStore, SqliteMetricsStore, YouTubeFetcher,
};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info, warn};

/// How long cadence tasks get to finish once shutdown starts.
const ENGINE_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// The assembled service: engine, storage and the optional HTTP API.
pub struct Application {
    config: AppConfig,
    engine: Arc<MonitorEngine>,
    database: Option<DatabaseManager>,
    metrics_handle: Option<PrometheusHandle>,
}

impl Application {
    pub async fn new(config: AppConfig, metrics_handle: Option<PrometheusHandle>) -> Result<Self> {
        let (store, profile_store, database) = create_stores(&config).await?;

        let fetcher: Arc<dyn MetricsFetcher> = Arc::new(
            YouTubeFetcher::new(&config.youtube).context("failed to create YouTube fetcher")?,
        );

        let engine = MonitorEngine::new(config.engine.clone(), fetcher, store, profile_store)
            .context("invalid engine configuration")?;

        info!(
            raw_period_seconds = config.engine.raw_period_seconds,
            rollup_period_type = %engine.rollup_period_type(),
            max_entities = config.engine.max_entities,
            "Monitor engine ready"
        );

        Ok(Self {
            config,
            engine: Arc::new(engine),
            database,
            metrics_handle,
        })
    }

    /// Registers `initial_entities`, serves the API if enabled and blocks
    /// until shutdown. The engine and database are stopped on every exit
    /// path, including an API failure.
    pub async fn run(
        &self,
        initial_entities: &[String],
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        for entity_id in initial_entities {
            if let Err(e) = self.engine.add_entity(entity_id).await {
                warn!(entity.id = %entity_id, error = %e, "Failed to add initial entity");
            }
        }

        let served = if self.config.api.enabled {
            self.run_api(shutdown_rx.resubscribe()).await
        } else {
            let _ = shutdown_rx.recv().await;
            Ok(())
        };

        self.stop().await;
        served
    }

    async fn stop(&self) {
        info!("Stopping collection");
        if !self.engine.shutdown(ENGINE_SHUTDOWN_TIMEOUT).await {
            warn!("Some cadence tasks did not stop in time");
        }
        if let Some(database) = &self.database {
            database.close().await;
        }
    }

    async fn run_api(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = &self.config.api.bind_address;
        let app = create_app(self.engine.clone(), self.metrics_handle.clone());

        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("failed to bind {bind_address}"))?;
        info!("API server listening on http://{}", bind_address);

        let result = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await;
        if let Err(e) = &result {
            error!("API server failed: {}", e);
        }
        result.context("API server failed")
    }
}

type Stores = (
    Arc<dyn SampleStore>,
    Arc<dyn ProfileStore>,
    Option<DatabaseManager>,
);

async fn create_stores(config: &AppConfig) -> Result<Stores> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            let store: Arc<dyn SampleStore> = Arc::new(InMemorySampleStore::new());
            let profile_store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
            Ok((store, profile_store, None))
        }
        StorageBackend::Sqlite => {
            info!(database_url = %config.storage.database_url, "Using SQLite storage");
            let database = DatabaseManager::new(&config.storage)
                .await
                .context("failed to open database")?;
            database
                .migrate()
                .await
                .context("failed to run database migrations")?;

            let sqlite = Arc::new(SqliteMetricsStore::new(database.pool().clone()));
            let store: Arc<dyn SampleStore> = sqlite.clone();
            let profile_store: Arc<dyn ProfileStore> = sqlite;
            Ok((store, profile_store, Some(database)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::MonitorError;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.youtube.api_key = "test-key".to_string();
        config.youtube.base_url = "http://127.0.0.1:9".to_string();
        config
    }

    #[tokio::test]
    async fn test_api_failure_still_stops_engine() {
        let mut config = offline_config();
        config.api.bind_address = "not-an-address".to_string();
        let app = Application::new(config, None).await.unwrap();

        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let result = app.run(&[], shutdown_rx).await;

        assert!(result.is_err());
        assert!(matches!(
            app.engine.add_entity("dQw4w9WgXcQ").await,
            Err(MonitorError::EngineStopped)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_engine() {
        let mut config = offline_config();
        config.api.enabled = false;
        let app = Application::new(config, None).await.unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        shutdown_tx.send(()).unwrap();
        app.run(&[], shutdown_rx).await.unwrap();

        assert_eq!(app.engine.entity_count().await, 0);
        assert!(matches!(
            app.engine.add_entity("dQw4w9WgXcQ").await,
            Err(MonitorError::EngineStopped)
        ));
    }
}
