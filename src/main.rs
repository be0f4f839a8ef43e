use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use monitor_config::AppConfig;
use monitor_infrastructure::observability::init_metrics;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod shutdown;

use app::Application;
use shutdown::ShutdownManager;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("stream-monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live broadcast metrics collection and aggregation service")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level, overridden by RUST_LOG")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log format")
                .value_parser(["json", "pretty"]),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .value_name("ID")
                .help("Entity to monitor from startup, may be repeated")
                .action(ArgAction::Append),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let config = AppConfig::load(config_path).context("failed to load configuration")?;

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.observability.log_level.clone());
    let log_format = matches
        .get_one::<String>("log-format")
        .cloned()
        .unwrap_or_else(|| config.observability.log_format.to_string());
    init_logging(&log_level, &log_format)?;

    let initial_entities: Vec<String> = matches
        .get_many::<String>("watch")
        .map(|ids| ids.cloned().collect())
        .unwrap_or_default();

    info!(config = ?config_path, "Starting stream monitor");

    let metrics_handle = if config.observability.metrics_enabled {
        Some(init_metrics()?)
    } else {
        None
    };

    let app = Arc::new(Application::new(config, metrics_handle).await?);
    let shutdown_manager = ShutdownManager::new();

    let mut app_handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown_manager.subscribe();
        tokio::spawn(async move { app.run(&initial_entities, shutdown_rx).await })
    };

    let finished = tokio::select! {
        joined = &mut app_handle => Some(joined),
        _ = wait_for_shutdown_signal() => None,
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            info!("Shutdown signal received, stopping gracefully");
            shutdown_manager.shutdown();
            match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Graceful shutdown timed out, exiting");
                    return Ok(());
                }
            }
        }
    };

    match joined {
        Ok(Ok(())) => {
            info!("Stream monitor stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("Application failed: {e:#}");
            Err(e)
        }
        Err(e) => {
            error!("Application task failed: {e}");
            Err(e.into())
        }
    }
}

fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .context("failed to initialise JSON logging")?,
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
            .context("failed to initialise pretty logging")?,
        _ => return Err(anyhow::anyhow!("unsupported log format: {log_format}")),
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
