mod bootstrap;
mod health;
mod routes;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use concierge_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use concierge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        thread_id = "unknown",
        bind_address = %address,
        "concierge-server started"
    );

    let router = routes::router(app.state.clone()).merge(health::router(app.db_pool.clone()));

    // Drain open connections for at most the configured grace period after
    // the shutdown signal; a slow client cannot hold the process open.
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let shutdown_started = Arc::new(tokio::sync::Notify::new());
    let notify = shutdown_started.clone();
    let serve = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            notify.notify_one();
        })
        .into_future();
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => result?,
        _ = async {
            shutdown_started.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "open connections exceeded the shutdown grace period"
            );
        }
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        thread_id = "unknown",
        "concierge-server stopping"
    );

    Ok(())
}
