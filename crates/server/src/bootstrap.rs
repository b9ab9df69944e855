use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use concierge_agent::{
    ChannelProgressSink, HttpLlmClient, LlmClient, LlmError, ProgressUpdate, Supervisor,
};
use concierge_core::config::AppConfig;
use concierge_db::{connect_with_settings, migrations, DbPool, SqlStateRepository, StateRepository};

use crate::routes::AppState;

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] LlmError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        thread_id = "unknown",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        thread_id = "unknown",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        thread_id = "unknown",
        "database migrations applied"
    );

    let llm: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::new(config.llm.clone()).map_err(BootstrapError::Llm)?);

    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    spawn_progress_logger(progress_rx);

    let supervisor =
        Arc::new(Supervisor::new(llm, Arc::new(ChannelProgressSink::new(progress_tx))));
    let repository: Arc<dyn StateRepository> =
        Arc::new(SqlStateRepository::new(db_pool.clone()));

    Ok(Application { config, db_pool, state: AppState { supervisor, repository } })
}

/// Drains the workflow progress channel into the log stream so the bounded
/// channel never backs up.
fn spawn_progress_logger(mut rx: mpsc::Receiver<ProgressUpdate>) {
    tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            info!(
                event_name = "workflow.progress",
                thread_id = %update.thread_id,
                step_id = %update.step_id,
                status = ?update.status,
                progress = update.progress,
                "workflow step changed"
            );
        }
    });
}
