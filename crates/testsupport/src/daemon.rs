use anyhow::Result;
use kilog_api::AppState;
use kilog_metrics::MetricsService;
use kilog_models::Config;
use kilog_store::Store;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A Kilog server running in-process on an ephemeral port, backed by a
/// SQLite file in a temporary directory.
pub struct TestDaemon {
    pub base_url: String,
    pub state: AppState,
    pub data_dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestDaemon {
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub async fn kill(&mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverride {
    pub webhook_secret: Option<Option<String>>,
    pub cors_origins: Option<Vec<String>>,
    pub project_name: Option<String>,
}

pub async fn spawn_daemon(config_override: Option<ConfigOverride>) -> Result<TestDaemon> {
    let data_dir = tempfile::tempdir()?;

    let mut config = crate::test_config();
    config.server.bind = "127.0.0.1".to_string();
    config.server.port = 0;
    config.data.db_url = format!("sqlite://{}/kilog.db", data_dir.path().display());
    if let Some(overrides) = config_override {
        if let Some(secret) = overrides.webhook_secret {
            config.auth.clerk_webhook_secret = secret;
        }
        if let Some(origins) = overrides.cors_origins {
            config.server.cors_origins = origins;
        }
        if let Some(name) = overrides.project_name {
            config.app.project_name = name;
        }
    }

    let store = Store::connect(&config.data.db_url, config.data.max_connections).await?;
    let metrics = Arc::new(MetricsService::new()?);
    let state = AppState::new(config, store, metrics);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let (tx, rx) = oneshot::channel::<()>();
    let server_state = state.clone();
    let handle = tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        if let Err(e) = kilog_api::serve(listener, server_state, shutdown).await {
            eprintln!("test daemon exited with error: {e}");
        }
    });

    Ok(TestDaemon {
        base_url,
        state,
        data_dir,
        shutdown: Some(tx),
        handle: Some(handle),
    })
}
