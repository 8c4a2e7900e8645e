use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kilog_api::AppState;
use kilog_metrics::{MetricsService, TracingService};
use kilog_models::Config;
use kilog_store::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATHS: &[&str] = &["configs/default.toml", "config/config.toml"];

#[derive(Parser)]
#[command(name = "kilog-server")]
#[command(about = "Kilog strength training log API")]
struct Cli {
    /// TOML config file, layered under the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Create the database and apply migrations, then exit
    Migrate,
    /// Mint a bearer token for local development
    Token {
        /// Identity-provider user id to put in `sub`
        #[arg(long)]
        auth_id: String,
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
    /// Print the effective configuration with secrets redacted
    PrintConfig,
}

fn config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_path(cli.config);
    let config = Config::load(path.as_deref()).context("failed to load configuration")?;

    TracingService::init(config.is_production())
        .map_err(|e| anyhow::anyhow!("failed to initialise tracing: {e}"))?;
    match &path {
        Some(p) => info!("Configuration loaded from {}", p.display()),
        None => info!("No config file found, using defaults and environment"),
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate => {
            Store::connect(&config.data.db_url, 1).await?;
            info!("Database at {} is up to date", config.data.db_url);
            Ok(())
        }
        Commands::Token { auth_id, ttl_hours } => {
            let token = kilog_api::mint_token(
                &config.auth.jwt_key,
                &auth_id,
                chrono::Duration::hours(ttl_hours),
            )?;
            println!("{token}");
            Ok(())
        }
        Commands::PrintConfig => {
            let mut redacted = config;
            redacted.auth.jwt_key = "<redacted>".to_string();
            if redacted.auth.clerk_webhook_secret.is_some() {
                redacted.auth.clerk_webhook_secret = Some("whsec_<redacted>".to_string());
            }
            print!("{}", toml::to_string_pretty(&redacted)?);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!(
        "Starting {} ({} environment)",
        config.app.project_name, config.app.environment
    );

    let store = Store::connect(&config.data.db_url, config.data.max_connections).await?;
    info!("Database connected");

    let metrics = Arc::new(MetricsService::new()?);
    let state = AppState::new(config, store, metrics);

    kilog_api::start_server(state, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    info!("Kilog server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}
