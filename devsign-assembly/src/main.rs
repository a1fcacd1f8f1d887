//! devsign-assembly - Assembly submission service
//!
//! Serves the submission window schedule, member submissions with their
//! artifacts, admin progress views and batch export over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use devsign_assembly::services::ArtifactStore;
use devsign_assembly::{build_router, AppState};
use devsign_common::config::{self, CliOverrides, ServiceConfig};
use devsign_common::db::init_database;
use devsign_common::SystemClock;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for devsign-assembly
#[derive(Parser, Debug)]
#[command(name = "devsign-assembly")]
#[command(about = "Assembly submission and compliance tracking service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "DEVSIGN_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database and uploads
    #[arg(short, long, env = "DEVSIGN_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "DEVSIGN_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DEVSIGN_PORT")]
    port: Option<u16>,

    /// Largest accepted file per upload slot, in bytes
    #[arg(long, env = "DEVSIGN_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Log filter, e.g. "debug" or "devsign_assembly=trace"
    #[arg(long, env = "DEVSIGN_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let (toml_config, config_source) = config::load_toml_config(config_path.as_deref())
        .context("Failed to load configuration")?;

    let config = ServiceConfig::resolve(
        CliOverrides {
            root_folder: args.root_folder,
            bind_address: args.bind_address,
            port: args.port,
            max_upload_bytes: args.max_upload_bytes,
            log_level: args.log_level,
        },
        toml_config,
    );

    // RUST_LOG wins over the configured level
    let default_filter = config
        .log_level
        .clone()
        .unwrap_or_else(|| "devsign_assembly=info,devsign_common=info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting devsign-assembly v{}",
        env!("CARGO_PKG_VERSION")
    );
    config_source.log();
    info!("Root folder: {}", config.root_folder.display());

    config
        .ensure_directories()
        .context("Failed to create root folder")?;

    let db_path = config.database_path();
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let artifacts = ArtifactStore::new(config.upload_dir(), pool.clone());
    info!("Upload folder: {}", artifacts.base_dir().display());

    let state = AppState::new(
        pool,
        artifacts,
        Arc::new(SystemClock),
        config.uploads.clone(),
        config.max_upload_bytes,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind((config.bind_address.as_str(), config.port))
        .await
        .with_context(|| {
            format!("Failed to bind to {}:{}", config.bind_address, config.port)
        })?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
