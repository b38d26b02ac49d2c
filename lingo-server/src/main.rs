//! lingo-server - language practice service
//!
//! Serves phrases, AI-generated word explanations with coverage validation,
//! answer verification, grammar notes and text-to-speech over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lingo_common::config::{
    database_path, load_toml_config, resolve_openai_api_key, resolve_root_folder,
};
use lingo_common::db::init_database;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lingo_server::services::OpenAiClient;
use lingo_server::{build_router, AppState};

/// Command-line arguments for lingo-server
#[derive(Parser, Debug)]
#[command(name = "lingo-server")]
#[command(about = "Language practice service with AI word explanations")]
#[command(version)]
struct Args {
    /// Path to lingo.toml (default: <config dir>/lingo/lingo.toml)
    #[arg(short, long, env = "LINGO_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "LINGO_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides [server] host)
    #[arg(long, env = "LINGO_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_toml_config(args.config.as_deref());

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting lingo-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &config);
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;

    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let api_key = resolve_openai_api_key(&config)?;
    let tutor = OpenAiClient::new(api_key, &config.openai).context("Failed to build OpenAI client")?;
    info!("OpenAI model: {}", tutor.model());

    let filter = config.important_word_filter();
    info!(
        languages = ?filter.languages(),
        min_word_length = filter.min_word_length(),
        max_validation_passes = config.coverage.max_validation_passes,
        "Coverage rules loaded"
    );

    let state = AppState::new(db_pool, Arc::new(tutor), filter, config.coverage.clone());
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
