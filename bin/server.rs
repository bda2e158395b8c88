// Cross-Check - Web Server
// Upload two files, cross-check them, download the partitions once.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use cross_check::server::{router, spawn_sweeper, AppState};
use cross_check::ServerConfig;

#[derive(Parser)]
#[command(name = "cross-check-server", version, about = "Cross-check web server")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "CROSS_CHECK_BIND", default_value = "0.0.0.0:3000")]
    bind: String,

    /// Maximum size of each uploaded file, in megabytes
    #[arg(long, env = "CROSS_CHECK_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: usize,

    /// How long generated downloads are kept, in seconds
    #[arg(long, env = "CROSS_CHECK_RETENTION_SECS", default_value_t = 300)]
    retention_secs: u64,

    /// Number of missing records returned inline
    #[arg(long, env = "CROSS_CHECK_PREVIEW", default_value_t = 10)]
    preview: usize,

    /// Directory served under /static
    #[arg(long, env = "CROSS_CHECK_WEB_DIR", default_value = "web")]
    web_dir: PathBuf,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            bind_addr: args.bind,
            max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
            retention: Duration::from_secs(args.retention_secs),
            preview_limit: args.preview,
            web_dir: args.web_dir,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config: ServerConfig = Args::parse().into();
    let state = AppState::new(config.clone());

    spawn_sweeper(state.store.clone(), config.sweep_interval);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        max_upload_bytes = config.max_upload_bytes,
        retention_secs = config.retention.as_secs(),
        "cross-check server listening"
    );

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
