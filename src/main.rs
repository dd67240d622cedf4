use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use predictions_site::backend::HttpBackend;
use predictions_site::config::{AppConfig, DEFAULT_CONFIG_PATH};
use predictions_site::context::SiteContext;
use predictions_site::db::store::Store;
use predictions_site::monitoring::health::HealthState;
use predictions_site::monitoring::logger;
use predictions_site::server;

#[derive(Debug, Parser)]
#[command(name = "predictions-site", about = "Sports predictions site server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override `server.port` from the config file.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut config, secrets) = AppConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logger::init_logging(&config.monitoring)?;

    tracing::info!(
        addr = %config.server.addr(),
        backend = %config.backend.base_url,
        api_key = secrets.backend_api_key.is_some(),
        "Predictions site starting"
    );

    ensure_parent_dir(Path::new(&config.database.path))?;
    let store = Store::new(&config.database.path).await?;
    let backend = HttpBackend::new(&config.backend, secrets.backend_api_key)
        .context("Failed to build backend client")?;

    let ctx = Arc::new(
        SiteContext::init(&config.cache, store, Arc::new(backend), HealthState::new()).await?,
    );

    let app = server::router(ctx.clone(), &config.server);
    let served = server::serve(app, &config.server).await;

    if let Err(e) = ctx.shutdown().await {
        tracing::warn!(error = %e, "Site context shutdown incomplete");
    }

    served
}

/// SQLite creates the file but not its directory.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display())),
        _ => Ok(()),
    }
}
