//! Satchel - offline-resilient request cache and sync engine
//!
//! Standalone host: loads configuration, boots the engine, and serves
//! until interrupted.

use satchel_domain::Result;
use satchel_lib::AppContext;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = satchel_infra::config::load()?;
    let context = AppContext::new(config).await?;

    context.engine.initialize().await?;
    context.engine.take_ownership().await?;
    info!("satchel engine running; press Ctrl-C to stop");

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    context.shutdown().await?;

    Ok(())
}
