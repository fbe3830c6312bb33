use std::sync::Arc;

use anyhow::Result;
use ccgw_core::AppState;
use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let mut patch = cli::patch_from_env();
    patch.overlay(cli.into_patch());
    let config = patch.into_config()?;

    let filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let bind = format!("{}:{}", config.host, config.port);
    let debug = config.debug;
    let state = Arc::new(AppState::bootstrap(config)?);

    let warm_up_state = state.clone();
    tokio::spawn(async move { warm_up_state.pool.warm_up().await });

    let app = ccgw_core::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind, debug, "ccgw listening");
    axum::serve(listener, app).await?;
    Ok(())
}
