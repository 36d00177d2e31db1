use std::sync::Arc;

use cashcard::{
    api::{self, AppState},
    config::{CliArgs, Config, LoggingConfig},
    metrics,
    storage::open_store,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli)?;
    init_logging(&config.logging);

    let store = open_store(&config.storage)?;
    let state = AppState::new(store).with_metrics(metrics::install_recorder()?);

    if !config.auth.enabled {
        tracing::warn!(
            principal = %config.auth.dev_principal,
            "Authentication disabled; all requests run as the dev principal"
        );
    }
    let app = api::router(state, Arc::new(config.auth.clone()));

    let addr = config.listen_addr()?;
    tracing::info!(%addr, "API listening");

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
