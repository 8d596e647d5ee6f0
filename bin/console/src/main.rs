use rootcause::prelude::Report;
use std::sync::Arc;
use storefront_client::ReqwestBackend;
use storefront_console::{config::ConsoleConfig, error::ConsoleError, run::run};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<ConsoleError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration from environment
    let config = ConsoleConfig::from_env().map_err(|e| ConsoleError::Config {
        details: e.to_string(),
    })?;
    tracing::info!(base_url = %config.client.base_url(), "Loaded configuration");

    let backend = ReqwestBackend::new(&config.client).map_err(|e| ConsoleError::Transport {
        details: e.to_string(),
    })?;
    let summary = run(&config, Arc::new(backend)).await?;
    tracing::info!(restored = summary.restored, "Session check complete");

    let profile =
        serde_json::to_string_pretty(&summary.user).map_err(|e| ConsoleError::Output {
            details: e.to_string(),
        })?;
    println!("{profile}");

    Ok(())
}
