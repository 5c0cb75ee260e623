use std::sync::Arc;

use anyhow::{Context, Result};
use stanpal_backend::config::BotConfig;
use stanpal_backend::database::MemoryStore;
use stanpal_backend::llm_client::{gateway_from_config, Generate};
use stanpal_backend::server::serve;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stanpal_backend=debug")),
        )
        .init();

    let config = BotConfig::load();

    let store = Arc::new(
        MemoryStore::new(&config.database_path)
            .with_context(|| format!("failed to open memory store at {}", config.database_path))?,
    );
    let llm: Arc<dyn Generate> = Arc::from(gateway_from_config(&config));

    tracing::info!(
        "Starting Stan Pal backend (provider '{}', database '{}')",
        config.llm_provider,
        config.database_path
    );

    let server_rt = tokio::runtime::Runtime::new().context("failed to start server runtime")?;
    server_rt.block_on(serve(config, store, llm))
}
