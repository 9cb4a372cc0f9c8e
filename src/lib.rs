pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Report {
        fund_codes: Vec<String>,
        amount: Option<f64>,
    },
    ClearCache,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Report { fund_codes, amount } => {
            cli::report::run(&config, &fund_codes, amount).await
        }
        AppCommand::ClearCache => clear_cache(&config).await,
    }
}

async fn clear_cache(config: &AppConfig) -> Result<()> {
    use crate::core::cache::Cache;

    let cache = store::FileCache::new(config.cache_dir()?, Some(config.cache_ttl()))?;
    cache.clear().await;
    info!("Cache cleared");
    Ok(())
}
