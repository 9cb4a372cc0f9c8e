use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_EASTMONEY_BASE_URL: &str = "https://fundcomapi.tiantianfunds.com";
pub const DEFAULT_DIRECTORY_BASE_URL: &str = "https://fundcomapi.tiantianfunds.com";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EastmoneyProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DirectoryProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub eastmoney: Option<EastmoneyProviderConfig>,
    pub directory: Option<DirectoryProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            eastmoney: Some(EastmoneyProviderConfig {
                base_url: DEFAULT_EASTMONEY_BASE_URL.to_string(),
            }),
            directory: Some(DirectoryProviderConfig {
                base_url: DEFAULT_DIRECTORY_BASE_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Overrides the platform cache directory when set.
    pub cache_dir: Option<String>,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,
    /// Maximum number of funds whose NAV series stay cached on disk.
    #[serde(default = "default_max_fund_cache")]
    pub max_fund_cache: usize,
    /// Substring of the fund type label that marks a money market fund.
    /// Configuration rather than a constant: upstream labels drift.
    #[serde(default = "default_money_market_marker")]
    pub money_market_marker: String,
    /// Notional investment amount used for P&L when the CLI gets none.
    #[serde(default = "default_investment_amount")]
    pub investment_amount: f64,
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_max_fund_cache() -> usize {
    100
}

fn default_money_market_marker() -> String {
    "货币型".to_string()
}

fn default_investment_amount() -> f64 {
    100_000.0
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            cache_dir: None,
            cache_ttl_hours: default_cache_ttl_hours(),
            max_fund_cache: default_max_fund_cache(),
            money_market_marker: default_money_market_marker(),
            investment_amount: default_investment_amount(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fundnav", "fundnav")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.cache_dir {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "fundnav", "fundnav")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("cache"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
