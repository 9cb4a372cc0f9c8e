use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundnav::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display NAV performance report for one or more funds
    Report {
        /// Fund codes to report on
        #[arg(required = true)]
        fund_codes: Vec<String>,

        /// Notional investment amount used for P&L figures
        #[arg(short, long)]
        amount: Option<f64>,
    },
    /// Remove all cached fund data
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(Commands::Report { fund_codes, amount }) => {
            fundnav::run_command(
                fundnav::AppCommand::Report { fund_codes, amount },
                cli.config_path.as_deref(),
            )
            .await
        }
        Some(Commands::ClearCache) => {
            fundnav::run_command(fundnav::AppCommand::ClearCache, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = fundnav::core::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
# Fund data is cached on disk and refreshed once per calendar day.
cache_ttl_hours: 24
max_fund_cache: 100

# Substring of the fund type label that marks a money market fund.
money_market_marker: "货币型"

# Notional investment amount used for P&L figures.
investment_amount: 100000

providers:
  eastmoney:
    base_url: "https://fundcomapi.tiantianfunds.com"
  directory:
    base_url: "https://fundcomapi.tiantianfunds.com"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
