//! Prediction market agent CLI
//!
//! Exposes the action surface from the command line: list actions, invoke
//! one with JSON arguments, or use the read shortcuts.

use clap::{Parser, Subcommand};
use rekt_market_agent::config::{AGENT_PRIVATE_KEY_ENV, MARKET_DATA_API_KEY_ENV};
use rekt_market_agent::tools::{ACTION_MARKET_DATA, ACTION_READ_MARKET};
use rekt_market_agent::wallet::SecureWallet;
use rekt_market_agent::{AgentRunner, Config, Result, RpcConfig};
use secrecy::SecretString;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rekt-agent")]
#[command(about = "Prediction market actions for an LLM agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List available actions with their argument schemas
    Actions,

    /// Invoke an action with JSON arguments
    Invoke {
        /// Action name, e.g. readMarketsContract
        action: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Read a market
    Market {
        /// Market id
        id: String,
    },

    /// Fetch exchange candles with summary metrics
    Klines {
        /// Trading pair, e.g. BTCUSDT
        #[arg(short, long)]
        symbol: String,

        /// Candle interval
        #[arg(short, long, default_value = "1d")]
        interval: String,

        /// Number of candles
        #[arg(short, long, default_value_t = 24)]
        limit: u32,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(cli.json_logs.then(|| fmt::layer().json()))
        .with((!cli.json_logs).then(fmt::layer))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_network_env()?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Actions => {
            let registry = build_runner(config).build_registry()?;
            println!("{}", serde_json::to_string_pretty(&registry.list())?);
        }
        Commands::Invoke { action, args } => {
            let registry = build_runner(config).build_registry()?;
            println!("{}", registry.invoke_json(&action, &args).await);
        }
        Commands::Market { id } => {
            let registry = build_runner(config).build_registry()?;
            let args = json!({ "marketId": id }).to_string();
            println!("{}", registry.invoke_json(ACTION_READ_MARKET, &args).await);
        }
        Commands::Klines {
            symbol,
            interval,
            limit,
        } => {
            let registry = build_runner(config).build_registry()?;
            let args = json!({ "symbol": symbol, "interval": interval, "limit": limit }).to_string();
            println!("{}", registry.invoke_json(ACTION_MARKET_DATA, &args).await);
        }
    }

    Ok(())
}

fn build_runner(config: Config) -> AgentRunner {
    tracing::info!(network = %config.network, "Starting prediction market agent");

    let mut runner = AgentRunner::new(config, RpcConfig::from_env());

    // Try to load wallet from environment if available
    match SecureWallet::from_env(AGENT_PRIVATE_KEY_ENV) {
        Ok(wallet) => {
            tracing::info!(address = %wallet.address(), "Loaded wallet from {}", AGENT_PRIVATE_KEY_ENV);
            runner = runner.with_wallet(wallet);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Running in read-only mode");
        }
    }

    if let Ok(key) = std::env::var(MARKET_DATA_API_KEY_ENV) {
        runner = runner.with_exchange_api_key(SecretString::from(key));
    }

    runner
}
