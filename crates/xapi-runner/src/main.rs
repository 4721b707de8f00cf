//! # xapi-runner
//!
//! Account snapshot tool for the xAPI trading client.
//!
//! Loads a JSON configuration file, logs in over the trading WebSocket,
//! prints server version, margin level, and open positions, then logs out.
//!
//! # Usage
//!
//! ```bash
//! xapi-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use xapi_client::Client;

/// xAPI trading client — account snapshot runner.
#[derive(Parser)]
#[command(name = "xapi-runner", about = "xAPI trading client account snapshot runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    xapi_core::logging::init_logging(&cli.log_level, cli.log_dir.as_deref(), "xapi-runner");

    let config = xapi_core::config::load_config(&cli.config)?;
    info!("config loaded — endpoint {}", config.url);

    let user_id = config
        .user_id
        .clone()
        .context("config is missing `user_id`")?;
    let password = config
        .password
        .clone()
        .context("config is missing `password`")?;

    let client = Client::connect(&config);
    let session_id = client.login(&user_id, &password).await?;
    info!(%user_id, %session_id, "logged in");

    let version = client.get_version().await?;
    info!("server API version: {version}");

    let margin = client.get_margin_level().await?;
    info!("margin level: {margin}");

    let trades = client.update_trades().await?;
    info!("{} open position(s)", trades.len());
    for trade in &trades {
        info!(
            "  order {} {} cmd={:?} volume={} open={} close={} profit={}",
            trade.order_id,
            trade.symbol,
            trade.cmd,
            trade.volume,
            trade.open_price,
            trade.close_price,
            trade.profit,
        );
    }

    client.logout().await?;
    info!("logged out");
    Ok(())
}
