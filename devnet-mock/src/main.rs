/// Devnet Mock Server
///
/// Stands in for a local Stacks devnet on port 3999. Blocks are mined on a
/// timer (`BLOCK_TIME_MS`) or on demand through `POST /devnet/mine`.

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use std::time::Duration;

use devnet_mock::{run_server, DevnetNode};

#[derive(Debug)]
struct Config {
    server_host: String,
    server_port: u16,
    /// None mines only on request
    block_time: Option<Duration>,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3999".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        let block_time_ms: u64 = env::var("BLOCK_TIME_MS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .context("Invalid BLOCK_TIME_MS")?;

        Ok(Self {
            server_host,
            server_port,
            block_time: (block_time_ms > 0).then(|| Duration::from_millis(block_time_ms)),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting devnet mock...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let node = Arc::new(DevnetNode::new());
    for account in stacks_counter::devnet_wallets() {
        log::info!("👛 {:<9} {}", account.label, account.stx_address);
    }

    run_server(node, config.server_host, config.server_port, config.block_time)
        .await
        .context("Server error")?;

    Ok(())
}
