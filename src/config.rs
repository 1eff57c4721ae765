/// Client configuration from environment variables
///
/// Controls the Stacks network, API endpoint, contract identity and polling
/// cadence. Defaults to devnet for local development.

use std::env;
use std::time::Duration;

use crate::devnet;
use crate::error::{CounterError, Result};
use crate::network::NetworkType;

pub const DEFAULT_CONTRACT_NAME: &str = "counter";
pub const DEFAULT_COUNTER_REFRESH: Duration = Duration::from_secs(10);
pub const DEFAULT_TX_STATUS_POLL: Duration = Duration::from_secs(3);
pub const DEFAULT_BLOCK_REFRESH: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_RETRIES: u32 = 3;
/// First retry delay; doubles per attempt
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
/// Flat fee in micro-STX for devnet-signed calls
pub const DEFAULT_TX_FEE: u64 = 3_000;

/// The deployed counter contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractId {
    pub address: String,
    pub name: String,
}

impl ContractId {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub network: NetworkType,
    /// Stacks API base URL
    pub api_url: String,
    /// Optional API key, sent as `x-api-key`
    pub api_key: Option<String>,
    pub contract: ContractId,
    pub counter_refresh: Duration,
    pub tx_status_poll: Duration,
    pub block_refresh: Duration,
    /// Retries after the first failed counter fetch
    pub read_retries: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub tx_fee: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables (and `.env` if present)
    ///
    /// Environment variables:
    /// - `STACKS_NETWORK`: "devnet" (default), "testnet" or "mainnet"
    /// - `STACKS_API_URL`: API endpoint (optional, per-network default)
    /// - `STACKS_API_KEY`: API key header (optional)
    /// - `CONTRACT_DEPLOYER_TESTNET_ADDRESS` / `CONTRACT_DEPLOYER_MAINNET_ADDRESS`
    /// - `COUNTER_CONTRACT_NAME`: defaults to "counter"
    /// - `COUNTER_REFRESH_MS`, `TX_STATUS_POLL_MS`, `BLOCK_REFRESH_MS`,
    ///   `READ_RETRIES`, `READ_RETRY_DELAY_MS`, `CONNECT_TIMEOUT_MS`, `TX_FEE`
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Local devnet (default)
    /// cargo run -p counter-cli -- watch
    ///
    /// # Testnet
    /// STACKS_NETWORK=testnet CONTRACT_DEPLOYER_TESTNET_ADDRESS=ST... cargo run -p counter-cli -- watch
    /// ```
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match lookup("STACKS_NETWORK") {
            Some(value) if !value.trim().is_empty() => value.parse::<NetworkType>()?,
            _ => NetworkType::Devnet,
        };
        match network {
            NetworkType::Devnet => log::info!("🔧 Using DEVNET network"),
            NetworkType::Testnet => log::info!("🧪 Using TESTNET network"),
            NetworkType::Mainnet => log::info!("🌐 Using MAINNET network"),
        }

        let api_url = lookup("STACKS_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| network.default_api_url().to_string());
        let api_url = api_url.trim_end_matches('/').to_string();
        log::info!("📡 Stacks API URL: {}", api_url);

        let api_key = lookup("STACKS_API_KEY").filter(|k| !k.is_empty());

        let deployer_address = match network {
            NetworkType::Devnet => devnet::deployer()?.stx_address,
            NetworkType::Testnet => lookup("CONTRACT_DEPLOYER_TESTNET_ADDRESS").ok_or_else(|| {
                CounterError::Config("CONTRACT_DEPLOYER_TESTNET_ADDRESS not set".to_string())
            })?,
            NetworkType::Mainnet => lookup("CONTRACT_DEPLOYER_MAINNET_ADDRESS").ok_or_else(|| {
                CounterError::Config("CONTRACT_DEPLOYER_MAINNET_ADDRESS not set".to_string())
            })?,
        };
        let contract_name =
            lookup("COUNTER_CONTRACT_NAME").unwrap_or_else(|| DEFAULT_CONTRACT_NAME.to_string());
        let contract = ContractId::new(deployer_address, contract_name);
        log::info!("📜 Counter contract: {}", contract);

        Ok(Self {
            network,
            api_url,
            api_key,
            contract,
            counter_refresh: duration_ms(&lookup, "COUNTER_REFRESH_MS", DEFAULT_COUNTER_REFRESH)?,
            tx_status_poll: duration_ms(&lookup, "TX_STATUS_POLL_MS", DEFAULT_TX_STATUS_POLL)?,
            block_refresh: duration_ms(&lookup, "BLOCK_REFRESH_MS", DEFAULT_BLOCK_REFRESH)?,
            read_retries: number(&lookup, "READ_RETRIES", DEFAULT_READ_RETRIES)?,
            retry_delay: duration_ms(&lookup, "READ_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY)?,
            connect_timeout: duration_ms(&lookup, "CONNECT_TIMEOUT_MS", DEFAULT_CONNECT_TIMEOUT)?,
            tx_fee: number(&lookup, "TX_FEE", DEFAULT_TX_FEE)?,
        })
    }

    /// Devnet configuration pointed at `api_url`
    pub fn devnet(api_url: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into();
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            contract: ContractId::new(devnet::deployer()?.stx_address, DEFAULT_CONTRACT_NAME),
            ..Self::default()
        })
    }
}

impl Default for ClientConfig {
    /// Default configuration (local devnet)
    fn default() -> Self {
        let deployer = devnet::deployer()
            .map(|a| a.stx_address)
            .unwrap_or_default();
        Self {
            network: NetworkType::Devnet,
            api_url: NetworkType::Devnet.default_api_url().to_string(),
            api_key: None,
            contract: ContractId::new(deployer, DEFAULT_CONTRACT_NAME),
            counter_refresh: DEFAULT_COUNTER_REFRESH,
            tx_status_poll: DEFAULT_TX_STATUS_POLL,
            block_refresh: DEFAULT_BLOCK_REFRESH,
            read_retries: DEFAULT_READ_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tx_fee: DEFAULT_TX_FEE,
        }
    }
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CounterError::Config(format!("invalid {}: '{}'", key, raw))),
        None => Ok(default),
    }
}

fn duration_ms<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = default.as_millis() as u64;
    number(lookup, key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_is_devnet() {
        let config = ClientConfig::default();
        assert_eq!(config.network, NetworkType::Devnet);
        assert_eq!(config.api_url, "http://localhost:3999");
        assert_eq!(config.contract.name, "counter");
        assert_eq!(config.counter_refresh, Duration::from_secs(10));
        assert_eq!(config.tx_status_poll, Duration::from_secs(3));
        assert_eq!(config.read_retries, 3);
    }

    #[test]
    fn test_devnet_contract_is_deployed_by_deployer() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.contract.address, devnet::deployer().unwrap().stx_address);
    }

    #[test]
    fn test_testnet_requires_deployer_address() {
        let result = ClientConfig::from_lookup(lookup_from(&[("STACKS_NETWORK", "testnet")]));
        assert!(matches!(result, Err(CounterError::Config(_))));
    }

    #[test]
    fn test_testnet_configuration() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("STACKS_NETWORK", "testnet"),
            ("CONTRACT_DEPLOYER_TESTNET_ADDRESS", "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"),
            ("STACKS_API_KEY", "secret"),
            ("TX_STATUS_POLL_MS", "500"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://api.testnet.hiro.so");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.tx_status_poll, Duration::from_millis(500));
    }

    #[test]
    fn test_api_url_override_strips_trailing_slash() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("STACKS_API_URL", "http://127.0.0.1:4000/")]))
                .unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:4000");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[("READ_RETRIES", "many")]));
        assert!(matches!(result, Err(CounterError::Config(_))));
    }
}
