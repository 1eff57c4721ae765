//! Stacks network selection
//!
//! The network is picked once at startup and never changes for the lifetime
//! of a session. Everything network-dependent (API URL, chain id, address
//! version) hangs off [`NetworkType`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CounterError;

/// Local devnet API started by Clarinet (or the devnet mock)
pub const DEVNET_STACKS_API_URL: &str = "http://localhost:3999";
pub const STACKS_API_TESTNET_URL: &str = "https://api.testnet.hiro.so";
pub const STACKS_API_MAINNET_URL: &str = "https://api.mainnet.hiro.so";

pub const CHAIN_ID_MAINNET: u32 = 0x0000_0001;
pub const CHAIN_ID_TESTNET: u32 = 0x8000_0000;

/// Single-sig address versions (`SP...` / `ST...`)
pub const ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22;
pub const ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
}

/// Badge style for the network indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeVariant {
    Default,
    Secondary,
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: NetworkType,
    pub label: &'static str,
    pub variant: BadgeVariant,
}

impl NetworkType {
    pub fn config(self) -> NetworkConfig {
        match self {
            Self::Devnet => NetworkConfig {
                name: self,
                label: "Devnet",
                variant: BadgeVariant::Outline,
            },
            Self::Testnet => NetworkConfig {
                name: self,
                label: "Testnet",
                variant: BadgeVariant::Secondary,
            },
            Self::Mainnet => NetworkConfig {
                name: self,
                label: "Mainnet",
                variant: BadgeVariant::Default,
            },
        }
    }

    pub fn label(self) -> &'static str {
        self.config().label
    }

    pub fn is_devnet(self) -> bool {
        matches!(self, Self::Devnet)
    }

    pub fn is_mainnet(self) -> bool {
        matches!(self, Self::Mainnet)
    }

    /// Default API base URL for this network
    pub fn default_api_url(self) -> &'static str {
        match self {
            Self::Devnet => DEVNET_STACKS_API_URL,
            Self::Testnet => STACKS_API_TESTNET_URL,
            Self::Mainnet => STACKS_API_MAINNET_URL,
        }
    }

    /// Devnet runs with testnet consensus parameters
    pub fn chain_id(self) -> u32 {
        if self.is_mainnet() {
            CHAIN_ID_MAINNET
        } else {
            CHAIN_ID_TESTNET
        }
    }

    /// Transaction version byte
    pub fn transaction_version(self) -> u8 {
        if self.is_mainnet() {
            0x00
        } else {
            0x80
        }
    }

    pub fn address_version(self) -> u8 {
        if self.is_mainnet() {
            ADDRESS_VERSION_MAINNET_SINGLESIG
        } else {
            ADDRESS_VERSION_TESTNET_SINGLESIG
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(CounterError::Config(format!("unknown network '{}'", other))),
        }
    }
}
