//! Devnet simulated accounts
//!
//! The pre-funded accounts of the default Clarinet devnet. Selecting one of
//! them is what "connecting" means on devnet: there is no external wallet,
//! the key material is known and transactions are signed locally.

use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::address::StacksAddress;
use crate::error::{CounterError, Result};
use crate::network::ADDRESS_VERSION_TESTNET_SINGLESIG;

/// Account label, key name and hex private key (33 bytes, trailing `01`
/// marks a compressed public key)
const DEVNET_KEYS: [(&str, &str, &str); 4] = [
    (
        "Deployer",
        "deployer",
        "753b7cc01a1a2e86221266a154af739463fce51219d97e4f856cd7200c3bd2a601",
    ),
    (
        "Wallet 1",
        "wallet_1",
        "7287ba251d44a4d3fd9276c88ce34c5c52a038955511cccaf77e61068649c17801",
    ),
    (
        "Wallet 2",
        "wallet_2",
        "530d9f61984c888536871c6573073bdfc0058896dc1adfe9a6a10dfacadc209101",
    ),
    (
        "Wallet 3",
        "wallet_3",
        "d655b2523bcd65e34889725c73064feb17ceb796831c0e111ba1a552b0f31b3901",
    ),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevnetAccount {
    pub label: String,
    pub name: String,
    pub stx_address: String,
    secret_key: SecretKey,
}

impl DevnetAccount {
    pub fn from_private_key(label: &str, name: &str, private_key_hex: &str) -> Result<Self> {
        let bytes = hex::decode(private_key_hex)
            .map_err(|e| CounterError::Config(format!("invalid key for {}: {}", name, e)))?;
        // 33-byte form carries the compression flag
        let key_bytes = match bytes.len() {
            32 => &bytes[..],
            33 if bytes[32] == 0x01 => &bytes[..32],
            n => {
                return Err(CounterError::Config(format!(
                    "invalid key length {} for {}",
                    n, name
                )))
            }
        };
        let secret_key = SecretKey::from_slice(key_bytes)
            .map_err(|e| CounterError::Config(format!("invalid key for {}: {}", name, e)))?;
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &secret_key);
        let stx_address =
            StacksAddress::from_public_key(ADDRESS_VERSION_TESTNET_SINGLESIG, &public_key)
                .to_string();

        Ok(Self {
            label: label.to_string(),
            name: name.to_string(),
            stx_address,
            secret_key,
        })
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn address(&self) -> Result<StacksAddress> {
        Ok(self.stx_address.parse()?)
    }
}

/// All simulated accounts, deployer first
pub fn devnet_wallets() -> Vec<DevnetAccount> {
    DEVNET_KEYS
        .iter()
        .filter_map(|(label, name, key)| match DevnetAccount::from_private_key(label, name, key) {
            Ok(account) => Some(account),
            Err(e) => {
                log::error!("Skipping devnet account {}: {}", name, e);
                None
            }
        })
        .collect()
}

/// The account that deploys contracts on devnet
pub fn deployer() -> Result<DevnetAccount> {
    find_account("deployer")
}

/// Look up an account by key name (`wallet_1`) or by address
pub fn find_account(name_or_address: &str) -> Result<DevnetAccount> {
    devnet_wallets()
        .into_iter()
        .find(|a| a.name == name_or_address || a.stx_address == name_or_address)
        .ok_or_else(|| CounterError::Config(format!("unknown devnet account '{}'", name_or_address)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_accounts_load() {
        let wallets = devnet_wallets();
        assert_eq!(wallets.len(), 4);
        assert_eq!(wallets[0].name, "deployer");
        for wallet in &wallets {
            assert!(wallet.stx_address.starts_with("ST"));
            assert!(wallet.address().is_ok());
        }
    }

    #[test]
    fn test_addresses_match_clarinet_devnet() {
        assert_eq!(
            deployer().unwrap().stx_address,
            "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM"
        );
        assert_eq!(
            find_account("wallet_1").unwrap().stx_address,
            "ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5"
        );
    }

    #[test]
    fn test_accounts_have_distinct_addresses() {
        let wallets = devnet_wallets();
        let mut addresses: Vec<_> = wallets.iter().map(|w| w.stx_address.clone()).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), wallets.len());
    }

    #[test]
    fn test_find_by_name_and_address() {
        let wallet = find_account("wallet_2").unwrap();
        let same = find_account(&wallet.stx_address).unwrap();
        assert_eq!(wallet, same);
        assert!(find_account("wallet_9").is_err());
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert!(DevnetAccount::from_private_key("x", "x", "abcd").is_err());
    }
}
