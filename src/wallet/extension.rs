//! Seam for an external wallet (browser extension, hardware signer, ...)
//!
//! The wallet's own protocol is out of scope. Anything that can hand out an
//! address and sign-and-broadcast a contract call can sit behind this trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::transaction::ContractCallRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StxAddressEntry {
    pub address: String,
    pub public_key: Option<String>,
}

#[async_trait]
pub trait WalletExtension: Send + Sync {
    /// Run the connect handshake. `Err(ConnectionRejected)` when the user declines.
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Whether a connection from an earlier session is still live
    async fn is_connected(&self) -> bool;

    /// Addresses the wallet exposes, preferred first
    async fn stx_addresses(&self) -> Result<Vec<StxAddressEntry>>;

    /// Sign and broadcast `request`, returning the txid
    async fn request_contract_call(&self, request: ContractCallRequest) -> Result<String>;
}
