// Stacks API request/response types

use serde::{Deserialize, Serialize};

/// Body of `POST /v2/contracts/call-read/{address}/{contract}/{function}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadOnlyRequest {
    pub sender: String,
    pub arguments: Vec<String>, // hex-encoded Clarity values
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadOnlyResponse {
    pub okay: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>, // hex-encoded Clarity value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

/// Result of a successful broadcast or extension call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSubmission {
    pub txid: String,
}

/// Node rejection body for `POST /v2/transactions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRejection {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub hex: String,
    pub repr: String,
}

/// Subset of `GET /extended/v1/tx/{txid}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfo {
    pub tx_id: String,
    pub tx_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_result: Option<TxResult>,
}

/// Subset of `GET /v2/accounts/{principal}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balance: String, // hex-encoded micro-STX
    pub nonce: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSummary {
    pub height: u64,
    pub burn_block_height: u64,
}

/// `GET /extended/v2/blocks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockListResponse {
    pub results: Vec<BlockSummary>,
}
