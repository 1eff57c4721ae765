/// Devnet mock wire types
///
/// Request and response bodies shared with the client library come from
/// `stacks_counter::api`; only the mock-specific ones live here.

use serde::{Deserialize, Serialize};

pub use stacks_counter::api::{
    AccountInfo, BroadcastRejection, ReadOnlyRequest, ReadOnlyResponse, TransactionInfo,
};

/// One entry of `/extended/v2/blocks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntry {
    pub height: u64,
    pub burn_block_height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockListResponse {
    pub limit: u64,
    pub total: u64,
    pub results: Vec<BlockEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BlocksQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct MineBlocksRequest {
    #[serde(default = "default_mine_count")]
    pub count: u64,
}

fn default_mine_count() -> u64 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MineBlocksResponse {
    pub new_height: u64,
    pub mined: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaultsRequest {
    pub fail_reads: u32,
}
