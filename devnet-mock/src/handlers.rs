/// Axum HTTP handlers for the Stacks node and API endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::node::{DevnetNode, NodeError};
use crate::types::*;

/// Shared application state
pub type AppState = Arc<DevnetNode>;

/// Upper bound on blocks mined by one `/devnet/mine` request
pub const MAX_BLOCKS_PER_MINE: u64 = 1_000;

/// Custom error type for handlers
pub enum ApiError {
    NotFound(String),
    Rejected(BroadcastRejection),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Rejected(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<NodeError> for ApiError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Rejected { error, reason } => ApiError::Rejected(BroadcastRejection {
                error,
                reason: Some(reason),
                txid: None,
            }),
            NodeError::UnknownTransaction(_) => ApiError::NotFound(err.to_string()),
            NodeError::InjectedFault => ApiError::Internal(err.to_string()),
        }
    }
}

/// POST /v2/contracts/call-read/{address}/{contract}/{function}
/// Contract errors come back as `okay: false` with a 200
pub async fn call_read_only(
    State(node): State<AppState>,
    Path((address, contract, function)): Path<(String, String, String)>,
    Json(req): Json<ReadOnlyRequest>,
) -> Result<Json<ReadOnlyResponse>, ApiError> {
    log::debug!("call-read {}.{}::{} as {}", address, contract, function, req.sender);

    let response = match node.call_read_only(&address, &contract, &function, &req.arguments)? {
        Ok(value) => ReadOnlyResponse {
            okay: true,
            result: Some(value.to_hex()),
            cause: None,
        },
        Err(e) => ReadOnlyResponse {
            okay: false,
            result: None,
            cause: Some(e.to_string()),
        },
    };
    Ok(Json(response))
}

/// POST /v2/transactions
/// Raw transaction bytes in, JSON string txid out
pub async fn broadcast_transaction(
    State(node): State<AppState>,
    body: Bytes,
) -> Result<Json<String>, ApiError> {
    let txid = node.submit_transaction(&body).map_err(|e| {
        log::warn!("Broadcast rejected: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(txid))
}

/// GET /v2/accounts/{principal}
pub async fn get_account(
    State(node): State<AppState>,
    Path(principal): Path<String>,
) -> Json<AccountInfo> {
    let (balance, nonce) = node.account(&principal);
    Json(AccountInfo {
        balance: format!("0x{:032x}", balance),
        nonce,
    })
}

/// GET /extended/v1/tx/{txid}
pub async fn get_transaction(
    State(node): State<AppState>,
    Path(txid): Path<String>,
) -> Result<Json<TransactionInfo>, ApiError> {
    Ok(Json(node.transaction(&txid)?))
}

/// GET /extended/v2/blocks?limit=N
pub async fn get_blocks(
    State(node): State<AppState>,
    Query(query): Query<BlocksQuery>,
) -> Json<BlockListResponse> {
    let results = node.latest_blocks(query.limit);
    Json(BlockListResponse {
        limit: query.limit,
        total: node.block_height(),
        results,
    })
}

// ============================================================================
// DEVNET HELPER ENDPOINTS (not part of the Stacks API)
// ============================================================================

/// POST /devnet/mine
pub async fn mine_blocks(
    State(node): State<AppState>,
    Json(req): Json<MineBlocksRequest>,
) -> Json<MineBlocksResponse> {
    let count = req.count.min(MAX_BLOCKS_PER_MINE);
    if count < req.count {
        log::warn!("Requested {} blocks, mining {}", req.count, count);
    }
    log::info!("Mining {} blocks", count);
    let new_height = node.mine(count);
    Json(MineBlocksResponse {
        new_height,
        mined: count,
    })
}

/// POST /devnet/faults
pub async fn set_faults(
    State(node): State<AppState>,
    Json(req): Json<FaultsRequest>,
) -> Json<FaultsRequest> {
    log::info!("Next {} read-only calls will fail", req.fail_reads);
    node.set_fail_reads(req.fail_reads);
    Json(req)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
