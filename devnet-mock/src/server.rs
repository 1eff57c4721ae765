/// Axum HTTP server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::*;
use crate::node::DevnetNode;

pub fn create_router(node: Arc<DevnetNode>) -> Router {
    // Browser front ends call the API directly
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Node RPC endpoints
        .route(
            "/v2/contracts/call-read/:address/:contract/:function",
            post(call_read_only),
        )
        .route("/v2/transactions", post(broadcast_transaction))
        .route("/v2/accounts/:principal", get(get_account))

        // Indexer endpoints
        .route("/extended/v1/tx/:txid", get(get_transaction))
        .route("/extended/v2/blocks", get(get_blocks))

        // Devnet helper endpoints
        .route("/devnet/mine", post(mine_blocks))
        .route("/devnet/faults", post(set_faults))

        // Shared state
        .with_state(node)

        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Mine a block every `block_time`
pub fn spawn_auto_miner(node: Arc<DevnetNode>, block_time: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(block_time);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            node.mine(1);
        }
    })
}

pub async fn run_server(
    node: Arc<DevnetNode>,
    host: String,
    port: u16,
    block_time: Option<Duration>,
) -> anyhow::Result<()> {
    let _miner = block_time.map(|t| spawn_auto_miner(node.clone(), t));
    let app = create_router(node);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("🚀 Devnet mock listening on http://{}", addr);
    match block_time {
        Some(t) => log::info!("⛏️  Mining a block every {:?}", t),
        None => log::info!("🔨 Manual mining: POST /devnet/mine"),
    }

    axum::serve(listener, app).await?;

    Ok(())
}
