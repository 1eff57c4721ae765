#![allow(dead_code)]

/// Common test utilities for devnet mock integration tests
///
/// Starts the mock on an ephemeral port and builds client configurations
/// with short polling intervals pointed at it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use devnet_mock::{create_router, DevnetNode};
use stacks_counter::ClientConfig;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(10);

/// Mock server running in the background; stops on drop
pub struct TestDevnet {
    pub node: Arc<DevnetNode>,
    pub addr: SocketAddr,
    server: JoinHandle<()>,
}

impl TestDevnet {
    pub async fn start() -> anyhow::Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();

        let node = Arc::new(DevnetNode::new());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = create_router(node.clone());

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                log::error!("Mock server stopped: {}", e);
            }
        });
        log::info!("🧪 Devnet mock on http://{}", addr);

        Ok(Self { node, addr, server })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Devnet client config with fast polling; the counter itself only
    /// refreshes on invalidation within a test's lifetime
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::devnet(self.url()).expect("devnet config");
        config.counter_refresh = Duration::from_secs(600);
        config.block_refresh = Duration::from_secs(600);
        config.tx_status_poll = Duration::from_millis(50);
        config.retry_delay = Duration::from_millis(10);
        config
    }
}

impl Drop for TestDevnet {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Fail the test instead of hanging
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out waiting for devnet")
}
