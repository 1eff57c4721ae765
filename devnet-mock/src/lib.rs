/// Devnet Mock Server Library
///
/// The subset of the Stacks node and API endpoints the counter client talks
/// to, served from an in-memory simnet. Usable as a binary or embedded in
/// tests.

pub mod handlers;
pub mod node;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use node::DevnetNode;
pub use server::{create_router, run_server, spawn_auto_miner};
pub use types::*;
