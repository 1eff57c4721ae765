// Stacks API integration
// HTTP client for the node and indexer endpoints the counter client uses

pub mod client;
pub mod types;

pub use client::StacksApiClient;
pub use types::*;
