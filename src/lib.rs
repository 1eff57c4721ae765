//! Stacks Counter: client for the `counter` Clarity contract
//!
//! This crate keeps a local view of a counter contract deployed on Stacks
//! and drives writes against it from a devnet simulated account or an
//! external wallet.
//!
//! # Architecture
//!
//! - **Wallet Session**: connection state; devnet accounts or an extension
//! - **Counter Read**: `get-count` polled on an interval, invalidated by writes
//! - **Counter Write**: `increment` / `decrement` contract calls returning a txid
//! - **Transaction Tracker**: polls a txid until it succeeds or aborts
//! - **Simnet**: in-memory model of the contract, used by tests and the devnet mock
//!
//! # Example
//!
//! ```ignore
//! use stacks_counter::{ClientConfig, CounterApp};
//!
//! let app = CounterApp::new(ClientConfig::from_env()?, None).await?;
//! app.session().select_devnet_account("wallet_1").await?;
//!
//! let txid = app.increment().await?;
//! app.wait_idle().await?;
//! println!("{} -> {:?}", txid, app.counter().data());
//! ```

// Public modules
pub mod address;
pub mod api;
pub mod app;
pub mod chain;
pub mod clarity;
pub mod config;
pub mod counter;
pub mod devnet;
pub mod error;
pub mod network;
pub mod notify;
pub mod query;
pub mod simnet;
pub mod tracker;
pub mod transaction;
pub mod wallet;

// Re-exports for convenience
pub use address::{format_stx_address, StacksAddress};
pub use api::StacksApiClient;
pub use app::{CounterApp, PendingTransaction, WriteState};
pub use clarity::{ClarityError, ClarityValue};
pub use config::{ClientConfig, ContractId};
pub use counter::{CounterFunction, CounterWriter};
pub use devnet::{devnet_wallets, DevnetAccount};
pub use error::{CounterError, Result};
pub use network::NetworkType;
pub use notify::{Notice, NoticeLevel, Notifier};
pub use query::{PolledQuery, QueryOptions, QueryState};
pub use simnet::{CallReceipt, CounterContract, Simnet, SimnetError};
pub use tracker::{TrackOutcome, TrackedTransaction, TransactionTracker, TxStatus, TxTracking};
pub use transaction::{ContractCallRequest, PostConditionMode, StacksTransaction};
pub use wallet::{SessionSnapshot, Signer, WalletExtension, WalletMode, WalletSession};
