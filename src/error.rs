//! Error types for the counter client
//!
//! Every failure a user can hit while talking to the counter contract maps to
//! one variant here. None of them are fatal: the session stays usable and the
//! action can be retried by hand.

use thiserror::Error;

use crate::address::AddressError;
use crate::clarity::ClarityError;
use crate::transaction::TransactionError;

/// Core error type for counter client operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// The wallet extension rejected the handshake or it timed out
    #[error("Wallet connection rejected: {0}")]
    ConnectionRejected(String),

    /// A write was attempted without an active wallet session
    #[error("Wallet not connected")]
    NotConnected,

    /// A single fetch failed; the caller may retry
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// All fetch attempts failed
    #[error("Fetch failed after {attempts} attempts: {last_error}")]
    FetchExhausted { attempts: u32, last_error: String },

    /// The network or the wallet refused the transaction
    #[error("Transaction submission rejected: {0}")]
    SubmissionRejected(String),

    /// Looking up a transaction's status failed
    #[error("Transaction status query failed: {0}")]
    StatusQueryFailed(String),

    /// The call reached the contract but the contract returned `(err ...)`
    #[error("Contract returned error: {repr}")]
    ContractError { code: Option<u128>, repr: String },

    /// A write for this operation is already waiting on its transaction
    #[error("A transaction is already pending: {0}")]
    WriteInFlight(String),

    /// The remote side answered with something we could not interpret
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clarity value error: {0}")]
    Clarity(#[from] ClarityError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Transaction encoding error: {0}")]
    Transaction(#[from] TransactionError),
}

impl CounterError {
    /// Create a fetch failed error
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    /// Create a submission rejected error
    pub fn submission_rejected(msg: impl Into<String>) -> Self {
        Self::SubmissionRejected(msg.into())
    }

    /// Create a contract error from the decoded `(err ...)` payload
    pub fn contract_error(code: Option<u128>, repr: impl Into<String>) -> Self {
        Self::ContractError {
            code,
            repr: repr.into(),
        }
    }

    /// Whether a retry of the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }
}

impl From<reqwest::Error> for CounterError {
    fn from(err: reqwest::Error) -> Self {
        Self::FetchFailed(err.to_string())
    }
}

/// Common result type
pub type Result<T> = std::result::Result<T, CounterError>;
