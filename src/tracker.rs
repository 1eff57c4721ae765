//! Transaction status tracking
//!
//! Polls `/extended/v1/tx/{txid}` from the moment a write is accepted until
//! the transaction reaches a terminal state. A failed status lookup ends the
//! tracking; it is reported through the terminal callback, not retried.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::StacksApiClient;
use crate::clarity::ClarityValue;
use crate::error::{CounterError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Success,
    AbortByResponse,
    AbortByPostCondition,
    /// Any other abort or drop reason reported by the API
    Aborted(String),
}

impl TxStatus {
    pub fn from_api(status: &str) -> Self {
        match status {
            "pending" => TxStatus::Pending,
            "success" => TxStatus::Success,
            "abort_by_response" => TxStatus::AbortByResponse,
            "abort_by_post_condition" => TxStatus::AbortByPostCondition,
            s if s.starts_with("abort") || s.starts_with("dropped") => {
                TxStatus::Aborted(s.to_string())
            }
            other => {
                log::warn!("Unknown transaction status '{}', treating as pending", other);
                TxStatus::Pending
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, TxStatus::Success)
    }

    pub fn is_failed(&self) -> bool {
        self.is_terminal() && !self.is_confirmed()
    }

    pub fn as_str(&self) -> &str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Success => "success",
            TxStatus::AbortByResponse => "abort_by_response",
            TxStatus::AbortByPostCondition => "abort_by_post_condition",
            TxStatus::Aborted(s) => s,
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTransaction {
    pub txid: String,
    pub status: TxStatus,
    pub block_height: Option<u64>,
    /// Decoded `tx_result`, once the API reports one
    pub result: Option<ClarityValue>,
    pub error: Option<CounterError>,
    pub polls: u32,
    /// Polling has stopped
    pub finished: bool,
}

impl TrackedTransaction {
    fn new(txid: String) -> Self {
        Self {
            txid,
            status: TxStatus::Pending,
            block_height: None,
            result: None,
            error: None,
            polls: 0,
            finished: false,
        }
    }
}

/// How tracking ended
#[derive(Debug, Clone, PartialEq)]
pub enum TrackOutcome {
    Confirmed {
        txid: String,
        block_height: Option<u64>,
        result: Option<ClarityValue>,
    },
    Failed {
        txid: String,
        status: TxStatus,
        result: Option<ClarityValue>,
    },
    QueryFailed {
        txid: String,
        error: CounterError,
    },
}

impl TrackOutcome {
    pub fn txid(&self) -> &str {
        match self {
            TrackOutcome::Confirmed { txid, .. }
            | TrackOutcome::Failed { txid, .. }
            | TrackOutcome::QueryFailed { txid, .. } => txid,
        }
    }
}

pub struct TransactionTracker;

impl TransactionTracker {
    /// Start polling `txid` every `interval`. The first lookup happens
    /// immediately. `on_terminal` runs once, from the polling task.
    pub fn track<F>(
        api: StacksApiClient,
        txid: impl Into<String>,
        interval: Duration,
        on_terminal: F,
    ) -> TxTracking
    where
        F: FnOnce(TrackOutcome) + Send + 'static,
    {
        let txid = txid.into();
        let (tx, rx) = watch::channel(TrackedTransaction::new(txid.clone()));
        log::info!("⏳ Tracking transaction {}", txid);
        let task = tokio::spawn(poll_status(api, txid.clone(), interval, tx, on_terminal));

        TxTracking {
            txid,
            state: rx,
            task,
        }
    }
}

/// Handle on a running tracker. Dropping it stops polling.
pub struct TxTracking {
    txid: String,
    state: watch::Receiver<TrackedTransaction>,
    task: JoinHandle<()>,
}

impl TxTracking {
    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn current(&self) -> TrackedTransaction {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackedTransaction> {
        self.state.clone()
    }

    /// Wait until polling stops
    pub async fn wait_settled(&self) -> Result<TrackedTransaction> {
        let mut rx = self.state.clone();
        let state = rx.wait_for(|t| t.finished).await.map_err(|_| {
            CounterError::StatusQueryFailed(format!("tracking of {} was cancelled", self.txid))
        })?;
        Ok(state.clone())
    }
}

impl Drop for TxTracking {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_status<F>(
    api: StacksApiClient,
    txid: String,
    interval: Duration,
    state: watch::Sender<TrackedTransaction>,
    on_terminal: F,
) where
    F: FnOnce(TrackOutcome) + Send + 'static,
{
    loop {
        match api.get_transaction(&txid).await {
            Ok(info) => {
                let status = TxStatus::from_api(&info.tx_status);
                let result = info.tx_result.and_then(|r| match ClarityValue::from_hex(&r.hex) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("Undecodable tx_result for {}: {}", txid, e);
                        None
                    }
                });
                let terminal = status.is_terminal();
                log::debug!("Transaction {} is {}", txid, status);

                state.send_modify(|t| {
                    t.polls += 1;
                    t.status = status.clone();
                    t.block_height = info.block_height;
                    t.result = result.clone();
                    t.finished = terminal;
                });

                if terminal {
                    let outcome = if status.is_confirmed() {
                        log::info!("🎉 Transaction {} confirmed", txid);
                        TrackOutcome::Confirmed {
                            txid,
                            block_height: info.block_height,
                            result,
                        }
                    } else {
                        log::warn!("Transaction {} failed: {}", txid, status);
                        TrackOutcome::Failed {
                            txid,
                            status,
                            result,
                        }
                    };
                    on_terminal(outcome);
                    return;
                }
            }
            Err(error) => {
                log::error!("Status lookup for {} failed: {}", txid, error);
                state.send_modify(|t| {
                    t.polls += 1;
                    t.error = Some(error.clone());
                    t.finished = true;
                });
                on_terminal(TrackOutcome::QueryFailed { txid, error });
                return;
            }
        }

        tokio::time::sleep(interval).await;
    }
}
