//! Application context
//!
//! [`CounterApp`] wires the wallet session, the polled reads, the writer and
//! the transaction tracker together. It is built once and passed to whatever
//! renders it. A write runs as: reserve the write slot, submit, track the
//! txid, then on confirmation invalidate the counter read and free the slot.

use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};

use crate::api::StacksApiClient;
use crate::chain::block_height_query;
use crate::clarity::ClarityValue;
use crate::config::ClientConfig;
use crate::counter::{counter_value_query, CounterFunction, CounterWriter};
use crate::error::{CounterError, Result};
use crate::network::NetworkType;
use crate::notify::{Notice, Notifier};
use crate::query::{PolledQuery, QueryInvalidator};
use crate::tracker::{TrackOutcome, TrackedTransaction, TransactionTracker, TxStatus, TxTracking};
use crate::wallet::{WalletExtension, WalletSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub txid: String,
    pub function: CounterFunction,
    pub status: TxStatus,
}

/// The single write slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteState {
    #[default]
    Idle,
    /// Signed or handed to the wallet; no txid yet
    Submitting(CounterFunction),
    Pending(PendingTransaction),
}

impl WriteState {
    pub fn is_idle(&self) -> bool {
        matches!(self, WriteState::Idle)
    }

    fn describe(&self) -> String {
        match self {
            WriteState::Idle => "idle".to_string(),
            WriteState::Submitting(function) => format!("{} is being submitted", function),
            WriteState::Pending(p) => format!("{} ({})", p.txid, p.function),
        }
    }
}

pub struct CounterApp {
    config: ClientConfig,
    api: StacksApiClient,
    notifier: Notifier,
    session: WalletSession,
    writer: CounterWriter,
    counter: PolledQuery<u128>,
    block_height: PolledQuery<u64>,
    writes: Arc<watch::Sender<WriteState>>,
    tracking: Mutex<Option<TxTracking>>,
}

impl CounterApp {
    /// Build the context and start the background reads.
    /// Must be called from within a tokio runtime.
    pub async fn new(
        config: ClientConfig,
        extension: Option<Arc<dyn WalletExtension>>,
    ) -> Result<Self> {
        let api = StacksApiClient::new(&config)?;
        let notifier = Notifier::new();
        let session = WalletSession::new(&config, extension, notifier.clone()).await;

        log::info!(
            "🚀 Counter app on {} ({}), contract {}",
            config.network.label(),
            api.base_url(),
            config.contract
        );

        Ok(Self {
            counter: counter_value_query(api.clone(), &config),
            block_height: block_height_query(api.clone(), &config),
            writer: CounterWriter::new(api.clone(), &config),
            writes: Arc::new(watch::channel(WriteState::Idle).0),
            tracking: Mutex::new(None),
            config,
            api,
            notifier,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn network(&self) -> NetworkType {
        self.config.network
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    pub fn counter(&self) -> &PolledQuery<u128> {
        &self.counter
    }

    pub fn block_height(&self) -> &PolledQuery<u64> {
        &self.block_height
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    pub fn write_state(&self) -> WriteState {
        self.writes.borrow().clone()
    }

    pub fn subscribe_writes(&self) -> watch::Receiver<WriteState> {
        self.writes.subscribe()
    }

    /// State of the transaction currently or last tracked
    pub async fn tracked(&self) -> Option<watch::Receiver<TrackedTransaction>> {
        self.tracking.lock().await.as_ref().map(TxTracking::subscribe)
    }

    pub async fn increment(&self) -> Result<String> {
        self.write(CounterFunction::Increment).await
    }

    pub async fn decrement(&self) -> Result<String> {
        self.write(CounterFunction::Decrement).await
    }

    /// Wait for the write slot to free up
    pub async fn wait_idle(&self) -> Result<()> {
        let mut rx = self.writes.subscribe();
        rx.wait_for(WriteState::is_idle)
            .await
            .map_err(|_| CounterError::StatusQueryFailed("write state closed".to_string()))?;
        Ok(())
    }

    /// Forget the pending transaction and stop tracking it.
    ///
    /// A write still being submitted has no txid yet and is left alone;
    /// returns whether a pending transaction was cleared.
    pub async fn clear_pending(&self) -> bool {
        let cleared = self.writes.send_if_modified(|state| {
            if matches!(state, WriteState::Pending(_)) {
                *state = WriteState::Idle;
                true
            } else {
                false
            }
        });
        if cleared {
            if let Some(tracking) = self.tracking.lock().await.take() {
                log::info!("Stopped tracking {}", tracking.txid());
            }
        }
        cleared
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    async fn write(&self, function: CounterFunction) -> Result<String> {
        let action = capitalize(function.as_str());

        let signer = match self.session.signer().await {
            Ok(signer) => signer,
            Err(e) => {
                self.notifier.failure(&action, &e);
                return Err(e);
            }
        };

        let mut busy = None;
        let reserved = self.writes.send_if_modified(|state| {
            if state.is_idle() {
                *state = WriteState::Submitting(function);
                true
            } else {
                busy = Some(state.describe());
                false
            }
        });
        if !reserved {
            let err = CounterError::WriteInFlight(busy.unwrap_or_default());
            log::warn!("{} refused: {}", action, err);
            self.notifier.failure(&action, &err);
            return Err(err);
        }

        let txid = match self.writer.submit(&signer, function).await {
            Ok(txid) => txid,
            Err(e) => {
                self.writes.send_replace(WriteState::Idle);
                self.notifier.failure(&action, &e);
                return Err(e);
            }
        };

        self.writes.send_replace(WriteState::Pending(PendingTransaction {
            txid: txid.clone(),
            function,
            status: TxStatus::Pending,
        }));
        self.notifier.success(format!("Transaction submitted: {}", txid));

        let on_terminal = settle_write(
            action,
            self.counter.invalidator(),
            self.writes.clone(),
            self.notifier.clone(),
        );
        let tracking = TransactionTracker::track(
            self.api.clone(),
            txid.clone(),
            self.config.tx_status_poll,
            on_terminal,
        );
        *self.tracking.lock().await = Some(tracking);

        Ok(txid)
    }
}

/// Terminal handling for one write: refresh the counter on success, report
/// failures, free the write slot.
fn settle_write(
    action: String,
    counter: QueryInvalidator,
    writes: Arc<watch::Sender<WriteState>>,
    notifier: Notifier,
) -> impl FnOnce(TrackOutcome) + Send + 'static {
    move |outcome| {
        match &outcome {
            TrackOutcome::Confirmed { block_height, .. } => {
                counter.invalidate();
                match block_height {
                    Some(height) => notifier.success(format!("{} confirmed in block {}", action, height)),
                    None => notifier.success(format!("{} confirmed", action)),
                }
            }
            TrackOutcome::Failed { status, result, .. } => match result {
                Some(ClarityValue::ResponseErr(inner)) => {
                    let err = CounterError::contract_error(inner.as_uint(), format!("(err {})", inner));
                    notifier.failure(&action, &err);
                }
                _ => notifier.error(format!("{} failed: transaction {}", action, status)),
            },
            TrackOutcome::QueryFailed { error, .. } => {
                notifier.failure("Transaction status", error);
            }
        }

        let txid = outcome.txid();
        writes.send_if_modified(|state| match state {
            WriteState::Pending(p) if p.txid == txid => {
                *state = WriteState::Idle;
                true
            }
            _ => false,
        });
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_requires_connection() {
        let config = ClientConfig::devnet("http://127.0.0.1:9").unwrap();
        let app = CounterApp::new(config, None).await.unwrap();
        let mut notices = app.notices();

        assert_eq!(app.increment().await.unwrap_err(), CounterError::NotConnected);
        assert!(app.write_state().is_idle());
        assert_eq!(
            notices.recv().await.unwrap().message,
            "Increment failed: Wallet not connected"
        );
    }

    #[tokio::test]
    async fn test_failed_submission_frees_write_slot() {
        let config = ClientConfig::devnet("http://127.0.0.1:9").unwrap();
        let app = CounterApp::new(config, None).await.unwrap();
        app.session().select_devnet_account("wallet_1").await.unwrap();

        let err = app.decrement().await.unwrap_err();
        assert!(matches!(err, CounterError::SubmissionRejected(_)));
        assert!(app.write_state().is_idle());
    }

    #[tokio::test]
    async fn test_clear_pending_leaves_submitting_write_alone() {
        let config = ClientConfig::devnet("http://127.0.0.1:9").unwrap();
        let app = CounterApp::new(config, None).await.unwrap();

        app.writes
            .send_replace(WriteState::Submitting(CounterFunction::Increment));
        assert!(!app.clear_pending().await);
        assert_eq!(
            app.write_state(),
            WriteState::Submitting(CounterFunction::Increment)
        );

        app.writes.send_replace(WriteState::Pending(PendingTransaction {
            txid: "0x01".into(),
            function: CounterFunction::Increment,
            status: TxStatus::Pending,
        }));
        assert!(app.clear_pending().await);
        assert!(app.write_state().is_idle());
    }

    #[tokio::test]
    async fn test_settle_write_clears_matching_pending_only() {
        let writes = Arc::new(
            watch::channel(WriteState::Pending(PendingTransaction {
                txid: "0x01".into(),
                function: CounterFunction::Increment,
                status: TxStatus::Pending,
            }))
            .0,
        );
        let options = crate::query::QueryOptions {
            refetch_interval: None,
            retries: 0,
            retry_delay: std::time::Duration::from_millis(1),
        };
        let query = PolledQuery::spawn("idle", options, || async { Ok(0u128) });
        let notifier = Notifier::new();
        let mut notices = notifier.subscribe();

        let settle = settle_write(
            "Increment".into(),
            query.invalidator(),
            writes.clone(),
            notifier.clone(),
        );
        settle(TrackOutcome::QueryFailed {
            txid: "0x02".into(),
            error: CounterError::StatusQueryFailed("gone".into()),
        });
        assert!(!writes.borrow().is_idle());

        let settle = settle_write("Increment".into(), query.invalidator(), writes.clone(), notifier);
        settle(TrackOutcome::Failed {
            txid: "0x01".into(),
            status: TxStatus::AbortByResponse,
            result: Some(ClarityValue::err(ClarityValue::UInt(1))),
        });
        assert!(writes.borrow().is_idle());

        notices.recv().await.unwrap();
        let aborted = notices.recv().await.unwrap();
        assert_eq!(
            aborted.message,
            "Increment failed: Contract returned error: (err u1)"
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("increment"), "Increment");
        assert_eq!(capitalize(""), "");
    }
}
