//! Polled queries
//!
//! A [`PolledQuery`] owns a background task that fetches a value, publishes
//! the result through a `watch` channel and fetches again after a fixed
//! interval or as soon as it is invalidated. Failed fetches are retried with
//! a doubling delay when the error is transient; once the retries are spent
//! the error is published as state and never propagated further.
//!
//! Dropping the query stops its task. An in-flight request is not cancelled
//! cooperatively, it is simply never rescheduled.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::error::{CounterError, Result};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// `None` fetches once and then only on invalidation
    pub refetch_interval: Option<Duration>,
    /// Retries after the first failure
    pub retries: u32,
    pub retry_delay: Duration,
}

impl QueryOptions {
    pub fn polling(interval: Duration, retries: u32, retry_delay: Duration) -> Self {
        Self {
            refetch_interval: Some(interval),
            retries,
            retry_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successfully fetched value; kept while later fetches fail
    pub data: Option<T>,
    /// No fetch has completed yet
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
    pub error: Option<CounterError>,
    /// Failed attempts in the current fetch
    pub failure_count: u32,
    /// Completed fetches, successful or not
    pub fetch_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: true,
            is_fetching: false,
            is_error: false,
            error: None,
            failure_count: 0,
            fetch_count: 0,
            updated_at: None,
        }
    }
}

/// Handle that forces a query to fetch again
#[derive(Clone, Debug)]
pub struct QueryInvalidator {
    name: &'static str,
    refetch: Arc<Notify>,
}

impl QueryInvalidator {
    /// Request a fresh fetch. If a fetch is running, another one follows it.
    pub fn invalidate(&self) {
        log::debug!("Invalidating query '{}'", self.name);
        self.refetch.notify_one();
    }
}

pub struct PolledQuery<T> {
    name: &'static str,
    state: watch::Receiver<QueryState<T>>,
    refetch: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T> PolledQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling. Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(name: &'static str, options: QueryOptions, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(QueryState::default());
        let refetch = Arc::new(Notify::new());
        let task = tokio::spawn(run_query(name, options, fetch, tx, refetch.clone()));

        Self {
            name,
            state: rx,
            refetch,
            task,
        }
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn data(&self) -> Option<T> {
        self.state.borrow().data.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.clone()
    }

    pub fn invalidate(&self) {
        self.invalidator().invalidate();
    }

    pub fn invalidator(&self) -> QueryInvalidator {
        QueryInvalidator {
            name: self.name,
            refetch: self.refetch.clone(),
        }
    }

    /// Wait until the published state satisfies `predicate`
    pub async fn wait_for<P>(&self, predicate: P) -> Result<QueryState<T>>
    where
        P: FnMut(&QueryState<T>) -> bool,
    {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| CounterError::fetch_failed(format!("query '{}' stopped", self.name)))?;
        Ok(state.clone())
    }
}

impl<T> Drop for PolledQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_query<T, F, Fut>(
    name: &'static str,
    options: QueryOptions,
    fetch: F,
    tx: watch::Sender<QueryState<T>>,
    refetch: Arc<Notify>,
) where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    loop {
        tx.send_modify(|s| s.is_fetching = true);

        let mut attempt = 0u32;
        let outcome = loop {
            match fetch().await {
                Ok(value) => break Ok(value),
                Err(e) if e.is_transient() && attempt < options.retries => {
                    let delay = options.delay_for(attempt);
                    attempt += 1;
                    log::debug!(
                        "Query '{}' failed (attempt {}), retrying in {:?}: {}",
                        name,
                        attempt,
                        delay,
                        e
                    );
                    tx.send_modify(|s| s.failure_count = attempt);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    break Err(CounterError::FetchExhausted {
                        attempts: attempt + 1,
                        last_error: e.to_string(),
                    })
                }
                Err(e) => break Err(e),
            }
        };

        match outcome {
            Ok(value) => {
                log::trace!("Query '{}' fetched", name);
                tx.send_modify(|s| {
                    s.data = Some(value);
                    s.is_error = false;
                    s.error = None;
                    s.failure_count = 0;
                    s.updated_at = Some(Utc::now());
                    s.is_loading = false;
                    s.is_fetching = false;
                    s.fetch_count += 1;
                });
            }
            Err(e) => {
                log::warn!("Query '{}' failed: {}", name, e);
                tx.send_modify(|s| {
                    s.is_error = true;
                    s.error = Some(e);
                    s.failure_count = attempt + 1;
                    s.is_loading = false;
                    s.is_fetching = false;
                    s.fetch_count += 1;
                });
            }
        }

        match options.refetch_interval {
            Some(interval) => {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = refetch.notified() => {}
                }
            }
            None => refetch.notified().await,
        }
    }
}
