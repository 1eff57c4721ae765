use crate::api::StacksApiClient;
use crate::config::ClientConfig;
use crate::query::{PolledQuery, QueryOptions};

/// Poll `get-count` on the configured contract.
///
/// Transport failures and `okay: false` answers are retried
/// `config.read_retries` times; an `(err ...)` value is reported as is.
pub fn counter_value_query(api: StacksApiClient, config: &ClientConfig) -> PolledQuery<u128> {
    let contract = config.contract.clone();
    let options = QueryOptions::polling(config.counter_refresh, config.read_retries, config.retry_delay);

    PolledQuery::spawn("counter-value", options, move || {
        let api = api.clone();
        let contract = contract.clone();
        async move { api.get_counter_value(&contract).await }
    })
}
