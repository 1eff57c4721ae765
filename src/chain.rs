//! Latest Bitcoin (burn) block height, as seen by the Stacks API

use crate::api::StacksApiClient;
use crate::config::ClientConfig;
use crate::error::CounterError;
use crate::query::{PolledQuery, QueryOptions};

pub fn block_height_query(api: StacksApiClient, config: &ClientConfig) -> PolledQuery<u64> {
    let options = QueryOptions::polling(config.block_refresh, config.read_retries, config.retry_delay);

    PolledQuery::spawn("burn-block-height", options, move || {
        let api = api.clone();
        async move {
            let block = api.get_latest_block().await?;
            if block.burn_block_height == 0 {
                return Err(CounterError::InvalidResponse(
                    "latest block has no burn block height".to_string(),
                ));
            }
            Ok(block.burn_block_height)
        }
    })
}
