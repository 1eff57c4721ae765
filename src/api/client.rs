use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;

use super::types::*;
use crate::clarity::ClarityValue;
use crate::config::{ClientConfig, ContractId};
use crate::error::{CounterError, Result};

/// Thin HTTP binding to the Stacks node and API endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct StacksApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl StacksApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| CounterError::Config(format!("invalid API key: {}", e)))?;
            headers.insert(HeaderName::from_static("x-api-key"), value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| CounterError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a read-only function and decode its Clarity result.
    ///
    /// `okay: false` (e.g. the contract is not deployed yet) is a fetch
    /// failure the caller may retry.
    pub async fn call_read_only(
        &self,
        contract: &ContractId,
        function_name: &str,
        sender: &str,
        arguments: &[ClarityValue],
    ) -> Result<ClarityValue> {
        let url = format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.base_url, contract.address, contract.name, function_name
        );
        let body = ReadOnlyRequest {
            sender: sender.to_string(),
            arguments: arguments.iter().map(ClarityValue::to_hex).collect(),
        };

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CounterError::fetch_failed(format!(
                "call-read {} returned {}: {}",
                function_name, status, text
            )));
        }

        let read: ReadOnlyResponse = response
            .json()
            .await
            .map_err(|e| CounterError::InvalidResponse(e.to_string()))?;

        match (read.okay, read.result) {
            (true, Some(hex)) => Ok(ClarityValue::from_hex(&hex)?),
            (_, _) => Err(CounterError::fetch_failed(
                read.cause
                    .unwrap_or_else(|| format!("Error calling {}", function_name)),
            )),
        }
    }

    /// Current value of the counter (`get-count` returns `(ok uint)`)
    pub async fn get_counter_value(&self, contract: &ContractId) -> Result<u128> {
        let value = self
            .call_read_only(contract, "get-count", &contract.address, &[])
            .await?;

        match value.into_response()? {
            Ok(inner) => inner.as_uint().ok_or_else(|| {
                CounterError::InvalidResponse(format!("get-count returned {}", inner))
            }),
            Err(inner) => Err(CounterError::contract_error(
                inner.as_uint(),
                format!("(err {})", inner),
            )),
        }
    }

    pub async fn get_transaction(&self, txid: &str) -> Result<TransactionInfo> {
        let url = format!("{}/extended/v1/tx/{}", self.base_url, txid);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CounterError::StatusQueryFailed(e.to_string()))?;

        match response.status() {
            s if s.is_success() => response
                .json::<TransactionInfo>()
                .await
                .map_err(|e| CounterError::StatusQueryFailed(e.to_string())),
            StatusCode::NOT_FOUND => Err(CounterError::StatusQueryFailed(format!(
                "transaction {} not found",
                txid
            ))),
            status => Err(CounterError::StatusQueryFailed(format!(
                "status lookup returned {}",
                status
            ))),
        }
    }

    pub async fn get_account_nonce(&self, address: &str) -> Result<u64> {
        let url = format!("{}/v2/accounts/{}?proof=0", self.base_url, address);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CounterError::fetch_failed(format!(
                "account lookup for {} returned {}",
                address,
                response.status()
            )));
        }

        let info: AccountInfo = response
            .json()
            .await
            .map_err(|e| CounterError::InvalidResponse(e.to_string()))?;
        Ok(info.nonce)
    }

    /// Broadcast a serialized transaction. Acceptance means the node took it
    /// into its mempool, not that it is final.
    pub async fn broadcast_transaction(&self, raw_tx: Vec<u8>) -> Result<TxSubmission> {
        let url = format!("{}/v2/transactions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(raw_tx)
            .send()
            .await
            .map_err(|e| CounterError::submission_rejected(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CounterError::submission_rejected(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<BroadcastRejection>(&text) {
                Ok(rejection) => match rejection.reason {
                    Some(reason) => format!("{}: {}", rejection.error, reason),
                    None => rejection.error,
                },
                Err(_) => format!("{}: {}", status, text),
            };
            return Err(CounterError::submission_rejected(message));
        }

        parse_txid(&text).map(|txid| TxSubmission { txid })
    }

    /// Latest block, as reported by the indexer
    pub async fn get_latest_block(&self) -> Result<BlockSummary> {
        let url = format!("{}/extended/v2/blocks?limit=1", self.base_url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CounterError::fetch_failed(format!(
                "Error fetching blocks from API: {}",
                response.status()
            )));
        }

        let blocks: BlockListResponse = response
            .json()
            .await
            .map_err(|e| CounterError::InvalidResponse(e.to_string()))?;

        blocks
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CounterError::fetch_failed("no blocks returned by API"))
    }
}

/// The node answers with a bare JSON string; some proxies wrap it in `{ "txid": ... }`
fn parse_txid(body: &str) -> Result<String> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(txid)) => Ok(txid),
        Ok(value) => value
            .get("txid")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CounterError::InvalidResponse(format!("no txid in {}", body))),
        Err(_) if !body.trim().is_empty() => Ok(body.trim().trim_matches('"').to_string()),
        Err(e) => Err(CounterError::InvalidResponse(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_txid_forms() {
        assert_eq!(parse_txid("\"0xabc\"").unwrap(), "0xabc");
        assert_eq!(parse_txid("{\"txid\":\"0xdef\"}").unwrap(), "0xdef");
        assert_eq!(parse_txid("0x123").unwrap(), "0x123");
        assert!(parse_txid("{\"ok\":true}").is_err());
        assert!(parse_txid("").is_err());
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = ClientConfig {
            api_url: "http://localhost:3999/".to_string(),
            ..ClientConfig::default()
        };
        let client = StacksApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3999");
    }
}
