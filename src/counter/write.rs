use secp256k1::{PublicKey, Secp256k1};
use std::fmt;

use crate::api::StacksApiClient;
use crate::config::{ClientConfig, ContractId};
use crate::devnet::DevnetAccount;
use crate::error::{CounterError, Result};
use crate::network::NetworkType;
use crate::transaction::{ContractCallRequest, PostConditionMode, StacksTransaction};
use crate::wallet::Signer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterFunction {
    Increment,
    Decrement,
}

impl CounterFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterFunction::Increment => "increment",
            CounterFunction::Decrement => "decrement",
        }
    }
}

impl fmt::Display for CounterFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submits counter writes. Returns once the transaction is accepted, not
/// once it is confirmed.
#[derive(Clone, Debug)]
pub struct CounterWriter {
    api: StacksApiClient,
    contract: ContractId,
    network: NetworkType,
    fee: u64,
}

impl CounterWriter {
    pub fn new(api: StacksApiClient, config: &ClientConfig) -> Self {
        Self {
            api,
            contract: config.contract.clone(),
            network: config.network,
            fee: config.tx_fee,
        }
    }

    pub fn request(&self, function: CounterFunction) -> ContractCallRequest {
        ContractCallRequest {
            contract_address: self.contract.address.clone(),
            contract_name: self.contract.name.clone(),
            function_name: function.as_str().to_string(),
            function_args: Vec::new(),
            post_condition_mode: PostConditionMode::Allow,
            network: self.network,
        }
    }

    /// Submit `function` on behalf of `signer` and return the txid
    pub async fn submit(&self, signer: &Signer, function: CounterFunction) -> Result<String> {
        let request = self.request(function);
        log::info!("📝 Submitting {} on {}", function, self.contract);

        let txid = match signer {
            Signer::Simulated(account) => self.sign_and_broadcast(account, &request).await?,
            Signer::External(ext) => ext
                .request_contract_call(request)
                .await
                .map_err(|e| match e {
                    CounterError::SubmissionRejected(_) => e,
                    other => CounterError::submission_rejected(other.to_string()),
                })?,
        };

        log::info!("✅ {} accepted: {}", function, txid);
        Ok(txid)
    }

    async fn sign_and_broadcast(
        &self,
        account: &DevnetAccount,
        request: &ContractCallRequest,
    ) -> Result<String> {
        let nonce = self
            .api
            .get_account_nonce(&account.stx_address)
            .await
            .map_err(|e| CounterError::submission_rejected(format!("nonce lookup: {}", e)))?;
        log::debug!("Using nonce {} for {}", nonce, account.stx_address);

        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), account.secret_key());
        let mut tx = StacksTransaction::contract_call(request, &public_key, nonce, self.fee)?;
        tx.sign(account.secret_key())?;

        let submission = self.api.broadcast_transaction(tx.serialize()).await?;
        Ok(normalize_txid(&submission.txid))
    }
}

/// Txids are compared with a `0x` prefix everywhere
pub fn normalize_txid(txid: &str) -> String {
    let bare = txid.trim().trim_start_matches("0x");
    format!("0x{}", bare.to_ascii_lowercase())
}
