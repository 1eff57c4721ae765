/// In-memory Stacks node backing the mock API
///
/// Holds the simnet, a mempool of accepted transactions and their statuses.
/// Nothing is executed until a block is mined.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use stacks_counter::api::{TransactionInfo, TxResult};
use stacks_counter::clarity::ClarityValue;
use stacks_counter::simnet::{Simnet, SimnetError};
use stacks_counter::transaction::StacksTransaction;
use thiserror::Error;

use crate::types::BlockEntry;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{error}: {reason}")]
    Rejected { error: String, reason: String },

    #[error("transaction {0} not found")]
    UnknownTransaction(String),

    #[error("injected read failure")]
    InjectedFault,
}

impl NodeError {
    fn rejected(reason: impl ToString) -> Self {
        NodeError::Rejected {
            error: "transaction rejected".to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct TxRecord {
    status: String,
    block_height: Option<u64>,
    result: Option<ClarityValue>,
}

#[derive(Debug, Default)]
struct NodeState {
    simnet: Simnet,
    mempool: Vec<(String, StacksTransaction)>,
    transactions: HashMap<String, TxRecord>,
    status_queries: HashMap<String, u32>,
    fail_reads: u32,
}

pub struct DevnetNode {
    state: Mutex<NodeState>,
}

/// Outcome of a read-only call, before it is put on the wire
pub type ReadOutcome = Result<ClarityValue, SimnetError>;

impl DevnetNode {
    /// Fresh devnet with the counter contract deployed
    pub fn new() -> Self {
        Self::with_simnet(Simnet::with_counter())
    }

    pub fn with_simnet(simnet: Simnet) -> Self {
        Self {
            state: Mutex::new(NodeState {
                simnet,
                ..NodeState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        // a panicking handler leaves the state usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn call_read_only(
        &self,
        address: &str,
        contract: &str,
        function: &str,
        arguments: &[String],
    ) -> Result<ReadOutcome, NodeError> {
        let mut state = self.lock();
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            log::warn!("Injected read failure ({} left)", state.fail_reads);
            return Err(NodeError::InjectedFault);
        }

        let args = arguments
            .iter()
            .map(|hex| ClarityValue::from_hex(hex))
            .collect::<Result<Vec<_>, _>>();
        let args = match args {
            Ok(args) => args,
            Err(e) => return Err(NodeError::rejected(format!("bad argument: {}", e))),
        };

        Ok(state.simnet.call_read_only(address, contract, function, &args))
    }

    /// Validate and queue a raw transaction; returns its `0x` txid
    pub fn submit_transaction(&self, raw: &[u8]) -> Result<String, NodeError> {
        let tx = StacksTransaction::deserialize(raw).map_err(NodeError::rejected)?;
        tx.verify_origin().map_err(NodeError::rejected)?;

        let mut state = self.lock();
        let sender = tx
            .origin_address(stacks_counter::network::ADDRESS_VERSION_TESTNET_SINGLESIG)
            .to_string();
        let queued = state
            .mempool
            .iter()
            .filter(|(_, queued)| queued.auth.signer == tx.auth.signer)
            .count() as u64;
        let expected = state.simnet.account(&sender).nonce + queued;
        if tx.auth.nonce != expected {
            return Err(NodeError::Rejected {
                error: "transaction rejected".to_string(),
                reason: format!("BadNonce: expected {}, got {}", expected, tx.auth.nonce),
            });
        }

        let txid = tx.txid_hex();
        if state.transactions.contains_key(&txid) {
            return Err(NodeError::rejected(format!("ConflictingNonceInMempool: {}", txid)));
        }

        log::info!("📥 Accepted {} from {} ({})", txid, sender, tx.payload.function_name);
        state.transactions.insert(
            txid.clone(),
            TxRecord {
                status: "pending".to_string(),
                block_height: None,
                result: None,
            },
        );
        state.mempool.push((txid.clone(), tx));
        Ok(txid)
    }

    /// Mine `count` blocks; the first one includes the whole mempool
    pub fn mine(&self, count: u64) -> u64 {
        let mut state = self.lock();
        for _ in 0..count {
            let mempool = std::mem::take(&mut state.mempool);
            let mut outcomes = Vec::with_capacity(mempool.len());
            for (txid, tx) in mempool {
                let outcome = state.simnet.apply_transaction(&tx);
                outcomes.push((txid, outcome));
            }

            let height = state.simnet.mine_block();
            for (txid, outcome) in outcomes {
                let record = match outcome {
                    Ok(receipt) => TxRecord {
                        status: if receipt.committed {
                            "success".to_string()
                        } else {
                            "abort_by_response".to_string()
                        },
                        block_height: Some(height),
                        result: Some(receipt.result),
                    },
                    Err(e) => {
                        log::warn!("Dropping {}: {}", txid, e);
                        TxRecord {
                            status: "dropped_problematic".to_string(),
                            block_height: None,
                            result: None,
                        }
                    }
                };
                log::info!("⛏️  {} -> {} at block {}", txid, record.status, height);
                state.transactions.insert(txid, record);
            }
        }
        state.simnet.block_height()
    }

    pub fn transaction(&self, txid: &str) -> Result<TransactionInfo, NodeError> {
        let txid = normalize(txid);
        let mut state = self.lock();
        *state.status_queries.entry(txid.clone()).or_insert(0) += 1;

        let record = state
            .transactions
            .get(&txid)
            .cloned()
            .ok_or_else(|| NodeError::UnknownTransaction(txid.clone()))?;

        Ok(TransactionInfo {
            tx_id: txid,
            tx_status: record.status,
            block_height: record.block_height,
            tx_result: record.result.map(|value| TxResult {
                hex: value.to_hex(),
                repr: value.to_string(),
            }),
        })
    }

    /// How many times the status of `txid` was looked up
    pub fn status_queries(&self, txid: &str) -> u32 {
        self.lock()
            .status_queries
            .get(&normalize(txid))
            .copied()
            .unwrap_or(0)
    }

    pub fn account(&self, principal: &str) -> (u128, u64) {
        let account = self.lock().simnet.account(principal);
        (account.balance, account.nonce)
    }

    /// Latest `limit` blocks, newest first
    pub fn latest_blocks(&self, limit: u64) -> Vec<BlockEntry> {
        let state = self.lock();
        let height = state.simnet.block_height();
        let burn = state.simnet.burn_block_height();
        (0..limit.min(height))
            .map(|i| BlockEntry {
                height: height - i,
                burn_block_height: burn.saturating_sub(i),
            })
            .collect()
    }

    pub fn block_height(&self) -> u64 {
        self.lock().simnet.block_height()
    }

    pub fn counter_value(&self) -> Option<u128> {
        let state = self.lock();
        let deployer = state.simnet.deployer().to_string();
        state
            .simnet
            .contract(&deployer, stacks_counter::simnet::COUNTER_CONTRACT_NAME)
            .map(|c| c.count())
    }

    /// Make the next `count` read-only calls fail with a 500
    pub fn set_fail_reads(&self, count: u32) {
        self.lock().fail_reads = count;
    }

    pub fn mempool_len(&self) -> usize {
        self.lock().mempool.len()
    }
}

impl Default for DevnetNode {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(txid: &str) -> String {
    format!("0x{}", txid.trim_start_matches("0x").to_ascii_lowercase())
}
