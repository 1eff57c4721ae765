//! In-memory chain running the `counter` contract
//!
//! Models exactly what the counter needs: funded accounts with nonces, the
//! contract's single data var, and block heights. Public calls that end in
//! `(err ...)` commit nothing but still consume the sender's nonce and fee.

use std::collections::HashMap;

use thiserror::Error;

use crate::clarity::ClarityValue;
use crate::devnet::{self, DevnetAccount};
use crate::network::ADDRESS_VERSION_TESTNET_SINGLESIG;
use crate::transaction::{StacksTransaction, TransactionError};

pub const COUNTER_CONTRACT_NAME: &str = "counter";
/// `err-underflow` in the counter contract
pub const ERR_UNDERFLOW: u128 = 1;
/// Balance of every devnet account at genesis, in micro-STX
pub const GENESIS_BALANCE: u128 = 100_000_000_000_000;
/// Burn chain height when the simnet starts
pub const GENESIS_BURN_HEIGHT: u64 = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimnetError {
    #[error("contract {0} does not exist")]
    UnknownContract(String),

    #[error("contract {contract} has no function '{function}'")]
    UnknownFunction { contract: String, function: String },

    #[error("'{0}' is a public function and cannot be called read-only")]
    NotReadOnly(String),

    #[error("'{function}' takes no arguments, got {given}")]
    ArgumentCount { function: String, given: usize },

    #[error("contract {0} already exists")]
    ContractExists(String),

    #[error("bad nonce for {address}: expected {expected}, got {actual}")]
    BadNonce {
        address: String,
        expected: u64,
        actual: u64,
    },

    #[error("{address} cannot pay fee {fee}")]
    InsufficientBalance { address: String, fee: u64 },

    #[error("transaction version 0x{0:02x} does not match this chain")]
    WrongChain(u8),

    #[error("invalid transaction: {0}")]
    Transaction(#[from] TransactionError),
}

/// State of a deployed `counter` contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterContract {
    count: u128,
}

impl CounterContract {
    const READ_ONLY: [&'static str; 1] = ["get-count"];
    const PUBLIC: [&'static str; 2] = ["increment", "decrement"];

    pub fn count(&self) -> u128 {
        self.count
    }

    pub fn has_function(function: &str) -> bool {
        Self::READ_ONLY.contains(&function) || Self::PUBLIC.contains(&function)
    }

    pub fn is_read_only(function: &str) -> bool {
        Self::READ_ONLY.contains(&function)
    }

    pub fn get_count(&self) -> ClarityValue {
        ClarityValue::ok(ClarityValue::UInt(self.count))
    }

    pub fn increment(&mut self) -> ClarityValue {
        self.count += 1;
        ClarityValue::ok(ClarityValue::UInt(self.count))
    }

    pub fn decrement(&mut self) -> ClarityValue {
        if self.count == 0 {
            return ClarityValue::err(ClarityValue::UInt(ERR_UNDERFLOW));
        }
        self.count -= 1;
        ClarityValue::ok(ClarityValue::UInt(self.count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub balance: u128,
    pub nonce: u64,
}

/// Outcome of a public call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReceipt {
    pub result: ClarityValue,
    /// False when the call returned `(err ...)`
    pub committed: bool,
}

#[derive(Debug, Clone)]
pub struct Simnet {
    accounts: HashMap<String, Account>,
    contracts: HashMap<String, CounterContract>,
    deployer: String,
    block_height: u64,
    burn_block_height: u64,
}

impl Simnet {
    /// Devnet accounts funded, nothing deployed
    pub fn new() -> Self {
        Self::with_accounts(&devnet::devnet_wallets())
    }

    pub fn with_accounts(accounts: &[DevnetAccount]) -> Self {
        let deployer = accounts
            .first()
            .map(|a| a.stx_address.clone())
            .unwrap_or_default();
        let accounts = accounts
            .iter()
            .map(|a| {
                (
                    a.stx_address.clone(),
                    Account {
                        balance: GENESIS_BALANCE,
                        nonce: 0,
                    },
                )
            })
            .collect();

        Self {
            accounts,
            contracts: HashMap::new(),
            deployer,
            block_height: 1,
            burn_block_height: GENESIS_BURN_HEIGHT,
        }
    }

    /// Devnet with `counter` deployed by the deployer
    pub fn with_counter() -> Self {
        let mut simnet = Self::new();
        let deployer = simnet.deployer.clone();
        // fresh chain, cannot already exist
        let _ = simnet.deploy_counter(&deployer, COUNTER_CONTRACT_NAME);
        simnet
    }

    pub fn deployer(&self) -> &str {
        &self.deployer
    }

    pub fn deploy_counter(&mut self, deployer: &str, name: &str) -> Result<(), SimnetError> {
        let id = contract_id(deployer, name);
        if self.contracts.contains_key(&id) {
            return Err(SimnetError::ContractExists(id));
        }
        log::debug!("Deployed {}", id);
        self.contracts.insert(id, CounterContract::default());
        self.bump_nonce(deployer);
        self.mine_block();
        Ok(())
    }

    pub fn contract(&self, address: &str, name: &str) -> Option<&CounterContract> {
        self.contracts.get(&contract_id(address, name))
    }

    pub fn account(&self, address: &str) -> Account {
        self.accounts.get(address).cloned().unwrap_or(Account {
            balance: 0,
            nonce: 0,
        })
    }

    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    pub fn burn_block_height(&self) -> u64 {
        self.burn_block_height
    }

    /// Advance one Stacks block and one burn block
    pub fn mine_block(&mut self) -> u64 {
        self.block_height += 1;
        self.burn_block_height += 1;
        self.block_height
    }

    pub fn call_read_only(
        &self,
        address: &str,
        name: &str,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<ClarityValue, SimnetError> {
        let id = contract_id(address, name);
        let contract = self
            .contracts
            .get(&id)
            .ok_or_else(|| SimnetError::UnknownContract(id.clone()))?;
        check_call(&id, function, args)?;
        if !CounterContract::is_read_only(function) {
            return Err(SimnetError::NotReadOnly(function.to_string()));
        }
        Ok(contract.get_count())
    }

    /// Execute a public function as `sender` in its own block
    pub fn call_public(
        &mut self,
        sender: &str,
        address: &str,
        name: &str,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<CallReceipt, SimnetError> {
        let receipt = self.execute(address, name, function, args)?;
        self.bump_nonce(sender);
        self.mine_block();
        Ok(receipt)
    }

    /// Check the signature, nonce and fee of `tx`, then run its contract
    /// call. Does not mine a block.
    pub fn apply_transaction(&mut self, tx: &StacksTransaction) -> Result<CallReceipt, SimnetError> {
        if tx.version != crate::network::NetworkType::Devnet.transaction_version() {
            return Err(SimnetError::WrongChain(tx.version));
        }
        tx.verify_origin()?;
        let sender = tx
            .origin_address(ADDRESS_VERSION_TESTNET_SINGLESIG)
            .to_string();
        self.check_nonce(&sender, tx.auth.nonce)?;

        let account = self.account(&sender);
        if account.balance < u128::from(tx.auth.fee) {
            return Err(SimnetError::InsufficientBalance {
                address: sender,
                fee: tx.auth.fee,
            });
        }

        let payload = &tx.payload;
        let receipt = self.execute(
            &payload.contract_address.to_string(),
            &payload.contract_name,
            &payload.function_name,
            &payload.function_args,
        )?;

        let entry = self.accounts.entry(sender).or_insert(account);
        entry.balance -= u128::from(tx.auth.fee);
        entry.nonce += 1;
        Ok(receipt)
    }

    /// Reject `nonce` unless it is the sender's next one
    pub fn check_nonce(&self, sender: &str, nonce: u64) -> Result<(), SimnetError> {
        let expected = self.account(sender).nonce;
        if nonce != expected {
            return Err(SimnetError::BadNonce {
                address: sender.to_string(),
                expected,
                actual: nonce,
            });
        }
        Ok(())
    }

    fn execute(
        &mut self,
        address: &str,
        name: &str,
        function: &str,
        args: &[ClarityValue],
    ) -> Result<CallReceipt, SimnetError> {
        let id = contract_id(address, name);
        check_call(&id, function, args)?;
        let contract = self
            .contracts
            .get_mut(&id)
            .ok_or_else(|| SimnetError::UnknownContract(id.clone()))?;

        let mut next = contract.clone();
        let result = match function {
            "increment" => next.increment(),
            "decrement" => next.decrement(),
            _ => next.get_count(),
        };
        let committed = matches!(result, ClarityValue::ResponseOk(_));
        if committed {
            *contract = next;
        }
        log::debug!("{}::{} -> {}", id, function, result);
        Ok(CallReceipt { result, committed })
    }

    fn bump_nonce(&mut self, address: &str) {
        self.accounts
            .entry(address.to_string())
            .or_insert(Account {
                balance: 0,
                nonce: 0,
            })
            .nonce += 1;
    }
}

impl Default for Simnet {
    fn default() -> Self {
        Self::new()
    }
}

fn contract_id(address: &str, name: &str) -> String {
    format!("{}.{}", address, name)
}

fn check_call(id: &str, function: &str, args: &[ClarityValue]) -> Result<(), SimnetError> {
    if !CounterContract::has_function(function) {
        return Err(SimnetError::UnknownFunction {
            contract: id.to_string(),
            function: function.to_string(),
        });
    }
    if !args.is_empty() {
        return Err(SimnetError::ArgumentCount {
            function: function.to_string(),
            given: args.len(),
        });
    }
    Ok(())
}
