//! # Development Chain
//!
//! A deterministic, single-node chain that runs in process. It plays the
//! part a local Ethereum test network plays for a contract project: ten
//! funded accounts, instant mining, revert reasons, and receipts, with no
//! consensus and no networking.
//!
//! ## Transaction flow
//!
//! ```text
//! send_raw_transaction
//!   ├─ verify_transaction     signature → from, chain id, shape, gas bounds
//!   ├─ nonce / balance        against state (+ pending txs of the sender)
//!   ├─ pending queue
//!   └─ automine? ── mine_block
//!                     └─ for each pending tx:
//!                          buy gas, bump nonce
//!                          execute on a cloned state + cloned contract
//!                          success → commit clones, keep logs
//!                          revert  → drop clones, status = false
//!                          refund unused gas
//! ```
//!
//! A reverted transaction that reaches a block still costs its sender the
//! gas it used and a nonce. Wallets normally never get there: they call
//! [`Devnet::estimate_gas`] first, which dry-runs the call and surfaces the
//! revert reason as [`ChainError::Reverted`].
//!
//! ## Determinism
//!
//! Accounts, genesis, and block timestamps (genesis + one second per block)
//! are fixed, so two fresh devnets fed the same transactions produce the
//! same addresses, hashes, and receipts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::abi::Token;
use crate::config::{
    BLOCK_GAS_LIMIT, BLOCK_TIME_SECS, CHAIN_ID_DEVNET, DEFAULT_GAS_PRICE, DEV_ACCOUNT_BALANCE_ETHER,
    DEV_ACCOUNT_COUNT, GENESIS_TIMESTAMP,
};
use crate::crypto::hash::keccak256_multi;
use crate::crypto::keys::LocalSigner;
use crate::storage::block::{Block, BlockError};
use crate::storage::chain::Chain;
use crate::storage::state::{AccountState, StateError, StateTree};
use crate::transaction::verification::intrinsic_gas;
use crate::transaction::{
    verify_transaction, Log, Receipt, SignedTransaction, TransactionError, TxKind,
};
use crate::types::{ether, quantity, Address, Wei, H256};
use crate::vm::{ArtifactRegistry, CallContext, Contract, Env, ExecResult, GasMeter, Revert};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parameters of a development chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevnetConfig {
    pub chain_id: u64,
    /// Number of funded development accounts (at most ten).
    pub accounts: usize,
    #[serde(with = "quantity")]
    pub account_balance: Wei,
    #[serde(with = "quantity")]
    pub gas_price: Wei,
    pub block_gas_limit: u64,
    /// Mine every accepted transaction immediately.
    pub automine: bool,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            chain_id: CHAIN_ID_DEVNET,
            accounts: DEV_ACCOUNT_COUNT,
            account_balance: ether(DEV_ACCOUNT_BALANCE_ETHER),
            gas_price: DEFAULT_GAS_PRICE,
            block_gas_limit: BLOCK_GAS_LIMIT,
            automine: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why the chain refused or failed a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(transparent)]
    InvalidTransaction(#[from] TransactionError),

    #[error("nonce too low: account {address} expects {expected}, got {actual}")]
    NonceTooLow {
        address: Address,
        expected: u64,
        actual: u64,
    },

    #[error("nonce too high: account {address} expects {expected}, got {actual}")]
    NonceTooHigh {
        address: Address,
        expected: u64,
        actual: u64,
    },

    #[error("insufficient funds for gas * price + value: {address} has {have}, needs {need}")]
    InsufficientFunds { address: Address, have: Wei, need: Wei },

    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    #[error("unknown contract artifact {name}")]
    UnknownArtifact { name: String },

    #[error("transaction {0} already known")]
    AlreadyKnown(H256),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Block(#[from] BlockError),
}

impl From<Revert> for ChainError {
    fn from(revert: Revert) -> Self {
        ChainError::Reverted { reason: revert.0 }
    }
}

// ---------------------------------------------------------------------------
// CallRequest
// ---------------------------------------------------------------------------

/// An unsigned request for [`Devnet::call`] and [`Devnet::estimate_gas`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub from: Address,
    pub to: Option<Address>,
    #[serde(with = "quantity", default)]
    pub value: Wei,
    pub kind: TxKind,
}

impl CallRequest {
    pub fn call(from: Address, to: Address, method: impl Into<String>, args: Vec<Token>) -> Self {
        Self {
            from,
            to: Some(to),
            value: 0,
            kind: TxKind::Call {
                method: method.into(),
                args,
            },
        }
    }

    pub fn deploy(from: Address, contract: impl Into<String>, args: Vec<Token>) -> Self {
        Self {
            from,
            to: None,
            value: 0,
            kind: TxKind::Deploy {
                contract: contract.into(),
                args,
            },
        }
    }

    pub fn transfer(from: Address, to: Address, value: Wei) -> Self {
        Self {
            from,
            to: Some(to),
            value,
            kind: TxKind::Transfer,
        }
    }

    /// Attaches native value.
    pub fn value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}

/// Address of a contract created by `sender` with `nonce`:
/// the last 20 bytes of `keccak256(sender ‖ nonce_be)`.
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    Address::from_digest(&keccak256_multi(&[sender.as_bytes(), &nonce.to_be_bytes()]))
}

/// Result of running a request against some state.
struct Execution {
    output: Token,
    logs: Vec<Log>,
    created: Option<Address>,
    instance: Option<(Address, Box<dyn Contract>)>,
}

// ---------------------------------------------------------------------------
// Devnet
// ---------------------------------------------------------------------------

/// The development chain.
pub struct Devnet {
    config: DevnetConfig,
    artifacts: ArtifactRegistry,
    signers: Vec<LocalSigner>,
    state: StateTree,
    contracts: HashMap<Address, Box<dyn Contract>>,
    chain: Chain,
    pending: Vec<SignedTransaction>,
    timestamp: u64,
}

impl Devnet {
    /// A fresh chain at genesis with the configured accounts funded and
    /// `artifacts` available for deployment.
    pub fn new(config: DevnetConfig, artifacts: ArtifactRegistry) -> Self {
        let signers: Vec<LocalSigner> = LocalSigner::dev_accounts()
            .into_iter()
            .take(config.accounts)
            .collect();

        let mut state = StateTree::new();
        for signer in &signers {
            state.insert(
                signer.address(),
                AccountState::with_balance(config.account_balance),
            );
        }

        let genesis = Block::genesis(state.root_hash());
        tracing::debug!(
            chain_id = config.chain_id,
            accounts = signers.len(),
            genesis = %genesis.hash(),
            "devnet initialised"
        );

        Self {
            config,
            artifacts,
            signers,
            state,
            contracts: HashMap::new(),
            chain: Chain::new(genesis),
            pending: Vec::new(),
            timestamp: GENESIS_TIMESTAMP,
        }
    }

    // -- Queries ------------------------------------------------------------

    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn gas_price(&self) -> Wei {
        self.config.gas_price
    }

    pub fn set_automine(&mut self, automine: bool) {
        self.config.automine = automine;
    }

    pub fn block_number(&self) -> u64 {
        self.chain.head()
    }

    pub fn block(&self, number: u64) -> Option<&Block> {
        self.chain.block(number)
    }

    /// Addresses of the funded development accounts, in index order.
    pub fn accounts(&self) -> Vec<Address> {
        self.signers.iter().map(LocalSigner::address).collect()
    }

    /// The signing keys of the development accounts.
    pub fn signers(&self) -> &[LocalSigner] {
        &self.signers
    }

    pub fn balance(&self, address: &Address) -> Wei {
        self.state.balance(address)
    }

    /// Next nonce for `address`, counting its pending transactions.
    pub fn nonce(&self, address: &Address) -> u64 {
        let pending = self
            .pending
            .iter()
            .filter(|stx| stx.tx.from == *address)
            .count() as u64;
        self.state.nonce(address) + pending
    }

    pub fn code_hash(&self, address: &Address) -> Option<H256> {
        self.state.code_hash(address)
    }

    pub fn receipt(&self, tx_hash: &H256) -> Option<&Receipt> {
        self.chain.receipt(tx_hash)
    }

    pub fn confirmations(&self, tx_hash: &H256) -> Option<u64> {
        self.chain.confirmations(tx_hash)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Overwrites an account balance.
    pub fn set_balance(&mut self, address: Address, balance: Wei) {
        self.state.account_mut(address).balance = balance;
    }

    // -- Transactions -------------------------------------------------------

    /// Admits a signed transaction and, under automine, mines it.
    ///
    /// # Errors
    ///
    /// Admission failures only: invalid signature or shape, wrong chain,
    /// bad nonce, insufficient funds, unknown artifact, duplicate. A revert
    /// during mining is reported in the receipt, not here.
    pub fn send_raw_transaction(&mut self, stx: SignedTransaction) -> Result<H256, ChainError> {
        let hash = stx.hash();
        if self.chain.receipt(&hash).is_some() || self.pending.iter().any(|p| p.hash() == hash) {
            return Err(ChainError::AlreadyKnown(hash));
        }

        let from = verify_transaction(&stx, self.config.chain_id)?;
        let tx = &stx.tx;

        if tx.gas_limit > self.config.block_gas_limit {
            return Err(TransactionError::GasLimitTooHigh {
                limit: tx.gas_limit,
                max: self.config.block_gas_limit,
            }
            .into());
        }

        let expected = self.nonce(&from);
        if tx.nonce < expected {
            return Err(ChainError::NonceTooLow {
                address: from,
                expected,
                actual: tx.nonce,
            });
        }
        if tx.nonce > expected {
            return Err(ChainError::NonceTooHigh {
                address: from,
                expected,
                actual: tx.nonce,
            });
        }

        let have = self.state.balance(&from);
        let need = tx.max_cost().unwrap_or(Wei::MAX);
        if have < need {
            return Err(ChainError::InsufficientFunds {
                address: from,
                have,
                need,
            });
        }

        if let TxKind::Deploy { contract, .. } = &tx.kind {
            if self.artifacts.get(contract).is_none() {
                return Err(ChainError::UnknownArtifact {
                    name: contract.clone(),
                });
            }
        }

        tracing::debug!(tx = %hash, %from, nonce = tx.nonce, kind = %tx.kind, "transaction accepted");
        self.pending.push(stx);

        if self.config.automine {
            self.mine_block()?;
        }
        Ok(hash)
    }

    /// Mines one block holding every pending transaction.
    pub fn mine_block(&mut self) -> Result<&Block, ChainError> {
        let number = self.chain.head() + 1;
        self.timestamp += BLOCK_TIME_SECS;
        let timestamp = self.timestamp;

        let mut receipts = Vec::new();
        for stx in std::mem::take(&mut self.pending) {
            let hash = stx.hash();
            match self.apply(&stx, hash, number, timestamp) {
                Ok(receipt) => receipts.push(receipt),
                Err(err) => {
                    tracing::warn!(tx = %hash, error = %err, "dropping pending transaction")
                }
            }
        }

        let hashes: Vec<H256> = receipts.iter().map(|r| r.tx_hash).collect();
        let block = Block::new(self.chain.tip(), timestamp, self.state.root_hash(), hashes);
        let block_hash = block.hash();
        for receipt in &mut receipts {
            receipt.block_hash = block_hash;
        }

        tracing::debug!(
            number,
            hash = %block_hash,
            txs = receipts.len(),
            "mined block"
        );
        self.chain.append(block, receipts)?;
        Ok(self.chain.tip())
    }

    /// Mines `blocks` blocks and returns the new head.
    pub fn mine(&mut self, blocks: u64) -> Result<u64, ChainError> {
        for _ in 0..blocks {
            self.mine_block()?;
        }
        Ok(self.chain.head())
    }

    /// Executes a pending transaction into the block being built.
    fn apply(
        &mut self,
        stx: &SignedTransaction,
        hash: H256,
        number: u64,
        timestamp: u64,
    ) -> Result<Receipt, ChainError> {
        let tx = &stx.tx;
        let from = tx.from;

        let expected = self.state.nonce(&from);
        if tx.nonce != expected {
            return Err(ChainError::NonceTooLow {
                address: from,
                expected,
                actual: tx.nonce,
            });
        }
        let have = self.state.balance(&from);
        let need = tx.max_cost().unwrap_or(Wei::MAX);
        if have < need {
            return Err(ChainError::InsufficientFunds {
                address: from,
                have,
                need,
            });
        }

        let upfront = tx.gas_limit as Wei * tx.gas_price;
        self.state.debit(from, upfront)?;
        self.state.increment_nonce(from);

        let mut gas = GasMeter::new(tx.gas_limit);
        let mut scratch = self.state.clone();
        let result = self.execute(
            &mut scratch,
            &mut gas,
            from,
            tx.nonce,
            tx.to,
            tx.value,
            &tx.kind,
            number,
            timestamp,
        );

        let (status, logs, contract_address, revert_reason) = match result {
            Ok(exec) => {
                self.state = scratch;
                if let Some((address, instance)) = exec.instance {
                    self.contracts.insert(address, instance);
                }
                (true, exec.logs, exec.created, None)
            }
            Err(revert) => {
                tracing::debug!(tx = %hash, reason = %revert, "transaction reverted");
                (false, Vec::new(), None, Some(revert.0))
            }
        };

        let gas_used = gas.used();
        let refund = (tx.gas_limit - gas_used) as Wei * tx.gas_price;
        self.state.credit(from, refund)?;

        Ok(Receipt {
            tx_hash: hash,
            block_number: number,
            block_hash: H256::ZERO,
            from,
            to: tx.to,
            contract_address,
            gas_used,
            effective_gas_price: tx.gas_price,
            status,
            logs,
            revert_reason,
        })
    }

    /// Runs a request against `state`, reading but never writing the
    /// deployed contracts. Everything it changes is in `state` and in the
    /// returned instance, for the caller to commit or drop.
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        state: &mut StateTree,
        gas: &mut GasMeter,
        from: Address,
        nonce: u64,
        to: Option<Address>,
        value: Wei,
        kind: &TxKind,
        block_number: u64,
        timestamp: u64,
    ) -> ExecResult<Execution> {
        gas.charge(intrinsic_gas(kind))?;

        match kind {
            TxKind::Transfer => {
                let to = to.ok_or_else(|| Revert::new("transfer without recipient"))?;
                if self.contracts.contains_key(&to) {
                    return Err(Revert::new(
                        "function selector was not recognized and there's no fallback function",
                    ));
                }
                state
                    .transfer(from, to, value)
                    .map_err(|e| Revert(e.to_string()))?;
                Ok(Execution {
                    output: Token::void(),
                    logs: Vec::new(),
                    created: None,
                    instance: None,
                })
            }
            TxKind::Deploy { contract, args } => {
                let artifact = self
                    .artifacts
                    .get(contract)
                    .ok_or_else(|| Revert(format!("unknown contract artifact {}", contract)))?;
                let address = contract_address(&from, nonce);
                state
                    .transfer(from, address, value)
                    .map_err(|e| Revert(e.to_string()))?;

                let ctx = CallContext {
                    sender: from,
                    value,
                    this: address,
                    block_number,
                    timestamp,
                };
                let mut env = Env::new(ctx, state, gas);
                let instance = (artifact.constructor)(&mut env, args)?;
                let logs = env.into_logs();
                state.set_code(address, artifact.code_hash());

                Ok(Execution {
                    output: Token::Address(address),
                    logs,
                    created: Some(address),
                    instance: Some((address, instance)),
                })
            }
            TxKind::Call { method, args } => {
                let to = to.ok_or_else(|| Revert::new("call without recipient"))?;
                let mut instance = self
                    .contracts
                    .get(&to)
                    .cloned()
                    .ok_or_else(|| Revert(format!("call to non-contract address {}", to)))?;
                state
                    .transfer(from, to, value)
                    .map_err(|e| Revert(e.to_string()))?;

                let ctx = CallContext {
                    sender: from,
                    value,
                    this: to,
                    block_number,
                    timestamp,
                };
                let mut env = Env::new(ctx, state, gas);
                let output = instance.execute(&mut env, method, args)?;
                let logs = env.into_logs();

                Ok(Execution {
                    output,
                    logs,
                    created: None,
                    instance: Some((to, instance)),
                })
            }
        }
    }

    /// Dry-runs `request` on top of the latest state.
    fn simulate(&self, request: &CallRequest) -> Result<(Execution, u64), ChainError> {
        let mut scratch = self.state.clone();
        let mut gas = GasMeter::new(self.config.block_gas_limit);
        let exec = self.execute(
            &mut scratch,
            &mut gas,
            request.from,
            self.nonce(&request.from),
            request.to,
            request.value,
            &request.kind,
            self.chain.head() + 1,
            self.timestamp + BLOCK_TIME_SECS,
        )?;
        Ok((exec, gas.used()))
    }

    /// Gas `request` would use if mined now.
    ///
    /// # Errors
    ///
    /// [`ChainError::Reverted`] with the reason if it would revert.
    pub fn estimate_gas(&self, request: &CallRequest) -> Result<u64, ChainError> {
        if let TxKind::Deploy { contract, .. } = &request.kind {
            if self.artifacts.get(contract).is_none() {
                return Err(ChainError::UnknownArtifact {
                    name: contract.clone(),
                });
            }
        }
        self.simulate(request).map(|(_, gas)| gas)
    }

    /// Executes `request` without committing anything and returns its
    /// output. Used for view methods.
    pub fn call(&self, request: &CallRequest) -> Result<Token, ChainError> {
        self.simulate(request).map(|(exec, _)| exec.output)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GAS_STORAGE_WRITE, GAS_TX_BASE, GAS_TX_CREATE};
    use crate::transaction::{sign_transaction, TransactionBuilder};
    use crate::vm::testing::COUNTER;

    fn devnet() -> Devnet {
        Devnet::new(
            DevnetConfig::default(),
            ArtifactRegistry::new().with(COUNTER),
        )
    }

    fn send(net: &mut Devnet, builder: TransactionBuilder, signer_index: usize) -> Receipt {
        let signer = net.signers()[signer_index].clone();
        let nonce = net.nonce(&signer.address());
        let tx = builder.nonce(nonce).build();
        let hash = net
            .send_raw_transaction(sign_transaction(tx, &signer).unwrap())
            .unwrap();
        net.receipt(&hash).unwrap().clone()
    }

    fn deploy_counter(net: &mut Devnet) -> Address {
        let from = net.accounts()[0];
        let receipt = send(net, TransactionBuilder::new(from).deploy("Counter", vec![]), 0);
        assert!(receipt.status);
        receipt.contract_address.unwrap()
    }

    // -- Tests ----------------------------------------------------------------

    #[test]
    fn genesis_funds_dev_accounts() {
        let net = devnet();
        assert_eq!(net.block_number(), 0);
        assert_eq!(net.accounts().len(), 10);
        for account in net.accounts() {
            assert_eq!(net.balance(&account), ether(10_000));
        }
    }

    #[test]
    fn two_devnets_are_identical() {
        let a = devnet();
        let b = devnet();
        assert_eq!(a.block(0).unwrap().hash(), b.block(0).unwrap().hash());
    }

    #[test]
    fn deploy_sets_code_and_address() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let address = deploy_counter(&mut net);
        assert_eq!(address, contract_address(&from, 0));
        assert_eq!(net.code_hash(&address), Some(COUNTER.code_hash()));
        assert_eq!(net.block_number(), 1);
        assert_eq!(net.nonce(&from), 1);
    }

    #[test]
    fn transfer_charges_exact_gas() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let to = net.accounts()[1];
        let receipt = send(&mut net, TransactionBuilder::new(from).transfer(to).value(1_000), 0);
        assert!(receipt.status);
        assert_eq!(receipt.gas_used, GAS_TX_BASE);
        assert_eq!(
            net.balance(&from),
            ether(10_000) - 1_000 - receipt.gas_cost()
        );
        assert_eq!(net.balance(&to), ether(10_000) + 1_000);
    }

    #[test]
    fn call_emits_logs_and_changes_state() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);
        let receipt = send(
            &mut net,
            TransactionBuilder::new(from).call(counter, "increment", vec![]),
            0,
        );
        assert!(receipt.status);
        assert_eq!(receipt.gas_used, GAS_TX_BASE + GAS_STORAGE_WRITE + 375 + 375);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].address, counter);

        let count = net
            .call(&CallRequest::call(from, counter, "count", vec![]))
            .unwrap();
        assert_eq!(count, Token::Uint(1));
    }

    #[test]
    fn revert_is_atomic_and_charges_gas() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);
        let before = net.balance(&from);

        let receipt = send(
            &mut net,
            TransactionBuilder::new(from).call(counter, "incrementThenFail", vec![]),
            0,
        );
        assert!(!receipt.status);
        assert_eq!(
            receipt.revert_reason.as_deref(),
            Some("Counter: failed on purpose")
        );
        assert!(receipt.logs.is_empty());
        assert_eq!(net.balance(&from), before - receipt.gas_cost());
        assert_eq!(net.nonce(&from), 2);

        let count = net
            .call(&CallRequest::call(from, counter, "count", vec![]))
            .unwrap();
        assert_eq!(count, Token::Uint(0));
    }

    #[test]
    fn reverted_value_is_returned() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);
        let before = net.balance(&from);
        let receipt = send(
            &mut net,
            TransactionBuilder::new(from)
                .call(counter, "increment", vec![])
                .value(5),
            0,
        );
        assert!(!receipt.status);
        assert_eq!(receipt.revert_reason.as_deref(), Some("non-payable method"));
        assert_eq!(net.balance(&counter), 0);
        assert_eq!(net.balance(&from), before - receipt.gas_cost());
    }

    #[test]
    fn payable_call_credits_contract() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);
        send(
            &mut net,
            TransactionBuilder::new(from)
                .call(counter, "deposit", vec![])
                .value(69),
            0,
        );
        assert_eq!(net.balance(&counter), 69);
    }

    #[test]
    fn estimate_gas_surfaces_revert() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);

        let err = net
            .estimate_gas(&CallRequest::call(
                from,
                counter,
                "add",
                vec![Token::Uint(0)],
            ))
            .unwrap_err();
        assert_eq!(
            err,
            ChainError::Reverted {
                reason: "Counter: zero".into()
            }
        );

        let gas = net
            .estimate_gas(&CallRequest::call(from, counter, "add", vec![Token::Uint(2)]))
            .unwrap();
        assert_eq!(gas, GAS_TX_BASE + 5_000);
    }

    #[test]
    fn estimate_deploy_includes_creation_cost() {
        let net = devnet();
        let from = net.accounts()[0];
        let gas = net
            .estimate_gas(&CallRequest::deploy(from, "Counter", vec![]))
            .unwrap();
        assert_eq!(gas, GAS_TX_BASE + GAS_TX_CREATE);
        assert!(matches!(
            net.estimate_gas(&CallRequest::deploy(from, "Nope", vec![])),
            Err(ChainError::UnknownArtifact { .. })
        ));
    }

    #[test]
    fn nonce_validation() {
        let mut net = devnet();
        let signer = net.signers()[0].clone();
        let from = signer.address();

        let tx = TransactionBuilder::new(from)
            .nonce(1)
            .transfer(Address([1; 20]))
            .build();
        assert!(matches!(
            net.send_raw_transaction(sign_transaction(tx, &signer).unwrap()),
            Err(ChainError::NonceTooHigh {
                expected: 0,
                actual: 1,
                ..
            })
        ));

        send(&mut net, TransactionBuilder::new(from).transfer(Address([1; 20])), 0);
        let stale = TransactionBuilder::new(from)
            .nonce(0)
            .value(2)
            .transfer(Address([1; 20]))
            .build();
        assert!(matches!(
            net.send_raw_transaction(sign_transaction(stale, &signer).unwrap()),
            Err(ChainError::NonceTooLow { .. })
        ));
    }

    #[test]
    fn duplicate_rejected() {
        let mut net = devnet();
        net.set_automine(false);
        let signer = net.signers()[0].clone();
        let tx = TransactionBuilder::new(signer.address())
            .transfer(Address([1; 20]))
            .build();
        let stx = sign_transaction(tx, &signer).unwrap();
        net.send_raw_transaction(stx.clone()).unwrap();
        assert!(matches!(
            net.send_raw_transaction(stx),
            Err(ChainError::AlreadyKnown(_))
        ));
    }

    #[test]
    fn insufficient_funds_rejected() {
        let mut net = devnet();
        let signer = LocalSigner::generate();
        let tx = TransactionBuilder::new(signer.address())
            .transfer(Address([1; 20]))
            .build();
        assert!(matches!(
            net.send_raw_transaction(sign_transaction(tx, &signer).unwrap()),
            Err(ChainError::InsufficientFunds { have: 0, .. })
        ));
    }

    #[test]
    fn wrong_chain_rejected() {
        let mut net = devnet();
        let signer = net.signers()[0].clone();
        let tx = TransactionBuilder::new(signer.address())
            .chain_id(5)
            .transfer(Address([1; 20]))
            .build();
        assert!(matches!(
            net.send_raw_transaction(sign_transaction(tx, &signer).unwrap()),
            Err(ChainError::InvalidTransaction(
                TransactionError::WrongChain { .. }
            ))
        ));
    }

    #[test]
    fn manual_mining_batches_pending() {
        let mut net = devnet();
        net.set_automine(false);
        let signer = net.signers()[0].clone();
        let from = signer.address();
        let mut hashes = Vec::new();
        for nonce in 0..3 {
            let tx = TransactionBuilder::new(from)
                .nonce(nonce)
                .transfer(Address([1; 20]))
                .value(1)
                .build();
            hashes.push(
                net.send_raw_transaction(sign_transaction(tx, &signer).unwrap())
                    .unwrap(),
            );
        }
        assert_eq!(net.pending_count(), 3);
        assert_eq!(net.nonce(&from), 3);
        assert!(net.receipt(&hashes[0]).is_none());

        let block = net.mine_block().unwrap().clone();
        assert_eq!(block.transactions, hashes);
        assert_eq!(net.pending_count(), 0);
        assert_eq!(net.balance(&Address([1; 20])), 3);
    }

    #[test]
    fn confirmations_grow_with_mining() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let receipt = send(&mut net, TransactionBuilder::new(from).transfer(Address([1; 20])), 0);
        assert_eq!(net.confirmations(&receipt.tx_hash), Some(1));
        assert_eq!(net.mine(5).unwrap(), 6);
        assert_eq!(net.confirmations(&receipt.tx_hash), Some(6));
    }

    #[test]
    fn out_of_gas_consumes_limit() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);
        let receipt = send(
            &mut net,
            TransactionBuilder::new(from)
                .call(counter, "increment", vec![])
                .gas_limit(GAS_TX_BASE + 100),
            0,
        );
        assert!(!receipt.status);
        assert_eq!(receipt.revert_reason.as_deref(), Some("out of gas"));
        assert_eq!(receipt.gas_used, GAS_TX_BASE + 100);
    }

    #[test]
    fn transfer_to_contract_reverts() {
        let mut net = devnet();
        let from = net.accounts()[0];
        let counter = deploy_counter(&mut net);
        let receipt = send(&mut net, TransactionBuilder::new(from).transfer(counter).value(1), 0);
        assert!(!receipt.status);
        assert_eq!(net.balance(&counter), 0);
    }
}
