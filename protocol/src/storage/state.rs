//! # State Management
//!
//! The state tree maps addresses to account states: nonce, balance, and
//! for contract accounts the hash of the code deployed there. Contract
//! storage itself lives inside the contract objects (see [`crate::vm`]);
//! the tree tracks what the chain-level tooling observes.
//!
//! ## Root hash
//!
//! ```text
//! leaves = [ keccak256(address ‖ nonce ‖ balance ‖ code_hash) ] sorted by address
//! root   = merkle_root(leaves)
//! ```
//!
//! Sorting makes the root independent of insertion order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::crypto::hash::{keccak256_multi, merkle_root};
use crate::types::{quantity, Address, Wei, H256};

/// Balance arithmetic failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("insufficient balance for {address}: have {have}, need {need}")]
    InsufficientBalance { address: Address, have: Wei, need: Wei },

    #[error("balance overflow for {address}")]
    Overflow { address: Address },
}

// ---------------------------------------------------------------------------
// AccountState
// ---------------------------------------------------------------------------

/// The chain-level state of a single account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Next expected transaction nonce.
    pub nonce: u64,
    /// Native balance in wei.
    #[serde(with = "quantity")]
    pub balance: Wei,
    /// Hash of the deployed artifact source, for contract accounts.
    pub code_hash: Option<H256>,
}

impl AccountState {
    pub fn with_balance(balance: Wei) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    fn leaf(&self, address: &Address) -> [u8; 32] {
        let code = self.code_hash.unwrap_or(H256::ZERO);
        keccak256_multi(&[
            address.as_bytes(),
            &self.nonce.to_be_bytes(),
            &self.balance.to_be_bytes(),
            code.as_bytes(),
        ])
    }
}

// ---------------------------------------------------------------------------
// StateTree
// ---------------------------------------------------------------------------

/// In-memory account state. Cloned wholesale for atomic execution.
#[derive(Clone, Debug, Default)]
pub struct StateTree {
    accounts: HashMap<Address, AccountState>,
}

impl StateTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    /// Mutable access, creating an empty account on first touch.
    pub fn account_mut(&mut self, address: Address) -> &mut AccountState {
        self.accounts.entry(address).or_default()
    }

    pub fn insert(&mut self, address: Address, state: AccountState) {
        self.accounts.insert(address, state);
    }

    pub fn balance(&self, address: &Address) -> Wei {
        self.get(address).map(|a| a.balance).unwrap_or(0)
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.get(address).map(|a| a.nonce).unwrap_or(0)
    }

    pub fn code_hash(&self, address: &Address) -> Option<H256> {
        self.get(address).and_then(|a| a.code_hash)
    }

    /// Adds `amount` to `address`.
    pub fn credit(&mut self, address: Address, amount: Wei) -> Result<(), StateError> {
        let account = self.account_mut(address);
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(StateError::Overflow { address })?;
        Ok(())
    }

    /// Subtracts `amount` from `address`, failing without change when the
    /// balance is short.
    pub fn debit(&mut self, address: Address, amount: Wei) -> Result<(), StateError> {
        let have = self.balance(&address);
        if have < amount {
            return Err(StateError::InsufficientBalance {
                address,
                have,
                need: amount,
            });
        }
        self.account_mut(address).balance = have - amount;
        Ok(())
    }

    /// Moves `amount` between accounts. A self-transfer is a no-op after
    /// the balance check.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Wei) -> Result<(), StateError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    pub fn increment_nonce(&mut self, address: Address) {
        self.account_mut(address).nonce += 1;
    }

    pub fn set_code(&mut self, address: Address, code_hash: H256) {
        self.account_mut(address).code_hash = Some(code_hash);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Merkle root over all accounts; all zeros for an empty tree.
    pub fn root_hash(&self) -> H256 {
        let sorted: BTreeMap<&Address, &AccountState> = self.accounts.iter().collect();
        let leaves: Vec<[u8; 32]> = sorted
            .iter()
            .map(|(address, account)| account.leaf(address))
            .collect();
        H256(merkle_root(&leaves))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountState)> {
        self.accounts.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
