//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] assembles an unsigned [`Transaction`]. It does
//! not sign; that happens in [`super::signing`], which keeps construction
//! testable without key material.

use serde::{Deserialize, Serialize};

use super::types::TxKind;
use crate::abi::Token;
use crate::config::{CHAIN_ID_DEVNET, DEFAULT_GAS_PRICE};
use crate::crypto::hash::keccak256;
use crate::types::{quantity, Address, Wei};

/// Gas limit used when the builder is not given one.
pub const DEFAULT_TX_GAS_LIMIT: u64 = 3_000_000;

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An unsigned dev-chain transaction.
///
/// # Canonical Byte Format
///
/// [`Transaction::signable_bytes`] serializes, in order: chain id, sender,
/// nonce, recipient (presence byte + address), value, gas limit, gas price,
/// kind tag, and the kind's payload (name, then the canonical argument list).
/// Integers are big-endian; strings are length-prefixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Replay protection across networks.
    pub chain_id: u64,

    /// The sender. Checked against the address recovered from the signature.
    pub from: Address,

    /// Per-sender sequence number, starting at 0.
    pub nonce: u64,

    /// Recipient or target contract. `None` for contract creation.
    pub to: Option<Address>,

    /// Native value attached, in wei.
    #[serde(with = "quantity")]
    pub value: Wei,

    /// Maximum gas the sender pays for.
    pub gas_limit: u64,

    /// Price per unit of gas, in wei.
    #[serde(with = "quantity")]
    pub gas_price: Wei,

    /// What the transaction does.
    pub kind: TxKind,
}

impl Transaction {
    /// Canonical bytes that signatures and hashes commit to.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(&self.chain_id.to_be_bytes());
        buf.extend_from_slice(self.from.as_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        match &self.to {
            Some(to) => {
                buf.push(1);
                buf.extend_from_slice(to.as_bytes());
            }
            None => buf.push(0),
        }
        buf.extend_from_slice(&self.value.to_be_bytes());
        buf.extend_from_slice(&self.gas_limit.to_be_bytes());
        buf.extend_from_slice(&self.gas_price.to_be_bytes());
        buf.push(self.kind.tag());
        match &self.kind {
            TxKind::Transfer => {}
            TxKind::Deploy { contract: name, args } | TxKind::Call { method: name, args } => {
                buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
                buf.extend_from_slice(name.as_bytes());
                buf.extend_from_slice(&Token::encode_all(args));
            }
        }
        buf
    }

    /// The digest that gets signed: `keccak256(signable_bytes)`.
    pub fn signing_digest(&self) -> [u8; 32] {
        keccak256(&self.signable_bytes())
    }

    /// Worst-case cost to the sender: `value + gas_limit * gas_price`.
    /// `None` on overflow.
    pub fn max_cost(&self) -> Option<Wei> {
        (self.gas_limit as Wei)
            .checked_mul(self.gas_price)
            .and_then(|gas| gas.checked_add(self.value))
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Transaction`].
///
/// ```
/// use nftmarket_protocol::transaction::TransactionBuilder;
/// use nftmarket_protocol::types::Address;
///
/// let tx = TransactionBuilder::new(Address::ZERO)
///     .nonce(3)
///     .call(Address([1; 20]), "mintNFT", vec!["ipfs://token".into()])
///     .build();
/// assert_eq!(tx.nonce, 3);
/// assert_eq!(tx.to, Some(Address([1; 20])));
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    tx: Transaction,
}

impl TransactionBuilder {
    /// Starts a dev-chain transfer from `from` with default gas settings.
    pub fn new(from: Address) -> Self {
        Self {
            tx: Transaction {
                chain_id: CHAIN_ID_DEVNET,
                from,
                nonce: 0,
                to: None,
                value: 0,
                gas_limit: DEFAULT_TX_GAS_LIMIT,
                gas_price: DEFAULT_GAS_PRICE,
                kind: TxKind::Transfer,
            },
        }
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.tx.chain_id = chain_id;
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.tx.nonce = nonce;
        self
    }

    pub fn value(mut self, value: Wei) -> Self {
        self.tx.value = value;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.tx.gas_limit = gas_limit;
        self
    }

    pub fn gas_price(mut self, gas_price: Wei) -> Self {
        self.tx.gas_price = gas_price;
        self
    }

    /// Value transfer to `to`.
    pub fn transfer(mut self, to: Address) -> Self {
        self.tx.to = Some(to);
        self.tx.kind = TxKind::Transfer;
        self
    }

    /// Contract creation from the artifact named `contract`.
    pub fn deploy(mut self, contract: impl Into<String>, args: Vec<Token>) -> Self {
        self.tx.to = None;
        self.tx.kind = TxKind::Deploy {
            contract: contract.into(),
            args,
        };
        self
    }

    /// Method call on the contract at `to`.
    pub fn call(mut self, to: Address, method: impl Into<String>, args: Vec<Token>) -> Self {
        self.tx.to = Some(to);
        self.tx.kind = TxKind::Call {
            method: method.into(),
            args,
        };
        self
    }

    pub fn build(self) -> Transaction {
        self.tx
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
