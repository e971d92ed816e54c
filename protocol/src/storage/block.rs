//! # Block Structure
//!
//! Blocks on the dev chain are produced on demand (automine, `mine(n)`, or
//! the node's interval timer). Each links to its parent by hash and commits
//! to the post-state root and the ordered transaction hashes.
//!
//! ## Block Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  BlockHeader                                │
//! │  ├── number: u64                            │
//! │  ├── hash: H256          (keccak of header) │
//! │  ├── parent_hash: H256                      │
//! │  ├── timestamp: u64      (seconds)          │
//! │  ├── state_root: H256                       │
//! │  └── tx_root: H256       (Merkle root)      │
//! ├─────────────────────────────────────────────┤
//! │  transactions: Vec<H256>                    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The hash covers `number ‖ parent_hash ‖ timestamp ‖ state_root ‖ tx_root`.
//! Empty blocks have a zero `tx_root`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GENESIS_TIMESTAMP;
use crate::crypto::hash::{keccak256_multi, merkle_root};
use crate::types::H256;

/// Integrity failures found by [`Block::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error("block {number} hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        number: u64,
        stored: H256,
        computed: H256,
    },

    #[error("block {number} tx_root mismatch")]
    TxRootMismatch { number: u64 },

    #[error("block {number} does not extend {parent}")]
    BadParent { number: u64, parent: u64 },
}

// ---------------------------------------------------------------------------
// BlockHeader
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Genesis is 0.
    pub number: u64,
    pub hash: H256,
    /// Zero for genesis.
    pub parent_hash: H256,
    /// Unix seconds.
    pub timestamp: u64,
    /// State root after this block's transactions.
    pub state_root: H256,
    pub tx_root: H256,
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A mined block: header plus the hashes of its transactions in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<H256>,
}

impl Block {
    /// Block 0 over the given genesis state.
    pub fn genesis(state_root: H256) -> Self {
        Self::assemble(0, H256::ZERO, GENESIS_TIMESTAMP, state_root, Vec::new())
    }

    /// A block extending `parent`.
    pub fn new(parent: &Block, timestamp: u64, state_root: H256, transactions: Vec<H256>) -> Self {
        Self::assemble(
            parent.header.number + 1,
            parent.header.hash,
            timestamp,
            state_root,
            transactions,
        )
    }

    fn assemble(
        number: u64,
        parent_hash: H256,
        timestamp: u64,
        state_root: H256,
        transactions: Vec<H256>,
    ) -> Self {
        let tx_root = compute_tx_root(&transactions);
        let hash = compute_header_hash(number, &parent_hash, timestamp, &state_root, &tx_root);
        Block {
            header: BlockHeader {
                number,
                hash,
                parent_hash,
                timestamp,
                state_root,
                tx_root,
            },
            transactions,
        }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> H256 {
        self.header.hash
    }

    pub fn compute_hash(&self) -> H256 {
        compute_header_hash(
            self.header.number,
            &self.header.parent_hash,
            self.header.timestamp,
            &self.header.state_root,
            &self.header.tx_root,
        )
    }

    /// Checks the stored hash and tx root against the contents.
    pub fn verify(&self) -> Result<(), BlockError> {
        let computed = self.compute_hash();
        if computed != self.header.hash {
            return Err(BlockError::HashMismatch {
                number: self.header.number,
                stored: self.header.hash,
                computed,
            });
        }
        if compute_tx_root(&self.transactions) != self.header.tx_root {
            return Err(BlockError::TxRootMismatch {
                number: self.header.number,
            });
        }
        Ok(())
    }
}

fn compute_header_hash(
    number: u64,
    parent_hash: &H256,
    timestamp: u64,
    state_root: &H256,
    tx_root: &H256,
) -> H256 {
    H256(keccak256_multi(&[
        &number.to_be_bytes(),
        parent_hash.as_bytes(),
        &timestamp.to_be_bytes(),
        state_root.as_bytes(),
        tx_root.as_bytes(),
    ]))
}

/// Merkle root over transaction hashes; zero when there are none.
pub fn compute_tx_root(transactions: &[H256]) -> H256 {
    let leaves: Vec<[u8; 32]> = transactions.iter().map(|h| h.0).collect();
    H256(merkle_root(&leaves))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_shape() {
        let g = Block::genesis(H256([1; 32]));
        assert_eq!(g.number(), 0);
        assert_eq!(g.header.parent_hash, H256::ZERO);
        assert_eq!(g.header.tx_root, H256::ZERO);
        g.verify().unwrap();
    }

    #[test]
    fn child_links_to_parent() {
        let g = Block::genesis(H256::ZERO);
        let b = Block::new(&g, GENESIS_TIMESTAMP + 1, H256([2; 32]), vec![H256([3; 32])]);
        assert_eq!(b.number(), 1);
        assert_eq!(b.header.parent_hash, g.hash());
        assert_ne!(b.header.tx_root, H256::ZERO);
        b.verify().unwrap();
    }

    #[test]
    fn tampering_detected() {
        let g = Block::genesis(H256::ZERO);
        let mut b = Block::new(&g, 5, H256::ZERO, vec![H256([3; 32])]);
        b.transactions.push(H256([4; 32]));
        assert_eq!(b.verify().unwrap_err(), BlockError::TxRootMismatch { number: 1 });

        let mut b = Block::new(&g, 5, H256::ZERO, vec![]);
        b.header.timestamp = 6;
        assert!(matches!(b.verify(), Err(BlockError::HashMismatch { .. })));
    }

    #[test]
    fn genesis_is_reproducible() {
        assert_eq!(Block::genesis(H256::ZERO), Block::genesis(H256::ZERO));
    }
}
