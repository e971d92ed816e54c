//! In-memory chain: ordered blocks and the receipts of their transactions.

use std::collections::HashMap;

use super::block::{Block, BlockError};
use crate::transaction::Receipt;
use crate::types::H256;

/// Ordered chain of blocks, always holding at least genesis.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    receipts: HashMap<H256, Receipt>,
}

impl Chain {
    pub fn new(genesis: Block) -> Self {
        Self {
            blocks: vec![genesis],
            receipts: HashMap::new(),
        }
    }

    /// Appends `block` with the receipts of its transactions.
    ///
    /// # Errors
    ///
    /// [`BlockError::BadParent`] if `block` does not extend the tip, or any
    /// integrity error from [`Block::verify`].
    pub fn append(&mut self, block: Block, receipts: Vec<Receipt>) -> Result<(), BlockError> {
        let tip = self.tip();
        if block.header.parent_hash != tip.hash() || block.number() != tip.number() + 1 {
            return Err(BlockError::BadParent {
                number: block.number(),
                parent: tip.number(),
            });
        }
        block.verify()?;
        for receipt in receipts {
            self.receipts.insert(receipt.tx_hash, receipt);
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn tip(&self) -> &Block {
        // `new` seeds genesis and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Number of the latest block.
    pub fn head(&self) -> u64 {
        self.tip().number()
    }

    pub fn block(&self, number: u64) -> Option<&Block> {
        self.blocks.get(number as usize)
    }

    pub fn receipt(&self, tx_hash: &H256) -> Option<&Receipt> {
        self.receipts.get(tx_hash)
    }

    /// Blocks on top of and including the one that mined `tx_hash`.
    pub fn confirmations(&self, tx_hash: &H256) -> Option<u64> {
        self.receipt(tx_hash)
            .map(|r| self.head().saturating_sub(r.block_number) + 1)
    }

    pub fn transaction_count(&self) -> usize {
        self.receipts.len()
    }
}
