//! The execution environment handed to contracts.

use super::{require, ExecResult, Revert};
use crate::config::{
    GAS_LOG, GAS_LOG_PARAM, GAS_STORAGE_READ, GAS_STORAGE_UPDATE, GAS_STORAGE_WRITE,
    GAS_VALUE_TRANSFER,
};
use crate::storage::state::StateTree;
use crate::transaction::Log;
use crate::types::{Address, Wei};

/// Who is calling, with how much value, at which block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// `msg.sender`.
    pub sender: Address,
    /// `msg.value`, already credited to `this` when execution starts.
    pub value: Wei,
    /// Address of the executing contract.
    pub this: Address,
    pub block_number: u64,
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// GasMeter
// ---------------------------------------------------------------------------

/// Tracks gas against a limit.
///
/// Running out consumes the whole limit, as on Ethereum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charges `amount`, reverting with `out of gas` past the limit.
    pub fn charge(&mut self, amount: u64) -> ExecResult<()> {
        match self.used.checked_add(amount) {
            Some(total) if total <= self.limit => {
                self.used = total;
                Ok(())
            }
            _ => {
                self.used = self.limit;
                Err(Revert::new("out of gas"))
            }
        }
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}

// ---------------------------------------------------------------------------
// Env
// ---------------------------------------------------------------------------

/// A contract's window on the chain for the duration of one call.
pub struct Env<'a> {
    ctx: CallContext,
    state: &'a mut StateTree,
    gas: &'a mut GasMeter,
    logs: Vec<Log>,
}

impl<'a> Env<'a> {
    pub fn new(ctx: CallContext, state: &'a mut StateTree, gas: &'a mut GasMeter) -> Self {
        Self {
            ctx,
            state,
            gas,
            logs: Vec::new(),
        }
    }

    pub fn sender(&self) -> Address {
        self.ctx.sender
    }

    pub fn value(&self) -> Wei {
        self.ctx.value
    }

    pub fn this(&self) -> Address {
        self.ctx.this
    }

    pub fn block_number(&self) -> u64 {
        self.ctx.block_number
    }

    pub fn timestamp(&self) -> u64 {
        self.ctx.timestamp
    }

    /// Native balance of any account.
    pub fn balance_of(&self, address: &Address) -> Wei {
        self.state.balance(address)
    }

    /// Reverts with `non-payable method` when value was attached.
    pub fn non_payable(&self) -> ExecResult<()> {
        require(self.ctx.value == 0, "non-payable method")
    }

    /// Charges arbitrary gas.
    pub fn charge(&mut self, gas: u64) -> ExecResult<()> {
        self.gas.charge(gas)
    }

    /// Charges a read of a storage slot.
    pub fn sload(&mut self) -> ExecResult<()> {
        self.gas.charge(GAS_STORAGE_READ)
    }

    /// Charges a write to a slot: the full price when the slot was empty,
    /// the update price otherwise.
    pub fn sstore(&mut self, was_empty: bool) -> ExecResult<()> {
        let cost = if was_empty {
            GAS_STORAGE_WRITE
        } else {
            GAS_STORAGE_UPDATE
        };
        self.gas.charge(cost)
    }

    /// Sends `amount` of the contract's own balance to `to`.
    pub fn transfer(&mut self, to: Address, amount: Wei) -> ExecResult<()> {
        self.gas.charge(GAS_VALUE_TRANSFER)?;
        self.state
            .transfer(self.ctx.this, to, amount)
            .map_err(|_| Revert::new("Address: insufficient balance"))
    }

    /// Records an event. Logs of a reverted call are discarded.
    pub fn emit(&mut self, log: Log) -> ExecResult<()> {
        self.gas
            .charge(GAS_LOG + GAS_LOG_PARAM * log.params.len() as u64)?;
        self.logs.push(log);
        Ok(())
    }

    /// Logs emitted so far, in order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn into_logs(self) -> Vec<Log> {
        self.logs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
