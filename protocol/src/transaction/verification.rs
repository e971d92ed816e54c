//! Stateless admission checks for signed transactions.
//!
//! [`verify_transaction`] runs everything that does not need account
//! state: signature recovery, chain id, shape of the kind, and gas bounds.
//! Nonce and balance checks need state and live in the dev chain.

use thiserror::Error;

use super::signing::SignedTransaction;
use super::types::TxKind;
use crate::config::{BLOCK_GAS_LIMIT, GAS_TX_BASE, GAS_TX_CREATE};
use crate::crypto::keys::KeyError;
use crate::types::Address;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A signed transaction failed an admission check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The signature could not be decoded or recovered.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] KeyError),

    /// The recovered signer differs from the `from` field.
    #[error("signature recovers {recovered}, transaction claims {claimed}")]
    SenderMismatch { claimed: Address, recovered: Address },

    /// Signed for a different network.
    #[error("invalid chain id: expected {expected}, got {actual}")]
    WrongChain { expected: u64, actual: u64 },

    /// A creation transaction carries a recipient.
    #[error("contract creation must not have a recipient")]
    DeployWithRecipient,

    /// A transfer or call has no recipient.
    #[error("{kind} requires a recipient")]
    MissingRecipient { kind: &'static str },

    /// Gas limit above the block gas limit.
    #[error("gas limit {limit} exceeds block gas limit {max}")]
    GasLimitTooHigh { limit: u64, max: u64 },

    /// Gas limit below the intrinsic cost.
    #[error("intrinsic gas too low: limit {limit}, required {required}")]
    IntrinsicGasTooLow { limit: u64, required: u64 },
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Gas charged before any execution: the base cost, plus the creation
/// surcharge for deployments.
pub fn intrinsic_gas(kind: &TxKind) -> u64 {
    match kind {
        TxKind::Deploy { .. } => GAS_TX_BASE + GAS_TX_CREATE,
        _ => GAS_TX_BASE,
    }
}

/// Verifies `stx` for admission to a chain with id `chain_id` and returns
/// the recovered sender.
///
/// The checks, in order:
///
/// 1. **Signature**: recovers, and recovers to `tx.from`.
/// 2. **Chain id**: equals `chain_id`.
/// 3. **Shape**: creation has no recipient; transfers and calls have one.
/// 4. **Gas**: intrinsic cost ≤ limit ≤ block gas limit.
///
/// # Errors
///
/// The first failing check as a [`TransactionError`].
pub fn verify_transaction(
    stx: &SignedTransaction,
    chain_id: u64,
) -> Result<Address, TransactionError> {
    let tx = &stx.tx;

    let recovered = stx.recover_sender()?;
    if recovered != tx.from {
        return Err(TransactionError::SenderMismatch {
            claimed: tx.from,
            recovered,
        });
    }

    if tx.chain_id != chain_id {
        return Err(TransactionError::WrongChain {
            expected: chain_id,
            actual: tx.chain_id,
        });
    }

    match (&tx.kind, tx.to) {
        (TxKind::Deploy { .. }, Some(_)) => return Err(TransactionError::DeployWithRecipient),
        (TxKind::Transfer, None) => {
            return Err(TransactionError::MissingRecipient { kind: "transfer" })
        }
        (TxKind::Call { .. }, None) => {
            return Err(TransactionError::MissingRecipient { kind: "call" })
        }
        _ => {}
    }

    if tx.gas_limit > BLOCK_GAS_LIMIT {
        return Err(TransactionError::GasLimitTooHigh {
            limit: tx.gas_limit,
            max: BLOCK_GAS_LIMIT,
        });
    }
    let required = intrinsic_gas(&tx.kind);
    if tx.gas_limit < required {
        return Err(TransactionError::IntrinsicGasTooLow {
            limit: tx.gas_limit,
            required,
        });
    }

    Ok(recovered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
