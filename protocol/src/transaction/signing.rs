//! Transaction signing and the raw wire encoding.
//!
//! Signing is separate from building because the key may not be at hand
//! when the transaction is assembled. The signature covers
//! [`Transaction::signing_digest`]; the transaction hash additionally
//! covers the signature, so two signatures over the same payload yield
//! two distinct hashes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builder::Transaction;
use crate::crypto::hash::keccak256_multi;
use crate::crypto::keys::{KeyError, LocalSigner, Signature};
use crate::types::{Address, H256};

/// Errors decoding a raw transaction.
#[derive(Debug, Error)]
pub enum RawTransactionError {
    #[error("raw transaction is not 0x-prefixed hex")]
    Hex,

    #[error("raw transaction payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A transaction together with its sender's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Transaction hash: `keccak256(signable_bytes ‖ signature)`.
    pub fn hash(&self) -> H256 {
        H256(keccak256_multi(&[
            &self.tx.signable_bytes(),
            self.signature.as_bytes(),
        ]))
    }

    /// Address recovered from the signature.
    ///
    /// # Errors
    ///
    /// Propagates [`KeyError`] when the signature cannot be recovered.
    pub fn recover_sender(&self) -> Result<Address, KeyError> {
        self.signature.recover(&self.tx.signing_digest())
    }

    /// Encodes for `market_sendRawTransaction`: `0x` + hex of the JSON form.
    pub fn to_raw(&self) -> String {
        // Serializing plain structs with string keys cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!("0x{}", hex::encode(json))
    }

    /// Decodes the output of [`SignedTransaction::to_raw`].
    pub fn from_raw(raw: &str) -> Result<Self, RawTransactionError> {
        let digits = raw.strip_prefix("0x").ok_or(RawTransactionError::Hex)?;
        let bytes = hex::decode(digits).map_err(|_| RawTransactionError::Hex)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Signs `tx` with `signer`.
///
/// The caller is responsible for `tx.from` matching `signer.address()`;
/// a mismatch is caught by [`super::verify_transaction`] on admission.
///
/// # Example
///
/// ```
/// use nftmarket_protocol::crypto::keys::LocalSigner;
/// use nftmarket_protocol::transaction::{sign_transaction, TransactionBuilder};
///
/// let signer = LocalSigner::generate();
/// let tx = TransactionBuilder::new(signer.address())
///     .deploy("NFTMarket", vec![])
///     .build();
/// let signed = sign_transaction(tx, &signer).unwrap();
/// assert_eq!(signed.recover_sender().unwrap(), signer.address());
/// ```
pub fn sign_transaction(
    tx: Transaction,
    signer: &LocalSigner,
) -> Result<SignedTransaction, KeyError> {
    let signature = signer.sign_digest(&tx.signing_digest())?;
    Ok(SignedTransaction { tx, signature })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
