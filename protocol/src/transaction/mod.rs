//! # Transaction Module
//!
//! Construction, signing, verification, and receipts for dev-chain
//! transactions. A transaction either moves value, creates a contract
//! from a registered artifact, or calls a method on a deployed contract.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — TxKind (transfer / deploy / call)
//! builder.rs      — Transaction, its canonical bytes, TransactionBuilder
//! signing.rs      — SignedTransaction, sign_transaction, raw encoding
//! verification.rs — signature / chain-id checks before admission
//! receipt.rs      — Receipt and Log, produced when a tx is mined
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build** with [`TransactionBuilder`] (a [`crate::wallet::Wallet`]
//!    fills nonce, gas price, and gas limit for you).
//! 2. **Sign** with [`sign_transaction`]; the signature commits to the
//!    Keccak-256 of [`Transaction::signable_bytes`].
//! 3. **Send** the raw encoding to a provider.
//! 4. **Verify**: the chain runs [`verify_transaction`], recovering the
//!    sender from the signature.
//! 5. **Receipt** once mined.

pub mod builder;
pub mod receipt;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::{Transaction, TransactionBuilder};
pub use receipt::{Log, LogParam, Receipt};
pub use signing::{sign_transaction, SignedTransaction};
pub use types::TxKind;
pub use verification::{verify_transaction, TransactionError};
