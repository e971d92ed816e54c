//! # Cryptographic Primitives
//!
//! Hashing and signing for the development chain. Both are the Ethereum
//! choices so that addresses derived here match the ones every wallet
//! derives from the same private key:
//!
//! - **Keccak-256** for transaction, block, and code hashes and for address
//!   derivation.
//! - **secp256k1 recoverable ECDSA** for transaction signatures. The sender
//!   is recovered from the signature rather than trusted from the payload.
//!
//! Everything here is a thin wrapper around `sha3` and `k256`.

pub mod hash;
pub mod keys;

pub use hash::{keccak256, keccak256_multi, merkle_root};
pub use keys::{KeyError, LocalSigner, Signature};
