// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NFT Market — Protocol Library
//!
//! Everything the marketplace contract needs around it to be deployed,
//! exercised, and verified: a deterministic development chain, a
//! provider/wallet API that talks to it (in-process or over JSON-RPC), the
//! network table, the deployment pipeline with its on-disk cache, and an
//! Etherscan-style verification client.
//!
//! The chain is not an EVM. Contracts are Rust types behind the
//! [`vm::Contract`] trait, gas follows a fixed schedule, and blocks are mined
//! on demand. What it does reproduce faithfully is the part the deployment
//! and test tooling observes: signed transactions, nonces, balances, gas
//! charged at the effective price, receipts with ordered logs, revert
//! reasons, and confirmation counting.
//!
//! ## Architecture
//!
//! - **types** — `Address`, `H256`, `Wei` and their hex/decimal encodings.
//! - **abi** — `Token`, the value type of contract arguments and results.
//! - **crypto** — keccak-256 and secp256k1 recoverable signatures.
//! - **transaction** — transactions, the builder, signing, receipts.
//! - **vm** — the contract trait, execution environment, gas metering.
//! - **storage** — account state, blocks, the chain, the deployment cache.
//! - **devnet** — the development chain itself.
//! - **provider** / **wallet** — the client-side API.
//! - **rpc** — JSON-RPC wire types shared by the node and `HttpProvider`.
//! - **config** / **settings** — constants, network table, runtime settings.
//! - **deploy** / **verify** — the deployment pipeline and verifier.

pub mod abi;
pub mod config;
pub mod crypto;
pub mod deploy;
pub mod devnet;
pub mod provider;
pub mod rpc;
pub mod settings;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod verify;
pub mod vm;
pub mod wallet;

pub use abi::Token;
pub use devnet::{Devnet, DevnetConfig};
pub use provider::{HttpProvider, LocalProvider, Provider, ProviderError};
pub use types::{Address, Wei, H256};
pub use wallet::{PendingTransaction, TxRequest, Wallet};
