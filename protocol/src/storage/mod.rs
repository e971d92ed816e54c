//! # Storage Module
//!
//! Chain data of the dev chain and the on-disk deployment cache.
//!
//! ## Architecture
//!
//! ```text
//! state.rs — account nonces, balances, code hashes; state root
//! block.rs — block structure, genesis, hash and tx-root checks
//! chain.rs — ordered blocks, receipts, confirmation counting
//! db.rs    — sled deployment cache
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! SignedTransaction → Devnet → StateTree ─┐
//!                        │               ├→ Block → Chain (+ receipts)
//!                        └→ Receipt ─────┘
//!
//! deploy pipeline → DeploymentDb (deployments/, metadata/)
//! ```
//!
//! The chain itself is in memory and starts from genesis on every run; only
//! the deployment cache is persisted.

pub mod block;
pub mod chain;
pub mod db;
pub mod state;

pub use block::{Block, BlockHeader};
pub use chain::Chain;
pub use db::{DbError, DeploymentDb};
pub use state::{AccountState, StateError, StateTree};
