// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NFT Market Contracts
//!
//! The `NFTMarket` contract as it runs on the development chain, and what
//! is needed around it to use it:
//!
//! - **erc721** / **ownable** — the token ledger and access control the
//!   market is built from.
//! - **nft_market** — minting, listing, buying, cancelling, withdrawing.
//! - **events** — constructors of the logs it emits.
//! - **artifacts** — the deployable artifact and its verification source.
//! - **deploy** — the deploy script (tags `all`, `nftmarket`).
//! - **client** — a typed binding over a wallet.
//!
//! Revert reasons are kept byte-for-byte identical to the Solidity
//! contract and OpenZeppelin 4.8, because callers match on them.

pub mod artifacts;
pub mod client;
pub mod deploy;
pub mod erc721;
pub mod events;
pub mod nft_market;
pub mod ownable;

pub use artifacts::{artifacts, NFT_MARKET};
pub use client::NftMarketClient;
pub use deploy::{deploy_scripts, DeployNftMarket};
