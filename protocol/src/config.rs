//! # Protocol Configuration & Constants
//!
//! Every fixed number of the tooling lives here: the network table, the
//! development-chain set, the dev chain's defaults, the gas schedule, and
//! the node's ports and timeouts. Runtime, per-network settings (RPC URLs,
//! keys, confirmation counts) are in [`crate::settings`].

use std::time::Duration;

use crate::types::{Wei, WEI_PER_GWEI};

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Goerli testnet.
pub const CHAIN_ID_GOERLI: u64 = 5;

/// The local development chain (in-process or `localhost`).
pub const CHAIN_ID_DEVNET: u64 = 31337;

/// Static chain-id → network-name table.
pub const NETWORK_TABLE: &[(u64, &str)] = &[
    (CHAIN_ID_GOERLI, "goerli"),
    (CHAIN_ID_DEVNET, "hardhat"),
];

/// Networks on which verification is skipped and the test suite runs.
pub const DEVELOPMENT_CHAINS: &[&str] = &["hardhat", "localhost"];

/// Network used when none is selected.
pub const DEFAULT_NETWORK: &str = "hardhat";

/// Name lookup in [`NETWORK_TABLE`].
pub fn network_name(chain_id: u64) -> Option<&'static str> {
    NETWORK_TABLE
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, name)| *name)
}

/// Returns `true` when `name` is one of the [`DEVELOPMENT_CHAINS`].
pub fn is_development_chain(name: &str) -> bool {
    DEVELOPMENT_CHAINS.contains(&name)
}

// ---------------------------------------------------------------------------
// Development Chain
// ---------------------------------------------------------------------------

/// Number of pre-funded development accounts.
pub const DEV_ACCOUNT_COUNT: usize = 10;

/// Balance of each development account, in whole ether.
pub const DEV_ACCOUNT_BALANCE_ETHER: u64 = 10_000;

/// Gas price the dev chain reports and wallets use by default.
pub const DEFAULT_GAS_PRICE: Wei = WEI_PER_GWEI;

/// Per-block gas limit. A transaction may not ask for more.
pub const BLOCK_GAS_LIMIT: u64 = 30_000_000;

/// Genesis timestamp (seconds). Fixed so block hashes are reproducible.
pub const GENESIS_TIMESTAMP: u64 = 1_672_531_200;

/// Seconds added to the timestamp per mined block.
pub const BLOCK_TIME_SECS: u64 = 1;

// ---------------------------------------------------------------------------
// Gas Schedule
// ---------------------------------------------------------------------------

/// Charged for every transaction.
pub const GAS_TX_BASE: u64 = 21_000;

/// Extra charge for contract creation.
pub const GAS_TX_CREATE: u64 = 53_000;

/// Writing a storage slot that was empty.
pub const GAS_STORAGE_WRITE: u64 = 20_000;

/// Overwriting or clearing an occupied slot.
pub const GAS_STORAGE_UPDATE: u64 = 5_000;

/// Reading a slot inside a state-changing call.
pub const GAS_STORAGE_READ: u64 = 2_100;

/// Sending native value out of a contract.
pub const GAS_VALUE_TRANSFER: u64 = 9_000;

/// Base cost of emitting a log.
pub const GAS_LOG: u64 = 375;

/// Per-parameter cost of a log.
pub const GAS_LOG_PARAM: u64 = 375;

/// Estimates are padded by this percentage before being used as a limit.
pub const GAS_ESTIMATE_MARGIN_PERCENT: u64 = 20;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Poll interval while waiting for confirmations.
pub const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default upper bound on waiting for confirmations.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Timeout of a single JSON-RPC or verification HTTP request.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval of the verification status check.
pub const VERIFY_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum number of verification status polls.
pub const VERIFY_MAX_POLLS: u32 = 24;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Default JSON-RPC port, the same one `localhost` points at.
pub const DEFAULT_RPC_PORT: u16 = 8545;

/// Default URL of the `localhost` network.
pub const LOCALHOST_RPC_URL: &str = "http://127.0.0.1:8545";

/// Directory of the deployment cache.
pub const DEFAULT_DEPLOYMENTS_DIR: &str = "deployments";

/// Settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "nft-market.toml";

/// Crate version, reported by `nft-market version` and `/status`.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
