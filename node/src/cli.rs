//! # CLI Interface
//!
//! Command-line structure of `nft-market`, built with `clap` derive.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use nftmarket_protocol::config::{CHAIN_ID_DEVNET, DEFAULT_RPC_PORT, DEV_ACCOUNT_COUNT};
use nftmarket_protocol::settings::ENV_NETWORK;

/// NFT market development tooling.
///
/// Runs a local development chain, deploys the NFTMarket contract to any
/// configured network, and submits its source for verification.
#[derive(Parser, Debug)]
#[command(
    name = "nft-market",
    about = "NFT market development node and deployment tool",
    version,
    propagate_version = true
)]
pub struct NftMarketCli {
    /// Settings file (TOML). Defaults to `nft-market.toml` when present.
    #[arg(long, short = 'c', global = true, env = "NFT_MARKET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "NFT_MARKET_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a development chain over JSON-RPC.
    Node(NodeArgs),
    /// Run deploy scripts against a network.
    Deploy(DeployArgs),
    /// Submit a deployed contract's source to the block explorer.
    Verify(VerifyArgs),
    /// List configured networks.
    Networks,
    /// List a network's accounts and balances.
    Accounts(NetworkArg),
    /// Generate a new private key.
    Keygen,
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct NodeArgs {
    /// Interface to bind.
    #[arg(long, env = "NFT_MARKET_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port of the JSON-RPC and status API.
    #[arg(long, short = 'p', env = "NFT_MARKET_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub port: u16,

    /// Port of the Prometheus metrics endpoint.
    #[arg(long, env = "NFT_MARKET_METRICS_PORT", default_value_t = 9545)]
    pub metrics_port: u16,

    /// Chain id reported by the node.
    #[arg(long, default_value_t = CHAIN_ID_DEVNET)]
    pub chain_id: u64,

    /// Number of funded development accounts.
    #[arg(long, default_value_t = DEV_ACCOUNT_COUNT)]
    pub accounts: usize,

    /// Mine a block every N seconds instead of one per transaction.
    #[arg(long)]
    pub block_time: Option<u64>,

    /// Start without running the deploy scripts.
    #[arg(long)]
    pub no_deploy: bool,

    /// Tags of the deploy scripts to run at startup. Empty runs all.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct NetworkArg {
    /// Network name from the settings. Defaults to the configured default.
    #[arg(long, short = 'n', env = ENV_NETWORK)]
    pub network: Option<String>,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub network: NetworkArg,

    /// Only run scripts carrying one of these tags. Empty runs all.
    #[arg(long, short = 't', value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Forget the network's cached deployments first.
    #[arg(long)]
    pub reset: bool,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub network: NetworkArg,

    /// Deployed contract address. Defaults to the cached deployment.
    #[arg(long)]
    pub address: Option<String>,

    /// Artifact name.
    #[arg(long, default_value = "NFTMarket")]
    pub contract: String,

    /// Constructor arguments as a JSON array of tokens, e.g.
    /// `[{"type":"uint","value":"1"}]`.
    #[arg(long, default_value = "[]")]
    pub args: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        NftMarketCli::command().debug_assert();
    }

    #[test]
    fn parses_deploy_tags() {
        let cli = NftMarketCli::parse_from([
            "nft-market",
            "deploy",
            "--network",
            "goerli",
            "--tags",
            "all,nftmarket",
            "--reset",
        ]);
        match cli.command {
            Commands::Deploy(args) => {
                assert_eq!(args.network.network.as_deref(), Some("goerli"));
                assert_eq!(args.tags, vec!["all", "nftmarket"]);
                assert!(args.reset);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn node_defaults() {
        let cli = NftMarketCli::parse_from(["nft-market", "node", "--block-time", "2"]);
        match cli.command {
            Commands::Node(args) => {
                assert_eq!(args.port, DEFAULT_RPC_PORT);
                assert_eq!(args.chain_id, CHAIN_ID_DEVNET);
                assert_eq!(args.block_time, Some(2));
                assert!(!args.no_deploy);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = NftMarketCli::parse_from(["nft-market", "networks", "--log-format", "json"]);
        assert_eq!(cli.log_format, "json");
        assert!(matches!(cli.command, Commands::Networks));
    }
}
