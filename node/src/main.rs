// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # nft-market
//!
//! Entry point of the `nft-market` binary.
//!
//! - `node`     — serve a development chain over JSON-RPC, deploying the
//!   contracts into it at startup
//! - `deploy`   — run the deploy scripts against a configured network
//! - `verify`   — submit a deployed contract's source to the explorer
//! - `networks` — list configured networks
//! - `accounts` — list a network's accounts and balances
//! - `keygen`   — generate a private key
//! - `version`  — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use nftmarket_contracts::{artifacts, deploy_scripts};
use nftmarket_protocol::config::PROTOCOL_VERSION;
use nftmarket_protocol::crypto::LocalSigner;
use nftmarket_protocol::deploy::{run_scripts, DeployContext, DeploymentRecord};
use nftmarket_protocol::settings::Settings;
use nftmarket_protocol::storage::DeploymentDb;
use nftmarket_protocol::types::format_ether;
use nftmarket_protocol::{Address, Devnet, DevnetConfig, LocalProvider, Provider, Token};

use cli::{Commands, NftMarketCli};
use logging::LogFormat;
use metrics::NodeMetrics;

/// Network whose settings the `node` command deploys with.
const NODE_NETWORK: &str = "localhost";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NftMarketCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.log_format),
    );

    if let Commands::Version = cli.command {
        print_version();
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    match cli.command {
        Commands::Node(args) => run_node(settings, args).await,
        Commands::Deploy(args) => deploy(settings, args).await,
        Commands::Verify(args) => verify(settings, args).await,
        Commands::Networks => {
            print_networks(&settings);
            Ok(())
        }
        Commands::Accounts(args) => accounts(settings, args).await,
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Version => Ok(()),
    }
}

fn network_name(settings: &Settings, arg: &cli::NetworkArg) -> String {
    arg.network
        .clone()
        .unwrap_or_else(|| settings.default_network.clone())
}

fn open_cache(settings: &Settings) -> Result<DeploymentDb> {
    let dir = &settings.deployments_dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create deployments directory {}", dir.display()))?;
    DeploymentDb::open(dir)
        .with_context(|| format!("failed to open deployment cache at {}", dir.display()))
}

// ---------------------------------------------------------------------------
// node
// ---------------------------------------------------------------------------

/// Serves a development chain: API, metrics, and optional interval mining.
async fn run_node(settings: Settings, args: cli::NodeArgs) -> Result<()> {
    let config = DevnetConfig {
        chain_id: args.chain_id,
        accounts: args.accounts,
        automine: args.block_time.is_none(),
        ..DevnetConfig::default()
    };
    let devnet = Arc::new(Mutex::new(Devnet::new(config, artifacts())));
    let mining = match args.block_time {
        Some(secs) => format!("interval {}s", secs),
        None => "automine".to_string(),
    };
    tracing::info!(
        chain_id = args.chain_id,
        accounts = args.accounts,
        %mining,
        "starting development node"
    );

    print_dev_accounts(&devnet.lock());

    if !args.no_deploy {
        deploy_into_node(&settings, Arc::clone(&devnet), &args.tags).await?;
    }

    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.observe_head(devnet.lock().block_number());

    let app_state = api::AppState {
        version: format!("{} (protocol {})", env!("CARGO_PKG_VERSION"), PROTOCOL_VERSION),
        mining,
        devnet: Arc::clone(&devnet),
        metrics: Arc::clone(&node_metrics),
        started_at: chrono::Utc::now(),
    };

    let api_router = api::create_router(app_state);
    let api_addr = format!("{}:{}", args.host, args.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("JSON-RPC server listening on http://{}/rpc", api_addr);

    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("{}:{}", args.host, args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    let miner = args.block_time.map(|secs| {
        let devnet = Arc::clone(&devnet);
        let metrics = Arc::clone(&node_metrics);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs.max(1)));
            interval.tick().await;
            loop {
                interval.tick().await;
                let head = {
                    let mut devnet = devnet.lock();
                    match devnet.mine_block() {
                        Ok(block) => block.header.number,
                        Err(e) => {
                            tracing::error!(error = %e, "interval mining failed");
                            continue;
                        }
                    }
                };
                metrics.observe_head(head);
            }
        })
    });

    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(miner) = miner {
        miner.abort();
    }
    tracing::info!("node stopped");
    Ok(())
}

/// Runs the deploy scripts against the node's own chain with the
/// `localhost` network settings, starting from an empty cache.
async fn deploy_into_node(
    settings: &Settings,
    devnet: Arc<Mutex<Devnet>>,
    tags: &[String],
) -> Result<()> {
    let mut network = settings
        .network(NODE_NETWORK)
        .context("node network is not configured")?
        .clone();
    network.chain_id = devnet.lock().chain_id();

    let cache = if network.save_deployments {
        let cache = open_cache(settings)?;
        let removed = cache
            .clear_network(NODE_NETWORK)
            .context("failed to clear stale deployments")?;
        if removed > 0 {
            tracing::debug!(removed, "cleared cached localhost deployments");
        }
        Some(cache)
    } else {
        None
    };

    let provider: Arc<dyn Provider> = Arc::new(LocalProvider::shared(devnet));
    let mut ctx =
        DeployContext::with_provider(settings.clone(), network, provider, artifacts(), cache);
    run_scripts(&mut ctx, &deploy_scripts(), tags)
        .await
        .context("deploy scripts failed")?;
    print_deployments(ctx.deployments());
    Ok(())
}

fn print_dev_accounts(devnet: &Devnet) {
    println!("Accounts");
    println!("========");
    for (index, signer) in devnet.signers().iter().enumerate() {
        let address = signer.address();
        println!(
            "Account #{}: {} ({} ETH)",
            index,
            address,
            format_ether(devnet.balance(&address))
        );
        println!("Private Key: 0x{}", hex::encode(signer.to_bytes()));
        println!();
    }
    println!("These accounts and their private keys are publicly known.");
    println!("Any funds sent to them on a public network WILL BE LOST.");
    println!();
}

// ---------------------------------------------------------------------------
// deploy
// ---------------------------------------------------------------------------

async fn deploy(settings: Settings, args: cli::DeployArgs) -> Result<()> {
    let network = network_name(&settings, &args.network);
    let cache = open_cache(&settings)?;
    if args.reset {
        let removed = cache
            .clear_network(&network)
            .with_context(|| format!("failed to reset deployments of {}", network))?;
        tracing::info!(%network, removed, "reset cached deployments");
    }

    let mut ctx = DeployContext::connect(settings, &network, artifacts(), Some(cache))
        .await
        .with_context(|| format!("failed to connect to network {}", network))?;
    run_scripts(&mut ctx, &deploy_scripts(), &args.tags)
        .await
        .with_context(|| format!("deployment to {} failed", network))?;
    print_deployments(ctx.deployments());
    Ok(())
}

fn print_deployments(deployments: &BTreeMap<String, DeploymentRecord>) {
    for record in deployments.values() {
        println!(
            "{:<16} {}  block {:<6} tx {}",
            record.contract, record.address, record.block_number, record.tx_hash
        );
    }
}

// ---------------------------------------------------------------------------
// verify
// ---------------------------------------------------------------------------

async fn verify(settings: Settings, args: cli::VerifyArgs) -> Result<()> {
    let network = network_name(&settings, &args.network);
    let constructor_args: Vec<Token> =
        serde_json::from_str(&args.args).context("--args must be a JSON array of tokens")?;
    let cache = open_cache(&settings)?;

    let address: Address = match &args.address {
        Some(address) => address
            .parse()
            .with_context(|| format!("invalid address {}", address))?,
        None => match cache
            .get_deployment(&network, &args.contract)
            .context("failed to read deployment cache")?
        {
            Some(record) => record.address,
            None => bail!(
                "no cached deployment of {} on {}; pass --address",
                args.contract,
                network
            ),
        },
    };

    let ctx = DeployContext::connect(settings, &network, artifacts(), Some(cache))
        .await
        .with_context(|| format!("failed to connect to network {}", network))?;
    let outcome = ctx
        .verify(&args.contract, address, constructor_args)
        .await
        .with_context(|| format!("verification of {} failed", address))?;
    println!("{} at {}: {:?}", args.contract, address, outcome);
    Ok(())
}

// ---------------------------------------------------------------------------
// networks / accounts / keygen / version
// ---------------------------------------------------------------------------

fn print_networks(settings: &Settings) {
    println!(
        "{:<12} {:>8}  {:<5} {:>5}  URL",
        "NETWORK", "CHAIN", "DEV", "CONF"
    );
    for network in settings.networks.values() {
        let marker = if network.name == settings.default_network {
            " (default)"
        } else {
            ""
        };
        println!(
            "{:<12} {:>8}  {:<5} {:>5}  {}{}",
            network.name,
            network.chain_id,
            network.is_development(),
            network.block_confirmations,
            network.url.as_deref().unwrap_or("in-process"),
            marker
        );
    }
}

async fn accounts(settings: Settings, args: cli::NetworkArg) -> Result<()> {
    let network = network_name(&settings, &args);
    let signers = settings
        .network(&network)?
        .signers()
        .with_context(|| format!("invalid accounts for {}", network))?;
    let named: BTreeMap<usize, String> = settings
        .named_accounts
        .iter()
        .map(|(name, index)| (*index, name.clone()))
        .collect();

    let ctx = DeployContext::connect(settings, &network, artifacts(), None)
        .await
        .with_context(|| format!("failed to connect to network {}", network))?;
    for (index, signer) in signers.iter().enumerate() {
        let address = signer.address();
        let balance = ctx
            .provider()
            .balance(address)
            .await
            .with_context(|| format!("failed to read balance of {}", address))?;
        println!(
            "#{:<2} {} {:>24} ETH  {}",
            index,
            address,
            format_ether(balance),
            named.get(&index).map(String::as_str).unwrap_or("")
        );
    }
    Ok(())
}

fn keygen() {
    let signer = LocalSigner::generate();
    println!("Address:     {}", signer.address());
    println!("Private Key: 0x{}", hex::encode(signer.to_bytes()));
}

fn print_version() {
    println!("nft-market {}", env!("CARGO_PKG_VERSION"));
    println!("protocol   {}", PROTOCOL_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
