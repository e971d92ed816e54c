//! Deploying to and trading on a node reached over JSON-RPC.
//!
//! The `localhost` network is pointed at an HTTP server that wraps a
//! development chain, the same way `nft-market node` does, so the whole
//! path through `HttpProvider`, the deploy pipeline, and the on-disk cache
//! is exercised.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;

use nftmarket_contracts::{artifacts, deploy_scripts, NftMarketClient};
use nftmarket_protocol::deploy::{run_scripts, DeployContext, DeployError};
use nftmarket_protocol::rpc::{self, RpcRequest, RpcResponse};
use nftmarket_protocol::settings::Settings;
use nftmarket_protocol::storage::DeploymentDb;
use nftmarket_protocol::{Devnet, DevnetConfig, Provider};

async fn serve(devnet: Arc<Mutex<Devnet>>) -> String {
    async fn rpc_handler(
        State(devnet): State<Arc<Mutex<Devnet>>>,
        Json(request): Json<RpcRequest>,
    ) -> Json<RpcResponse> {
        Json(rpc::handle(&devnet, request))
    }

    let app = Router::new()
        .route("/rpc", post(rpc_handler))
        .with_state(devnet);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/rpc", addr)
}

fn localhost(url: &str) -> Settings {
    let mut settings = Settings::builtin();
    settings.networks.get_mut("localhost").unwrap().url = Some(url.to_string());
    settings
}

fn node(chain_id: u64) -> Arc<Mutex<Devnet>> {
    let config = DevnetConfig {
        chain_id,
        ..DevnetConfig::default()
    };
    Arc::new(Mutex::new(Devnet::new(config, artifacts())))
}

#[tokio::test]
async fn deploy_and_trade_over_http() {
    let url = serve(node(31337)).await;
    let dir = tempfile::tempdir().unwrap();
    let cache = DeploymentDb::open(dir.path()).unwrap();

    let mut ctx = DeployContext::connect(localhost(&url), "localhost", artifacts(), Some(cache.clone()))
        .await
        .unwrap();
    run_scripts(&mut ctx, &deploy_scripts(), &["nftmarket".to_string()])
        .await
        .unwrap();
    let record = ctx.get("NFTMarket").unwrap().clone();
    assert_eq!(cache.get_deployment("localhost", "NFTMarket").unwrap(), Some(record.clone()));

    let deployer = ctx.wallet("deployer").unwrap();
    let player = ctx.wallet("player").unwrap();
    let market = NftMarketClient::new(record.address, deployer.clone());

    market.mint_nft("over-http").await.unwrap().wait(1).await.unwrap();
    market.list_nft(0, 1_000).await.unwrap().wait(1).await.unwrap();

    let seller_before = deployer.balance().await.unwrap();
    let err = market.connect(player.clone()).buy_nft(0, 999).await.err().unwrap();
    assert_eq!(err.revert_reason(), Some("NFT Market: Incorrect price"));

    market
        .connect(player.clone())
        .buy_nft(0, 1_000)
        .await
        .unwrap()
        .wait(1)
        .await
        .unwrap();
    assert_eq!(market.owner_of(0).await.unwrap(), player.address());
    assert_eq!(deployer.balance().await.unwrap() - seller_before, 950);
    assert_eq!(market.market_balance().await.unwrap(), 50);
    assert_eq!(market.token_uri(0).await.unwrap(), "over-http");
}

#[tokio::test]
async fn redeploy_reuses_live_contract() {
    let url = serve(node(31337)).await;
    let dir = tempfile::tempdir().unwrap();
    let cache = DeploymentDb::open(dir.path()).unwrap();
    let tags = vec!["all".to_string()];

    let mut first = DeployContext::connect(localhost(&url), "localhost", artifacts(), Some(cache.clone()))
        .await
        .unwrap();
    run_scripts(&mut first, &deploy_scripts(), &tags).await.unwrap();
    let head = first.provider().block_number().await.unwrap();

    let mut second = DeployContext::connect(localhost(&url), "localhost", artifacts(), Some(cache))
        .await
        .unwrap();
    run_scripts(&mut second, &deploy_scripts(), &tags).await.unwrap();

    assert_eq!(second.get("NFTMarket"), first.get("NFTMarket"));
    assert_eq!(second.provider().block_number().await.unwrap(), head);
}

#[tokio::test]
async fn restarted_node_gets_a_fresh_deployment() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DeploymentDb::open(dir.path()).unwrap();
    let tags = vec!["nftmarket".to_string()];

    let url = serve(node(31337)).await;
    let mut first = DeployContext::connect(localhost(&url), "localhost", artifacts(), Some(cache.clone()))
        .await
        .unwrap();
    run_scripts(&mut first, &deploy_scripts(), &tags).await.unwrap();
    let old = first.get("NFTMarket").unwrap().clone();

    // A new chain with the same id: the cached address holds no code.
    let url = serve(node(31337)).await;
    let mut second = DeployContext::connect(localhost(&url), "localhost", artifacts(), Some(cache.clone()))
        .await
        .unwrap();
    run_scripts(&mut second, &deploy_scripts(), &tags).await.unwrap();
    let new = second.get("NFTMarket").unwrap().clone();

    // Same deployer and nonce, so the address repeats; the code is new.
    assert_eq!(new.address, old.address);
    assert_eq!(second.provider().block_number().await.unwrap(), new.block_number);
    assert!(second.provider().code_hash(new.address).await.unwrap().is_some());
    assert_eq!(cache.get_deployment("localhost", "NFTMarket").unwrap(), Some(new));
}

#[tokio::test]
async fn chain_id_mismatch_is_refused() {
    let url = serve(node(1337)).await;
    let err = DeployContext::connect(localhost(&url), "localhost", artifacts(), None)
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        DeployError::ChainIdMismatch {
            configured: 31337,
            actual: 1337,
            ..
        }
    ));
}
