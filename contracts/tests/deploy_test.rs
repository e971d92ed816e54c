//! The `nftmarket` deploy script against development and public-style
//! networks. Public networks are simulated with an in-process chain that
//! carries the public network's name and chain id, so the verification
//! branch runs without leaving the machine.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use nftmarket_contracts::{artifacts, deploy_scripts, NftMarketClient, NFT_MARKET};
use nftmarket_protocol::crypto::keys::DEV_PRIVATE_KEYS;
use nftmarket_protocol::deploy::{run_scripts, DeployContext, DeployError};
use nftmarket_protocol::settings::Settings;
use nftmarket_protocol::storage::DeploymentDb;
use nftmarket_protocol::verify::{VerifyError, VerifyOutcome, VerifyRequest, Verifier};
use nftmarket_protocol::{Devnet, DevnetConfig, LocalProvider, Provider};

#[derive(Default)]
struct RecordingVerifier {
    requests: Mutex<Vec<VerifyRequest>>,
    fail: bool,
}

#[async_trait]
impl Verifier for RecordingVerifier {
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyOutcome, VerifyError> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(VerifyError::Failed("Fail - Unable to verify".into()));
        }
        Ok(VerifyOutcome::Verified)
    }
}

/// `goerli` settings pointed at an in-process chain with chain id 5.
fn goerli(api_key: Option<&str>) -> (Settings, LocalProvider) {
    let mut settings = Settings::builtin();
    let network = settings.networks.get_mut("goerli").unwrap();
    network.accounts = DEV_PRIVATE_KEYS[..2].iter().map(|k| k.to_string()).collect();
    network.block_confirmations = 3;
    let chain_id = network.chain_id;
    if let Some(key) = api_key {
        settings
            .etherscan
            .api_keys
            .insert("goerli".to_string(), key.to_string());
    }
    let config = DevnetConfig {
        chain_id,
        ..DevnetConfig::default()
    };
    (settings, LocalProvider::new(Devnet::new(config, artifacts())))
}

fn context(
    settings: Settings,
    provider: &LocalProvider,
    cache: Option<DeploymentDb>,
    verifier: Arc<RecordingVerifier>,
) -> DeployContext {
    let network = settings.network("goerli").unwrap().clone();
    DeployContext::with_provider(
        settings,
        network,
        Arc::new(provider.clone()),
        artifacts(),
        cache,
    )
    .verifier(Some(verifier as Arc<dyn Verifier>))
}

fn tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn public_network_deploy_waits_and_verifies() {
    let (settings, provider) = goerli(Some("KEY"));
    let verifier = Arc::new(RecordingVerifier::default());
    let mut ctx = context(settings, &provider, None, Arc::clone(&verifier));

    run_scripts(&mut ctx, &deploy_scripts(), &tags(&["nftmarket"]))
        .await
        .unwrap();

    let record = ctx.get("NFTMarket").unwrap().clone();
    assert_eq!(record.confirmations, 3);
    assert_eq!(record.chain_id, 5);
    let head = provider.block_number().await.unwrap();
    assert!(head >= record.block_number + 2);

    let requests = verifier.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].address, record.address);
    assert_eq!(requests[0].contract_name, "NFTMarket");
    assert_eq!(requests[0].source, NFT_MARKET.source);
    assert!(requests[0].constructor_args.is_empty());
}

#[tokio::test]
async fn no_api_key_skips_verification() {
    let (settings, provider) = goerli(None);
    let verifier = Arc::new(RecordingVerifier::default());
    let mut ctx = context(settings, &provider, None, Arc::clone(&verifier));

    run_scripts(&mut ctx, &deploy_scripts(), &tags(&["all"]))
        .await
        .unwrap();
    assert!(ctx.get("NFTMarket").is_some());
    assert!(verifier.requests.lock().is_empty());
}

#[tokio::test]
async fn failed_verification_keeps_the_deployment() {
    let (settings, provider) = goerli(Some("KEY"));
    let verifier = Arc::new(RecordingVerifier {
        fail: true,
        ..Default::default()
    });
    let mut ctx = context(settings, &provider, None, Arc::clone(&verifier));

    run_scripts(&mut ctx, &deploy_scripts(), &tags(&["nftmarket"]))
        .await
        .unwrap();
    assert_eq!(verifier.requests.lock().len(), 1);

    let address = ctx.get("NFTMarket").unwrap().address;
    let wallet = ctx.wallet("deployer").unwrap();
    let market = NftMarketClient::new(address, wallet.clone());
    assert_eq!(market.owner().await.unwrap(), wallet.address());
}

#[tokio::test]
async fn development_network_never_verifies() {
    let mut settings = Settings::builtin();
    settings
        .etherscan
        .api_keys
        .insert("hardhat".to_string(), "KEY".to_string());
    let provider = LocalProvider::new(Devnet::new(DevnetConfig::default(), artifacts()));
    let network = settings.network("hardhat").unwrap().clone();
    let verifier = Arc::new(RecordingVerifier::default());
    let mut ctx = DeployContext::with_provider(
        settings,
        network,
        Arc::new(provider.clone()),
        artifacts(),
        None,
    )
    .verifier(Some(Arc::clone(&verifier) as Arc<dyn Verifier>));

    run_scripts(&mut ctx, &deploy_scripts(), &tags(&[]))
        .await
        .unwrap();
    assert_eq!(ctx.get("NFTMarket").unwrap().confirmations, 1);
    assert!(verifier.requests.lock().is_empty());
}

#[tokio::test]
async fn second_run_reuses_the_cached_deployment() {
    let (settings, provider) = goerli(None);
    let cache = DeploymentDb::open_temporary().unwrap();
    let verifier = Arc::new(RecordingVerifier::default());

    let mut first = context(settings.clone(), &provider, Some(cache.clone()), Arc::clone(&verifier));
    run_scripts(&mut first, &deploy_scripts(), &tags(&["nftmarket"]))
        .await
        .unwrap();
    let deployed = first.get("NFTMarket").unwrap().clone();
    let head = provider.block_number().await.unwrap();

    let mut second = context(settings, &provider, Some(cache.clone()), verifier);
    run_scripts(&mut second, &deploy_scripts(), &tags(&["nftmarket"]))
        .await
        .unwrap();

    assert_eq!(second.get("NFTMarket"), Some(&deployed));
    assert_eq!(provider.block_number().await.unwrap(), head);
    assert_eq!(cache.deployments("goerli").unwrap(), vec![deployed]);
}

#[tokio::test]
async fn unknown_tag_runs_nothing() {
    let (settings, provider) = goerli(None);
    let mut ctx = context(settings, &provider, None, Arc::default());
    let err = run_scripts(&mut ctx, &deploy_scripts(), &tags(&["token"]))
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::NoScripts(ref t) if t == &["token".to_string()]));
    assert!(ctx.deployments().is_empty());
}
