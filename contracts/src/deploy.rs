//! # Deploy Script
//!
//! Deploys `NFTMarket` from the `deployer` named account with no
//! constructor arguments, waiting for the network's confirmation count.
//! Off the development chains, and only when an Etherscan key is
//! configured, the deployment is then submitted for verification. A failed
//! verification is logged and does not fail the deployment.
//!
//! Tags: `all`, `nftmarket`.

use async_trait::async_trait;

use nftmarket_protocol::deploy::{DeployContext, DeployError, DeployOptions, DeployScript};
use nftmarket_protocol::Token;

use crate::nft_market::CONTRACT_NAME;

pub const TAGS: &[&str] = &["all", "nftmarket"];

const OPENING_RULE: &str = "-----------------------------";
const CLOSING_RULE: &str = "------------------------------------";

pub struct DeployNftMarket;

#[async_trait]
impl DeployScript for DeployNftMarket {
    fn name(&self) -> &str {
        "01-deploy-nft-market"
    }

    fn tags(&self) -> &[&'static str] {
        TAGS
    }

    async fn run(&self, ctx: &mut DeployContext) -> Result<(), DeployError> {
        let deployer = ctx.wallet("deployer")?;
        let args: Vec<Token> = Vec::new();
        let confirmations = ctx.network().block_confirmations.max(1);

        tracing::info!("{}", OPENING_RULE);
        let record = ctx
            .deploy(
                CONTRACT_NAME,
                DeployOptions::new(deployer)
                    .args(args.clone())
                    .wait_confirmations(confirmations),
            )
            .await?;

        if !ctx.is_development() && ctx.etherscan_api_key().is_some() {
            tracing::info!("Verifying.....");
            match ctx.verify(CONTRACT_NAME, record.address, args).await {
                Ok(outcome) => tracing::info!(address = %record.address, ?outcome, "verification finished"),
                Err(err) => tracing::warn!(address = %record.address, error = %err, "verification failed"),
            }
        }
        tracing::info!("{}", CLOSING_RULE);
        Ok(())
    }
}

/// The scripts of this crate, in run order.
pub fn deploy_scripts() -> Vec<Box<dyn DeployScript>> {
    vec![Box::new(DeployNftMarket)]
}
