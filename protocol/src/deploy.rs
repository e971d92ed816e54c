//! # Deployment Pipeline
//!
//! Deploy scripts run against a [`DeployContext`]: a connected network,
//! its settings, the artifacts that can be deployed, the deployment cache
//! and, when the network has an Etherscan key, a verifier.
//!
//! ## Deploying
//!
//! [`DeployContext::deploy`] sends the creation transaction, waits for the
//! network's confirmation count, and returns a [`DeploymentRecord`]. Two
//! rules sit around that:
//!
//! - **Reuse.** When the cache holds a record for the same contract on the
//!   same network with the same code hash and arguments, and the address
//!   still has that code on chain, the record is returned and nothing is
//!   sent.
//! - **Persist.** Fresh records are written to the cache when the network
//!   saves deployments. The cache refuses records for a chain id other
//!   than the one the network was first saved with.
//!
//! ## Scripts and tags
//!
//! A [`DeployScript`] declares tags. [`run_scripts`] runs, in order, every
//! script whose tags intersect the requested ones (all of them when none
//! are requested). [`fixture`] does the same on a fresh in-process chain,
//! which is how the test suites get a deployed market.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::abi::Token;
use crate::devnet::{Devnet, DevnetConfig};
use crate::provider::{HttpProvider, LocalProvider, Provider, ProviderError};
use crate::settings::{ConfigError, NetworkSettings, Settings};
use crate::storage::db::{DbError, DeploymentDb};
use crate::types::{Address, H256};
use crate::verify::{EtherscanVerifier, Verifier, VerifyError, VerifyOutcome, VerifyRequest};
use crate::vm::ArtifactRegistry;
use crate::wallet::Wallet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] DbError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("no artifact named {0:?}")]
    UnknownArtifact(String),

    #[error("network {network:?} is configured for chain {configured} but the node reports {actual}")]
    ChainIdMismatch {
        network: String,
        configured: u64,
        actual: u64,
    },

    #[error("creation transaction {0} produced no contract address")]
    MissingContractAddress(H256),

    #[error("no deploy script matches tags {0:?}")]
    NoScripts(Vec<String>),

    #[error("network {0:?} has no verifier configured")]
    NoVerifier(String),
}

// ---------------------------------------------------------------------------
// DeploymentRecord
// ---------------------------------------------------------------------------

/// The outcome of deploying one contract on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub contract: String,
    pub args: Vec<Token>,
    pub address: Address,
    pub tx_hash: H256,
    pub block_number: u64,
    pub deployer: Address,
    pub chain_id: u64,
    /// Confirmations waited for before the record was produced.
    pub confirmations: u64,
    pub code_hash: H256,
    pub deployed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// DeployContext
// ---------------------------------------------------------------------------

/// Options of a single [`DeployContext::deploy`].
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub from: Wallet,
    pub args: Vec<Token>,
    /// Defaults to the network's `block_confirmations`, at least 1.
    pub wait_confirmations: Option<u64>,
}

impl DeployOptions {
    pub fn new(from: Wallet) -> Self {
        Self {
            from,
            args: Vec::new(),
            wait_confirmations: None,
        }
    }

    pub fn args(mut self, args: Vec<Token>) -> Self {
        self.args = args;
        self
    }

    pub fn wait_confirmations(mut self, confirmations: u64) -> Self {
        self.wait_confirmations = Some(confirmations);
        self
    }
}

/// What deploy scripts run against.
pub struct DeployContext {
    settings: Settings,
    network: NetworkSettings,
    provider: Arc<dyn Provider>,
    artifacts: ArtifactRegistry,
    cache: Option<DeploymentDb>,
    verifier: Option<Arc<dyn Verifier>>,
    deployments: BTreeMap<String, DeploymentRecord>,
}

impl DeployContext {
    /// Connects to `network`: the in-process chain when it has no URL, a
    /// JSON-RPC node otherwise. Sets up an Etherscan verifier when the
    /// network has both an API key and an API URL.
    ///
    /// # Errors
    ///
    /// Unknown network, unreachable node, or a node whose chain id differs
    /// from the configured one.
    pub async fn connect(
        settings: Settings,
        network: &str,
        artifacts: ArtifactRegistry,
        cache: Option<DeploymentDb>,
    ) -> Result<Self, DeployError> {
        let network = settings.network(network)?.clone();
        let provider: Arc<dyn Provider> = match &network.url {
            None => {
                let config = DevnetConfig {
                    chain_id: network.chain_id,
                    ..DevnetConfig::default()
                };
                Arc::new(LocalProvider::new(Devnet::new(config, artifacts.clone())))
            }
            Some(url) => Arc::new(HttpProvider::new(url.clone())?),
        };

        let actual = provider.chain_id().await?;
        if actual != network.chain_id {
            return Err(DeployError::ChainIdMismatch {
                network: network.name.clone(),
                configured: network.chain_id,
                actual,
            });
        }

        let verifier: Option<Arc<dyn Verifier>> = match (
            settings.etherscan_api_url(&network.name),
            settings.etherscan_api_key(&network.name),
        ) {
            (Some(url), Some(key)) => Some(Arc::new(EtherscanVerifier::new(url, key)?)),
            _ => None,
        };

        tracing::info!(
            network = %network.name,
            chain_id = actual,
            url = network.url.as_deref().unwrap_or("in-process"),
            "connected"
        );
        Ok(Self::with_provider(settings, network, provider, artifacts, cache).verifier(verifier))
    }

    /// A context over an existing provider. No chain-id check is made.
    pub fn with_provider(
        settings: Settings,
        network: NetworkSettings,
        provider: Arc<dyn Provider>,
        artifacts: ArtifactRegistry,
        cache: Option<DeploymentDb>,
    ) -> Self {
        Self {
            settings,
            network,
            provider,
            artifacts,
            cache,
            verifier: None,
            deployments: BTreeMap::new(),
        }
    }

    /// Replaces the verifier.
    pub fn verifier(mut self, verifier: Option<Arc<dyn Verifier>>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn network(&self) -> &NetworkSettings {
        &self.network
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn is_development(&self) -> bool {
        self.network.is_development()
    }

    pub fn etherscan_api_key(&self) -> Option<&str> {
        self.settings.etherscan_api_key(&self.network.name)
    }

    /// A wallet for named account `name` (`deployer`, `player`).
    pub fn wallet(&self, name: &str) -> Result<Wallet, DeployError> {
        let signer = self.settings.named_signer(&self.network.name, name)?;
        Ok(Wallet::new(signer, Arc::clone(&self.provider)))
    }

    /// Deployments made or reused in this run, by contract name.
    pub fn deployments(&self) -> &BTreeMap<String, DeploymentRecord> {
        &self.deployments
    }

    pub fn get(&self, contract: &str) -> Option<&DeploymentRecord> {
        self.deployments.get(contract)
    }

    pub fn into_deployments(self) -> BTreeMap<String, DeploymentRecord> {
        self.deployments
    }

    /// Deploys `contract`, or reuses a cached deployment of the same code.
    ///
    /// # Errors
    ///
    /// Unknown artifact, a revert or transport failure while deploying, a
    /// confirmation timeout, or a cache write refused by the chain-id guard.
    pub async fn deploy(
        &mut self,
        contract: &str,
        options: DeployOptions,
    ) -> Result<DeploymentRecord, DeployError> {
        let artifact = *self
            .artifacts
            .get(contract)
            .ok_or_else(|| DeployError::UnknownArtifact(contract.to_string()))?;
        let code_hash = artifact.code_hash();

        if let Some(record) = self.reusable(contract, code_hash, &options.args).await? {
            tracing::info!(contract, address = %record.address, "reusing {:?} at {}", contract, record.address);
            self.deployments
                .insert(contract.to_string(), record.clone());
            return Ok(record);
        }

        let confirmations = options
            .wait_confirmations
            .unwrap_or(self.network.block_confirmations)
            .max(1);
        let deployer = options.from.address();
        tracing::info!(contract, %deployer, confirmations, "deploying");

        let pending = options.from.deploy(contract, options.args.clone()).await?;
        let receipt = pending.wait(confirmations).await?;
        let address = receipt
            .contract_address
            .ok_or(DeployError::MissingContractAddress(receipt.tx_hash))?;

        let record = DeploymentRecord {
            contract: contract.to_string(),
            args: options.args,
            address,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            deployer,
            chain_id: self.network.chain_id,
            confirmations,
            code_hash,
            deployed_at: Utc::now(),
        };
        tracing::info!(
            contract,
            %address,
            tx = %record.tx_hash,
            gas_used = receipt.gas_used,
            "deployed {:?} at {}",
            contract,
            address
        );

        if self.network.save_deployments {
            if let Some(cache) = &self.cache {
                cache.put_deployment(&self.network.name, &record)?;
            }
        }
        self.deployments
            .insert(contract.to_string(), record.clone());
        Ok(record)
    }

    async fn reusable(
        &self,
        contract: &str,
        code_hash: H256,
        args: &[Token],
    ) -> Result<Option<DeploymentRecord>, DeployError> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(record) = cache.get_deployment(&self.network.name, contract)? else {
            return Ok(None);
        };
        if record.code_hash != code_hash || record.args != args {
            tracing::debug!(contract, "cached deployment is stale");
            return Ok(None);
        }
        if record.chain_id != self.network.chain_id {
            return Ok(None);
        }
        let on_chain = self.provider.code_hash(record.address).await?;
        if on_chain != Some(code_hash) {
            tracing::debug!(contract, address = %record.address, "cached address has no matching code");
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Submits the source of `contract` at `address` for verification.
    ///
    /// # Errors
    ///
    /// [`DeployError::NoVerifier`] when the network has no Etherscan
    /// settings, or the verifier's error.
    pub async fn verify(
        &self,
        contract: &str,
        address: Address,
        args: Vec<Token>,
    ) -> Result<VerifyOutcome, DeployError> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| DeployError::NoVerifier(self.network.name.clone()))?;
        let artifact = self
            .artifacts
            .get(contract)
            .ok_or_else(|| DeployError::UnknownArtifact(contract.to_string()))?;
        let request = VerifyRequest {
            address,
            contract_name: artifact.name.to_string(),
            source: artifact.source.to_string(),
            constructor_args: args,
        };
        Ok(verifier.verify(&request).await?)
    }
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// One step of a deployment.
#[async_trait]
pub trait DeployScript: Send + Sync {
    fn name(&self) -> &str;

    fn tags(&self) -> &[&'static str];

    async fn run(&self, ctx: &mut DeployContext) -> Result<(), DeployError>;
}

fn selected<'a>(
    scripts: &'a [Box<dyn DeployScript>],
    tags: &[String],
) -> Vec<&'a dyn DeployScript> {
    scripts
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| tags.is_empty() || s.tags().iter().any(|t| tags.iter().any(|w| w == t)))
        .collect()
}

/// Runs every script matching `tags`, in order.
///
/// # Errors
///
/// [`DeployError::NoScripts`] when nothing matches, or the first script
/// failure.
pub async fn run_scripts(
    ctx: &mut DeployContext,
    scripts: &[Box<dyn DeployScript>],
    tags: &[String],
) -> Result<(), DeployError> {
    let chosen = selected(scripts, tags);
    if chosen.is_empty() {
        return Err(DeployError::NoScripts(tags.to_vec()));
    }
    for script in chosen {
        tracing::debug!(script = script.name(), "running deploy script");
        script.run(ctx).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A fresh in-process chain with the tagged scripts already run.
pub struct Fixture {
    pub provider: LocalProvider,
    pub settings: Settings,
    pub deployments: BTreeMap<String, DeploymentRecord>,
}

impl Fixture {
    /// Wallet of named account `name`.
    pub fn wallet(&self, name: &str) -> Result<Wallet, DeployError> {
        let signer = self.settings.named_signer("hardhat", name)?;
        Ok(Wallet::new(signer, Arc::new(self.provider.clone())))
    }

    /// Address of a deployed contract.
    pub fn address(&self, contract: &str) -> Option<Address> {
        self.deployments.get(contract).map(|r| r.address)
    }
}

/// Deploys everything tagged with one of `tags` on a new `hardhat` chain.
pub async fn fixture(
    artifacts: ArtifactRegistry,
    scripts: &[Box<dyn DeployScript>],
    tags: &[&str],
) -> Result<Fixture, DeployError> {
    let settings = Settings::builtin();
    let network = settings.network("hardhat")?.clone();
    let provider = LocalProvider::new(Devnet::new(DevnetConfig::default(), artifacts.clone()));

    let mut ctx = DeployContext::with_provider(
        settings.clone(),
        network,
        Arc::new(provider.clone()),
        artifacts,
        None,
    );
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    run_scripts(&mut ctx, scripts, &tags).await?;

    Ok(Fixture {
        provider,
        settings,
        deployments: ctx.into_deployments(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
