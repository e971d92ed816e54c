//! # Runtime Settings
//!
//! Per-network settings the deploy pipeline, the verifier and the CLI read:
//! RPC URLs, signing keys, confirmation counts, named accounts and
//! Etherscan keys.
//!
//! ## Layering
//!
//! 1. Built-in defaults for `hardhat`, `localhost` and `goerli`.
//! 2. An optional TOML file (`nft-market.toml` by default).
//! 3. Environment variables: `GOERLI_RPC_URL`, `PRIVATE_KEY`,
//!    `ETHERSCAN_API_KEY`, `MAINNET_RPC_URL`, `NFT_MARKET_NETWORK`.
//!
//! Later layers win. A network defined only in the file must carry its
//! `chain_id`.
//!
//! ```toml
//! default_network = "localhost"
//!
//! [networks.goerli]
//! url = "https://goerli.example/v3/key"
//! block_confirmations = 6
//!
//! [named_accounts]
//! deployer = 0
//! player = 1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{
    is_development_chain, CHAIN_ID_DEVNET, CHAIN_ID_GOERLI, DEFAULT_CONFIG_FILE,
    DEFAULT_DEPLOYMENTS_DIR, DEFAULT_NETWORK, LOCALHOST_RPC_URL,
};
use crate::crypto::keys::{KeyError, LocalSigner};

pub const ENV_GOERLI_RPC_URL: &str = "GOERLI_RPC_URL";
pub const ENV_PRIVATE_KEY: &str = "PRIVATE_KEY";
pub const ENV_ETHERSCAN_API_KEY: &str = "ETHERSCAN_API_KEY";
pub const ENV_MAINNET_RPC_URL: &str = "MAINNET_RPC_URL";
pub const ENV_NETWORK: &str = "NFT_MARKET_NETWORK";

/// Etherscan API endpoint for goerli.
pub const GOERLI_ETHERSCAN_API_URL: &str = "https://api-goerli.etherscan.io/api";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown network {0:?}")]
    UnknownNetwork(String),

    #[error("network {network:?} is not built in and does not set chain_id")]
    MissingChainId { network: String },

    #[error("unknown named account {0:?}")]
    UnknownNamedAccount(String),

    #[error("account #{index} of network {network:?} is not a valid private key: {source}")]
    InvalidAccount {
        network: String,
        index: usize,
        #[source]
        source: KeyError,
    },

    #[error("named account {name:?} is index {index}, but network {network:?} has {available} accounts")]
    AccountOutOfRange {
        name: String,
        network: String,
        index: usize,
        available: usize,
    },
}

// ---------------------------------------------------------------------------
// Settings types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkingSettings {
    pub url: String,
}

/// Settings of one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub name: String,
    pub chain_id: u64,
    /// JSON-RPC endpoint. `None` selects the in-process dev chain.
    pub url: Option<String>,
    /// Hex private keys. Empty on a development chain means the dev accounts.
    pub accounts: Vec<String>,
    pub block_confirmations: u64,
    pub save_deployments: bool,
    /// Recorded only; the dev chain does not fork.
    pub forking: Option<ForkingSettings>,
}

impl NetworkSettings {
    pub fn is_development(&self) -> bool {
        is_development_chain(&self.name)
    }

    /// The network's signing keys, in order.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidAccount`] for a key that does not parse.
    pub fn signers(&self) -> Result<Vec<LocalSigner>, ConfigError> {
        if self.accounts.is_empty() && self.is_development() {
            return Ok(LocalSigner::dev_accounts());
        }
        self.accounts
            .iter()
            .enumerate()
            .map(|(index, key)| {
                LocalSigner::from_hex(key).map_err(|source| ConfigError::InvalidAccount {
                    network: self.name.clone(),
                    index,
                    source,
                })
            })
            .collect()
    }
}

/// Etherscan keys and endpoints, by network name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtherscanSettings {
    #[serde(default)]
    pub api_keys: BTreeMap<String, String>,
    #[serde(default)]
    pub api_urls: BTreeMap<String, String>,
}

/// Everything the tooling is configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub default_network: String,
    pub deployments_dir: PathBuf,
    pub networks: BTreeMap<String, NetworkSettings>,
    pub named_accounts: BTreeMap<String, usize>,
    pub etherscan: EtherscanSettings,
}

// ---------------------------------------------------------------------------
// File layer
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    default_network: Option<String>,
    deployments_dir: Option<PathBuf>,
    #[serde(default)]
    networks: BTreeMap<String, NetworkOverride>,
    #[serde(default)]
    named_accounts: BTreeMap<String, usize>,
    #[serde(default)]
    etherscan: EtherscanSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NetworkOverride {
    chain_id: Option<u64>,
    url: Option<String>,
    accounts: Option<Vec<String>>,
    block_confirmations: Option<u64>,
    save_deployments: Option<bool>,
    forking: Option<ForkingSettings>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Default for Settings {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Settings {
    /// The built-in networks with no file or environment applied.
    pub fn builtin() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            "hardhat".to_string(),
            NetworkSettings {
                name: "hardhat".to_string(),
                chain_id: CHAIN_ID_DEVNET,
                url: None,
                accounts: Vec::new(),
                block_confirmations: 1,
                save_deployments: false,
                forking: None,
            },
        );
        networks.insert(
            "localhost".to_string(),
            NetworkSettings {
                name: "localhost".to_string(),
                chain_id: CHAIN_ID_DEVNET,
                url: Some(LOCALHOST_RPC_URL.to_string()),
                accounts: Vec::new(),
                block_confirmations: 1,
                save_deployments: true,
                forking: None,
            },
        );
        networks.insert(
            "goerli".to_string(),
            NetworkSettings {
                name: "goerli".to_string(),
                chain_id: CHAIN_ID_GOERLI,
                url: None,
                accounts: Vec::new(),
                block_confirmations: 6,
                save_deployments: true,
                forking: None,
            },
        );

        let named_accounts = [("deployer".to_string(), 0), ("player".to_string(), 1)]
            .into_iter()
            .collect();

        let mut etherscan = EtherscanSettings::default();
        etherscan
            .api_urls
            .insert("goerli".to_string(), GOERLI_ETHERSCAN_API_URL.to_string());

        Self {
            default_network: DEFAULT_NETWORK.to_string(),
            deployments_dir: PathBuf::from(DEFAULT_DEPLOYMENTS_DIR),
            networks,
            named_accounts,
            etherscan,
        }
    }

    /// Built-ins, then `path` (or `nft-market.toml` if present), then the
    /// process environment.
    ///
    /// # Errors
    ///
    /// An explicit `path` that cannot be read, or a file that does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = Self::builtin();
        match path {
            Some(path) => settings.apply_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    settings.apply_file(default)?;
                }
            }
        }
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Merges the TOML file at `path` over the current settings.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_toml(&text).map_err(|e| match e {
            FileError::Parse(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            FileError::Config(err) => err,
        })?;
        tracing::debug!(path = %path.display(), "applied settings file");
        Ok(())
    }

    fn apply_toml(&mut self, text: &str) -> Result<(), FileError> {
        let file: FileSettings = toml::from_str(text).map_err(FileError::Parse)?;

        if let Some(network) = file.default_network {
            self.default_network = network;
        }
        if let Some(dir) = file.deployments_dir {
            self.deployments_dir = dir;
        }
        for (name, over) in file.networks {
            let network = match self.networks.remove(&name) {
                Some(existing) => existing,
                None => NetworkSettings {
                    name: name.clone(),
                    chain_id: over.chain_id.ok_or_else(|| {
                        FileError::Config(ConfigError::MissingChainId {
                            network: name.clone(),
                        })
                    })?,
                    url: None,
                    accounts: Vec::new(),
                    block_confirmations: 1,
                    save_deployments: true,
                    forking: None,
                },
            };
            self.networks.insert(name, over.merge(network));
        }
        self.named_accounts.extend(file.named_accounts);
        self.etherscan.api_keys.extend(file.etherscan.api_keys);
        self.etherscan.api_urls.extend(file.etherscan.api_urls);
        Ok(())
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(goerli) = self.networks.get_mut("goerli") {
            if let Some(url) = lookup(ENV_GOERLI_RPC_URL) {
                goerli.url = Some(url);
            }
            if let Some(key) = lookup(ENV_PRIVATE_KEY) {
                goerli.accounts = vec![key];
            }
        }
        if let Some(hardhat) = self.networks.get_mut("hardhat") {
            if let Some(url) = lookup(ENV_MAINNET_RPC_URL) {
                hardhat.forking = Some(ForkingSettings { url });
            }
        }
        if let Some(key) = lookup(ENV_ETHERSCAN_API_KEY) {
            self.etherscan.api_keys.insert("goerli".to_string(), key);
        }
        if let Some(network) = lookup(ENV_NETWORK) {
            self.default_network = network;
        }
    }

    // -- Queries -------------------------------------------------------------

    /// Settings of `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownNetwork`] if no such network is configured.
    pub fn network(&self, name: &str) -> Result<&NetworkSettings, ConfigError> {
        self.networks
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork(name.to_string()))
    }

    /// Account index behind a named account (`deployer`, `player`).
    pub fn named_account(&self, name: &str) -> Result<usize, ConfigError> {
        self.named_accounts
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownNamedAccount(name.to_string()))
    }

    /// The signer of named account `name` on `network`.
    pub fn named_signer(&self, network: &str, name: &str) -> Result<LocalSigner, ConfigError> {
        let settings = self.network(network)?;
        let index = self.named_account(name)?;
        let mut signers = settings.signers()?;
        let available = signers.len();
        if index >= available {
            return Err(ConfigError::AccountOutOfRange {
                name: name.to_string(),
                network: network.to_string(),
                index,
                available,
            });
        }
        Ok(signers.swap_remove(index))
    }

    pub fn etherscan_api_key(&self, network: &str) -> Option<&str> {
        self.etherscan.api_keys.get(network).map(String::as_str)
    }

    pub fn etherscan_api_url(&self, network: &str) -> Option<&str> {
        self.etherscan.api_urls.get(network).map(String::as_str)
    }
}

impl NetworkOverride {
    fn merge(self, mut base: NetworkSettings) -> NetworkSettings {
        if let Some(chain_id) = self.chain_id {
            base.chain_id = chain_id;
        }
        if let Some(url) = self.url {
            base.url = Some(url);
        }
        if let Some(accounts) = self.accounts {
            base.accounts = accounts;
        }
        if let Some(n) = self.block_confirmations {
            base.block_confirmations = n;
        }
        if let Some(save) = self.save_deployments {
            base.save_deployments = save;
        }
        if let Some(forking) = self.forking {
            base.forking = Some(forking);
        }
        base
    }
}

enum FileError {
    Parse(toml::de::Error),
    Config(ConfigError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
