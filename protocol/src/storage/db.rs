//! # DeploymentDb — Deployment Cache
//!
//! On-disk record of what has been deployed where, built on sled's
//! embedded key-value store. The deploy pipeline consults it to reuse an
//! existing deployment and writes to it after a fresh one.
//!
//! ## Tree Layout
//!
//! | Tree          | Key                     | Value                     |
//! |---------------|-------------------------|---------------------------|
//! | `deployments` | `<network>/<contract>`  | `json(DeploymentRecord)`  |
//! | `metadata`    | `<network>/chainId`     | chain id (8B BE)          |
//!
//! ## Chain-id guard
//!
//! A network name is bound to the chain id of its first saved deployment.
//! Saving a record for the same name with a different chain id fails with
//! [`DbError::ChainIdMismatch`] until the network is cleared, so a cache
//! written against one chain is never silently reused on another.
//!
//! ## Atomicity
//!
//! A record and its network's chain id are written in one sled transaction
//! across both trees.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::Path;

use crate::deploy::DeploymentRecord;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(
        "network {network} is bound to chain {stored} in the deployment cache, \
         but the record is for chain {actual}"
    )]
    ChainIdMismatch {
        network: String,
        stored: u64,
        actual: u64,
    },
}

pub type DbResult<T> = Result<T, DbError>;

fn deployment_key(network: &str, contract: &str) -> String {
    format!("{}/{}", network, contract)
}

fn chain_id_key(network: &str) -> String {
    format!("{}/chainId", network)
}

// ---------------------------------------------------------------------------
// DeploymentDb
// ---------------------------------------------------------------------------

/// Persistent deployment cache.
///
/// sled is thread-safe; clones share the same database.
#[derive(Debug, Clone)]
pub struct DeploymentDb {
    db: Db,
    deployments: Tree,
    metadata: Tree,
}

impl DeploymentDb {
    /// Opens or creates the cache at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// An in-memory cache discarded on drop.
    pub fn open_temporary() -> DbResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let deployments = db.open_tree("deployments")?;
        let metadata = db.open_tree("metadata")?;
        Ok(Self {
            db,
            deployments,
            metadata,
        })
    }

    // -- Chain ids ---------------------------------------------------------

    /// Chain id the network is bound to, if any deployment was saved.
    pub fn chain_id(&self, network: &str) -> DbResult<Option<u64>> {
        match self.metadata.get(chain_id_key(network))? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    DbError::Serialization(format!("corrupt chain id for {}", network))
                })?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    // -- Deployments -------------------------------------------------------

    /// Saves `record` under `network`, binding the network to the record's
    /// chain id.
    ///
    /// # Errors
    ///
    /// [`DbError::ChainIdMismatch`] if the network is bound to another chain.
    pub fn put_deployment(&self, network: &str, record: &DeploymentRecord) -> DbResult<()> {
        if let Some(stored) = self.chain_id(network)? {
            if stored != record.chain_id {
                return Err(DbError::ChainIdMismatch {
                    network: network.to_string(),
                    stored,
                    actual: record.chain_id,
                });
            }
        }

        let key = deployment_key(network, &record.contract);
        let value =
            serde_json::to_vec(record).map_err(|e| DbError::Serialization(e.to_string()))?;
        let meta_key = chain_id_key(network);
        let chain_id = record.chain_id.to_be_bytes();

        (&self.deployments, &self.metadata)
            .transaction(|(deployments, metadata)| {
                deployments.insert(key.as_bytes(), value.as_slice())?;
                metadata.insert(meta_key.as_bytes(), &chain_id[..])?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e| match e {
                TransactionError::Storage(err) => DbError::Sled(err),
                TransactionError::Abort(()) => {
                    DbError::Serialization("deployment write aborted".to_string())
                }
            })?;

        self.db.flush()?;
        Ok(())
    }

    /// The saved deployment of `contract` on `network`.
    pub fn get_deployment(
        &self,
        network: &str,
        contract: &str,
    ) -> DbResult<Option<DeploymentRecord>> {
        match self.deployments.get(deployment_key(network, contract))? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| DbError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Every saved deployment on `network`, ordered by contract name.
    pub fn deployments(&self, network: &str) -> DbResult<Vec<DeploymentRecord>> {
        let prefix = format!("{}/", network);
        self.deployments
            .scan_prefix(prefix.as_bytes())
            .map(|entry| {
                let (_, bytes) = entry?;
                serde_json::from_slice(&bytes).map_err(|e| DbError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Forgets the deployment of `contract` on `network`.
    pub fn remove_deployment(&self, network: &str, contract: &str) -> DbResult<bool> {
        Ok(self
            .deployments
            .remove(deployment_key(network, contract))?
            .is_some())
    }

    /// Drops every deployment of `network` and unbinds its chain id.
    /// Returns the number of records removed.
    pub fn clear_network(&self, network: &str) -> DbResult<usize> {
        let prefix = format!("{}/", network);
        let keys: Vec<sled::IVec> = self
            .deployments
            .scan_prefix(prefix.as_bytes())
            .keys()
            .collect::<Result<_, _>>()?;
        for key in &keys {
            self.deployments.remove(key)?;
        }
        self.metadata.remove(chain_id_key(network))?;
        self.db.flush()?;
        Ok(keys.len())
    }

    pub fn deployment_count(&self) -> usize {
        self.deployments.len()
    }

    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
