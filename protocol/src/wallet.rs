//! # Wallet
//!
//! A [`Wallet`] binds a [`LocalSigner`] to a [`Provider`]. Sending a
//! [`TxRequest`] fills in what the caller left out (nonce, gas price, a
//! gas limit from an estimate padded by
//! [`GAS_ESTIMATE_MARGIN_PERCENT`]), signs, submits, and hands back a
//! [`PendingTransaction`].
//!
//! Estimating first means a call that would revert fails before anything
//! is mined, with the contract's reason in
//! [`ProviderError::Reverted`]. A transaction sent with an explicit gas
//! limit skips the estimate and reports a revert from
//! [`PendingTransaction::wait`] instead.

use std::sync::Arc;
use std::time::Duration;

use crate::abi::Token;
use crate::config::{BLOCK_GAS_LIMIT, CONFIRMATION_TIMEOUT, GAS_ESTIMATE_MARGIN_PERCENT};
use crate::crypto::keys::LocalSigner;
use crate::devnet::CallRequest;
use crate::provider::{Provider, ProviderError, ProviderResult};
use crate::transaction::{sign_transaction, Receipt, Transaction, TxKind};
use crate::types::{Address, Wei, H256};

// ---------------------------------------------------------------------------
// TxRequest
// ---------------------------------------------------------------------------

/// A transaction before nonce, gas and signature are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Option<Address>,
    pub value: Wei,
    pub kind: TxKind,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<Wei>,
}

impl TxRequest {
    pub fn deploy(contract: impl Into<String>, args: Vec<Token>) -> Self {
        Self::new(
            None,
            TxKind::Deploy {
                contract: contract.into(),
                args,
            },
        )
    }

    pub fn call(to: Address, method: impl Into<String>, args: Vec<Token>) -> Self {
        Self::new(
            Some(to),
            TxKind::Call {
                method: method.into(),
                args,
            },
        )
    }

    pub fn transfer(to: Address, value: Wei) -> Self {
        Self::new(Some(to), TxKind::Transfer).value(value)
    }

    fn new(to: Option<Address>, kind: TxKind) -> Self {
        Self {
            to,
            value: 0,
            kind,
            gas_limit: None,
            gas_price: None,
        }
    }

    pub fn value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }

    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn gas_price(mut self, gas_price: Wei) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    fn as_call(&self, from: Address) -> CallRequest {
        CallRequest {
            from,
            to: self.to,
            value: self.value,
            kind: self.kind.clone(),
        }
    }
}

/// Pads a gas estimate, never past the block gas limit.
pub fn padded_gas_limit(estimate: u64) -> u64 {
    let padded = estimate.saturating_mul(100 + GAS_ESTIMATE_MARGIN_PERCENT) / 100;
    padded.min(BLOCK_GAS_LIMIT)
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// A signing key connected to a chain.
#[derive(Clone)]
pub struct Wallet {
    signer: LocalSigner,
    provider: Arc<dyn Provider>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.signer.address())
            .finish()
    }
}

impl Wallet {
    pub fn new(signer: LocalSigner, provider: Arc<dyn Provider>) -> Self {
        Self { signer, provider }
    }

    /// The same provider with another key, like `contract.connect(player)`.
    pub fn connect(&self, signer: LocalSigner) -> Self {
        Self::new(signer, Arc::clone(&self.provider))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &LocalSigner {
        &self.signer
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub async fn balance(&self) -> ProviderResult<Wei> {
        self.provider.balance(self.address()).await
    }

    /// Fills, signs and submits `request`.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Reverted`] if the gas estimate reverts, or whatever
    /// the provider reports on submission.
    pub async fn send(&self, request: TxRequest) -> ProviderResult<PendingTransaction> {
        let from = self.address();
        let chain_id = self.provider.chain_id().await?;
        let nonce = self.provider.nonce(from).await?;
        let gas_price = match request.gas_price {
            Some(price) => price,
            None => self.provider.gas_price().await?,
        };
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = self.provider.estimate_gas(&request.as_call(from)).await?;
                padded_gas_limit(estimate)
            }
        };

        let tx = Transaction {
            chain_id,
            from,
            nonce,
            to: request.to,
            value: request.value,
            gas_limit,
            gas_price,
            kind: request.kind,
        };
        tracing::debug!(%from, nonce, gas_limit, kind = %tx.kind, "sending transaction");

        let signed = sign_transaction(tx, &self.signer)
            .map_err(|e| ProviderError::Transport(format!("signing failed: {}", e)))?;
        let hash = self.provider.send_raw_transaction(&signed).await?;
        Ok(PendingTransaction {
            hash,
            provider: Arc::clone(&self.provider),
        })
    }

    pub async fn deploy(
        &self,
        contract: &str,
        args: Vec<Token>,
    ) -> ProviderResult<PendingTransaction> {
        self.send(TxRequest::deploy(contract, args)).await
    }

    /// A state-changing call to `method` on the contract at `to`.
    pub async fn call(
        &self,
        to: Address,
        method: &str,
        args: Vec<Token>,
    ) -> ProviderResult<PendingTransaction> {
        self.send(TxRequest::call(to, method, args)).await
    }

    pub async fn transfer(&self, to: Address, value: Wei) -> ProviderResult<PendingTransaction> {
        self.send(TxRequest::transfer(to, value)).await
    }

    /// A read-only call from this wallet's address.
    pub async fn read(&self, to: Address, method: &str, args: Vec<Token>) -> ProviderResult<Token> {
        let request = CallRequest::call(self.address(), to, method, args);
        self.provider.call(&request).await
    }
}

// ---------------------------------------------------------------------------
// PendingTransaction
// ---------------------------------------------------------------------------

/// A submitted transaction.
#[derive(Clone)]
pub struct PendingTransaction {
    hash: H256,
    provider: Arc<dyn Provider>,
}

impl PendingTransaction {
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Waits for `confirmations` blocks with the default timeout.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Reverted`] if the transaction was mined but failed.
    pub async fn wait(&self, confirmations: u64) -> ProviderResult<Receipt> {
        self.wait_with_timeout(confirmations, CONFIRMATION_TIMEOUT)
            .await
    }

    pub async fn wait_with_timeout(
        &self,
        confirmations: u64,
        timeout: Duration,
    ) -> ProviderResult<Receipt> {
        let receipt = self
            .provider
            .wait_for_confirmations(self.hash, confirmations, timeout)
            .await?;
        if !receipt.status {
            return Err(ProviderError::Reverted {
                reason: receipt
                    .revert_reason
                    .unwrap_or_else(|| "transaction reverted".to_string()),
            });
        }
        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devnet::{Devnet, DevnetConfig};
    use crate::provider::LocalProvider;
    use crate::types::ether;
    use crate::vm::testing::COUNTER;
    use crate::vm::ArtifactRegistry;

    fn wallets() -> (Wallet, Wallet) {
        let provider = LocalProvider::new(Devnet::new(
            DevnetConfig::default(),
            ArtifactRegistry::new().with(COUNTER),
        ));
        let signers = provider.signers();
        let deployer = Wallet::new(signers[0].clone(), Arc::new(provider));
        let player = deployer.connect(signers[1].clone());
        (deployer, player)
    }

    async fn deploy_counter(wallet: &Wallet) -> Address {
        let receipt = wallet
            .deploy("Counter", vec![])
            .await
            .unwrap()
            .wait(1)
            .await
            .unwrap();
        receipt.contract_address.unwrap()
    }

    #[test]
    fn gas_padding_is_capped() {
        assert_eq!(padded_gas_limit(100_000), 120_000);
        assert_eq!(padded_gas_limit(BLOCK_GAS_LIMIT), BLOCK_GAS_LIMIT);
    }

    #[tokio::test]
    async fn deploy_and_call() {
        let (deployer, player) = wallets();
        let counter = deploy_counter(&deployer).await;

        let receipt = player
            .call(counter, "increment", vec![])
            .await
            .unwrap()
            .wait(1)
            .await
            .unwrap();
        assert_eq!(receipt.from, player.address());
        assert_eq!(receipt.events("Incremented").count(), 1);

        let count = deployer.read(counter, "count", vec![]).await.unwrap();
        assert_eq!(count.as_uint(), Some(1));
    }

    #[tokio::test]
    async fn reverting_call_fails_at_estimate() {
        let (deployer, _) = wallets();
        let counter = deploy_counter(&deployer).await;
        let head = deployer.provider().block_number().await.unwrap();

        let err = deployer
            .call(counter, "add", vec![Token::Uint(0)])
            .await
            .err()
            .unwrap();
        assert_eq!(err.revert_reason(), Some("Counter: zero"));
        // Nothing was mined.
        assert_eq!(deployer.provider().block_number().await.unwrap(), head);
    }

    #[tokio::test]
    async fn explicit_gas_limit_reverts_on_wait() {
        let (deployer, _) = wallets();
        let counter = deploy_counter(&deployer).await;

        let pending = deployer
            .send(TxRequest::call(counter, "add", vec![Token::Uint(0)]).gas_limit(100_000))
            .await
            .unwrap();
        let err = pending.wait(1).await.unwrap_err();
        assert_eq!(err.revert_reason(), Some("Counter: zero"));
    }

    #[tokio::test]
    async fn transfer_moves_value() {
        let (deployer, player) = wallets();
        let receipt = deployer
            .transfer(player.address(), ether(1))
            .await
            .unwrap()
            .wait(1)
            .await
            .unwrap();
        assert!(receipt.status);
        assert_eq!(player.balance().await.unwrap(), ether(10_001));
        assert_eq!(
            deployer.balance().await.unwrap(),
            ether(9_999) - receipt.gas_cost()
        );
    }

    #[tokio::test]
    async fn wait_counts_confirmations() {
        let (deployer, player) = wallets();
        let pending = deployer.transfer(player.address(), 1).await.unwrap();
        let receipt = pending.wait(3).await.unwrap();
        assert_eq!(
            deployer.provider().block_number().await.unwrap(),
            receipt.block_number + 2
        );
    }
}
