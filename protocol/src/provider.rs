//! # Providers
//!
//! A [`Provider`] is read and submit access to a chain. Scripts and tests
//! are written against the trait and run unchanged on:
//!
//! - [`LocalProvider`]: the in-process dev chain (the `hardhat` network).
//!   Waiting for confirmations mines empty blocks instead of sleeping.
//! - [`HttpProvider`]: a JSON-RPC client of `nft-market node` (the
//!   `localhost` network, or any network whose URL serves the same
//!   dialect).
//!
//! ## Errors
//!
//! Every failure is a [`ProviderError`]. Reverts are normalized to
//! [`ProviderError::Reverted`] whichever side produced them, so callers
//! match on one variant to assert a revert reason.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::abi::Token;
use crate::config::{CONFIRMATION_POLL_INTERVAL, HTTP_REQUEST_TIMEOUT};
use crate::crypto::keys::LocalSigner;
use crate::devnet::{CallRequest, ChainError, Devnet};
use crate::rpc::{self, RpcRequest, RpcResponse};
use crate::transaction::{Receipt, SignedTransaction};
use crate::types::{Address, Wei, H256};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The chain refused the request.
    #[error(transparent)]
    Chain(ChainError),

    /// Execution reverted with `reason`.
    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    /// The HTTP request failed or the response was not valid JSON-RPC.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("timed out waiting for {confirmations} confirmations of {hash}")]
    Timeout { hash: H256, confirmations: u64 },

    #[error("unknown transaction {0}")]
    UnknownTransaction(H256),

    /// A call returned a value of the wrong shape.
    #[error("unexpected return value from {method}: {value}")]
    Decode { method: String, value: Token },
}

impl ProviderError {
    /// The revert reason, when this error is a revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            ProviderError::Reverted { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<ChainError> for ProviderError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Reverted { reason } => ProviderError::Reverted { reason },
            other => ProviderError::Chain(other),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Transport(err.to_string())
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Provider: Send + Sync {
    async fn chain_id(&self) -> ProviderResult<u64>;

    async fn block_number(&self) -> ProviderResult<u64>;

    /// Accounts the chain holds keys for (the dev accounts).
    async fn accounts(&self) -> ProviderResult<Vec<Address>>;

    async fn balance(&self, address: Address) -> ProviderResult<Wei>;

    /// Next nonce, including pending transactions.
    async fn nonce(&self, address: Address) -> ProviderResult<u64>;

    async fn gas_price(&self) -> ProviderResult<Wei>;

    /// Code hash at `address`, `None` for accounts without code.
    async fn code_hash(&self, address: Address) -> ProviderResult<Option<H256>>;

    /// # Errors
    ///
    /// [`ProviderError::Reverted`] if the request would revert.
    async fn estimate_gas(&self, request: &CallRequest) -> ProviderResult<u64>;

    async fn send_raw_transaction(&self, stx: &SignedTransaction) -> ProviderResult<H256>;

    /// Receipt of a mined transaction, `None` while pending or unknown.
    async fn receipt(&self, hash: H256) -> ProviderResult<Option<Receipt>>;

    /// Read-only execution; nothing is committed.
    async fn call(&self, request: &CallRequest) -> ProviderResult<Token>;

    /// Mines `blocks` blocks and returns the new head.
    async fn mine(&self, blocks: u64) -> ProviderResult<u64>;

    /// Waits until `hash` has at least `confirmations` confirmations
    /// (the inclusion block counts as one) and returns its receipt.
    ///
    /// The default polls [`Provider::receipt`] and
    /// [`Provider::block_number`] every
    /// [`CONFIRMATION_POLL_INTERVAL`](crate::config::CONFIRMATION_POLL_INTERVAL).
    ///
    /// # Errors
    ///
    /// [`ProviderError::Timeout`] if `timeout` elapses first.
    async fn wait_for_confirmations(
        &self,
        hash: H256,
        confirmations: u64,
        timeout: Duration,
    ) -> ProviderResult<Receipt> {
        let wanted = confirmations.max(1);
        let poll = async {
            loop {
                if let Some(receipt) = self.receipt(hash).await? {
                    let head = self.block_number().await?;
                    if head.saturating_sub(receipt.block_number) + 1 >= wanted {
                        return Ok(receipt);
                    }
                }
                tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ProviderError::Timeout {
                hash,
                confirmations: wanted,
            })?
    }
}

// ---------------------------------------------------------------------------
// LocalProvider
// ---------------------------------------------------------------------------

/// Provider over an in-process [`Devnet`]. Clones share the chain.
#[derive(Clone)]
pub struct LocalProvider {
    devnet: Arc<Mutex<Devnet>>,
}

impl LocalProvider {
    pub fn new(devnet: Devnet) -> Self {
        Self::shared(Arc::new(Mutex::new(devnet)))
    }

    /// Wraps a chain that other components (the node's RPC server) also use.
    pub fn shared(devnet: Arc<Mutex<Devnet>>) -> Self {
        Self { devnet }
    }

    pub fn devnet(&self) -> Arc<Mutex<Devnet>> {
        Arc::clone(&self.devnet)
    }

    /// The dev chain's account keys, for building wallets.
    pub fn signers(&self) -> Vec<LocalSigner> {
        self.devnet.lock().signers().to_vec()
    }
}

#[async_trait]
impl Provider for LocalProvider {
    async fn chain_id(&self) -> ProviderResult<u64> {
        Ok(self.devnet.lock().chain_id())
    }

    async fn block_number(&self) -> ProviderResult<u64> {
        Ok(self.devnet.lock().block_number())
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        Ok(self.devnet.lock().accounts())
    }

    async fn balance(&self, address: Address) -> ProviderResult<Wei> {
        Ok(self.devnet.lock().balance(&address))
    }

    async fn nonce(&self, address: Address) -> ProviderResult<u64> {
        Ok(self.devnet.lock().nonce(&address))
    }

    async fn gas_price(&self) -> ProviderResult<Wei> {
        Ok(self.devnet.lock().gas_price())
    }

    async fn code_hash(&self, address: Address) -> ProviderResult<Option<H256>> {
        Ok(self.devnet.lock().code_hash(&address))
    }

    async fn estimate_gas(&self, request: &CallRequest) -> ProviderResult<u64> {
        Ok(self.devnet.lock().estimate_gas(request)?)
    }

    async fn send_raw_transaction(&self, stx: &SignedTransaction) -> ProviderResult<H256> {
        Ok(self.devnet.lock().send_raw_transaction(stx.clone())?)
    }

    async fn receipt(&self, hash: H256) -> ProviderResult<Option<Receipt>> {
        Ok(self.devnet.lock().receipt(&hash).cloned())
    }

    async fn call(&self, request: &CallRequest) -> ProviderResult<Token> {
        Ok(self.devnet.lock().call(request)?)
    }

    async fn mine(&self, blocks: u64) -> ProviderResult<u64> {
        Ok(self.devnet.lock().mine(blocks)?)
    }

    /// Mines whatever is missing instead of waiting: one block if the
    /// transaction is still pending, then empty blocks up to the count.
    async fn wait_for_confirmations(
        &self,
        hash: H256,
        confirmations: u64,
        _timeout: Duration,
    ) -> ProviderResult<Receipt> {
        let wanted = confirmations.max(1);
        let mut devnet = self.devnet.lock();
        if devnet.receipt(&hash).is_none() && devnet.pending_count() > 0 {
            devnet.mine_block()?;
        }
        let have = devnet
            .confirmations(&hash)
            .ok_or(ProviderError::UnknownTransaction(hash))?;
        if have < wanted {
            devnet.mine(wanted - have)?;
        }
        devnet
            .receipt(&hash)
            .cloned()
            .ok_or(ProviderError::UnknownTransaction(hash))
    }
}

// ---------------------------------------------------------------------------
// HttpProvider
// ---------------------------------------------------------------------------

/// JSON-RPC client of an `nft-market node`.
pub struct HttpProvider {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpProvider {
    /// A client of the node at `url` (e.g. `http://127.0.0.1:8545`).
    ///
    /// # Errors
    ///
    /// [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ProviderResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest::new(id, method, params);
        tracing::trace!(url = %self.url, method, id, "rpc request");

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            if let Some(reason) = error.revert_reason() {
                return Err(ProviderError::Reverted { reason });
            }
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| ProviderError::Transport(format!("{}: bad result: {}", method, e)))
    }

    async fn request_wei(&self, method: &str, params: Value) -> ProviderResult<Wei> {
        let text: String = self.request(method, params).await?;
        text.parse()
            .map_err(|_| ProviderError::Transport(format!("{}: bad quantity {:?}", method, text)))
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn chain_id(&self) -> ProviderResult<u64> {
        self.request(rpc::METHOD_CHAIN_ID, json!([])).await
    }

    async fn block_number(&self) -> ProviderResult<u64> {
        self.request(rpc::METHOD_BLOCK_NUMBER, json!([])).await
    }

    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        self.request(rpc::METHOD_ACCOUNTS, json!([])).await
    }

    async fn balance(&self, address: Address) -> ProviderResult<Wei> {
        self.request_wei(rpc::METHOD_GET_BALANCE, json!([address]))
            .await
    }

    async fn nonce(&self, address: Address) -> ProviderResult<u64> {
        self.request(rpc::METHOD_GET_TRANSACTION_COUNT, json!([address]))
            .await
    }

    async fn gas_price(&self) -> ProviderResult<Wei> {
        self.request_wei(rpc::METHOD_GAS_PRICE, json!([])).await
    }

    async fn code_hash(&self, address: Address) -> ProviderResult<Option<H256>> {
        self.request(rpc::METHOD_GET_CODE_HASH, json!([address]))
            .await
    }

    async fn estimate_gas(&self, request: &CallRequest) -> ProviderResult<u64> {
        self.request(rpc::METHOD_ESTIMATE_GAS, json!([request]))
            .await
    }

    async fn send_raw_transaction(&self, stx: &SignedTransaction) -> ProviderResult<H256> {
        self.request(rpc::METHOD_SEND_RAW_TRANSACTION, json!([stx.to_raw()]))
            .await
    }

    async fn receipt(&self, hash: H256) -> ProviderResult<Option<Receipt>> {
        self.request(rpc::METHOD_GET_TRANSACTION_RECEIPT, json!([hash]))
            .await
    }

    async fn call(&self, request: &CallRequest) -> ProviderResult<Token> {
        self.request(rpc::METHOD_CALL, json!([request])).await
    }

    async fn mine(&self, blocks: u64) -> ProviderResult<u64> {
        self.request(rpc::METHOD_MINE, json!([blocks])).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devnet::DevnetConfig;
    use crate::transaction::{sign_transaction, TransactionBuilder};
    use crate::vm::ArtifactRegistry;

    fn local() -> LocalProvider {
        LocalProvider::new(Devnet::new(DevnetConfig::default(), ArtifactRegistry::new()))
    }

    async fn send_transfer(provider: &dyn Provider, signer: &LocalSigner) -> H256 {
        let nonce = provider.nonce(signer.address()).await.unwrap();
        let tx = TransactionBuilder::new(signer.address())
            .nonce(nonce)
            .transfer(Address([9; 20]))
            .value(1)
            .build();
        provider
            .send_raw_transaction(&sign_transaction(tx, signer).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn local_provider_basics() {
        let provider = local();
        assert_eq!(provider.chain_id().await.unwrap(), 31337);
        assert_eq!(provider.block_number().await.unwrap(), 0);
        assert_eq!(provider.accounts().await.unwrap().len(), 10);
        assert_eq!(provider.mine(2).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn local_wait_mines_missing_confirmations() {
        let provider = local();
        let signer = provider.signers()[0].clone();
        let hash = send_transfer(&provider, &signer).await;

        let receipt = provider
            .wait_for_confirmations(hash, 6, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(receipt.block_number, 1);
        assert_eq!(provider.block_number().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn local_wait_mines_pending_transaction() {
        let provider = local();
        provider.devnet().lock().set_automine(false);
        let signer = provider.signers()[0].clone();
        let hash = send_transfer(&provider, &signer).await;
        assert!(provider.receipt(hash).await.unwrap().is_none());

        let receipt = provider
            .wait_for_confirmations(hash, 1, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(receipt.status);
    }

    #[tokio::test]
    async fn local_wait_unknown_hash() {
        let provider = local();
        let err = provider
            .wait_for_confirmations(H256([1; 32]), 1, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownTransaction(_)));
    }

    #[test]
    fn chain_reverts_are_normalized() {
        let err: ProviderError = ChainError::Reverted {
            reason: "NFTMarket__NotOwner".into(),
        }
        .into();
        assert_eq!(err.revert_reason(), Some("NFTMarket__NotOwner"));

        let err: ProviderError = ChainError::AlreadyKnown(H256::ZERO).into();
        assert_eq!(err.revert_reason(), None);
    }

    // -- HttpProvider against a real router --------------------------------

    async fn serve(devnet: Arc<Mutex<Devnet>>) -> String {
        use axum::{extract::State, routing::post, Json, Router};

        async fn rpc_handler(
            State(devnet): State<Arc<Mutex<Devnet>>>,
            Json(request): Json<RpcRequest>,
        ) -> Json<RpcResponse> {
            Json(rpc::handle(&devnet, request))
        }

        let app = Router::new()
            .route("/", post(rpc_handler))
            .with_state(devnet);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn http_provider_round_trip() {
        let devnet = Arc::new(Mutex::new(Devnet::new(
            DevnetConfig::default(),
            ArtifactRegistry::new(),
        )));
        let signer = devnet.lock().signers()[0].clone();
        let url = serve(Arc::clone(&devnet)).await;
        let provider = HttpProvider::new(url).unwrap();

        assert_eq!(provider.chain_id().await.unwrap(), 31337);
        assert_eq!(
            provider.balance(signer.address()).await.unwrap(),
            crate::types::ether(10_000)
        );
        assert_eq!(provider.gas_price().await.unwrap(), 1_000_000_000);

        let hash = send_transfer(&provider, &signer).await;
        let err = provider
            .wait_for_confirmations(hash, 2, Duration::from_millis(600))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { confirmations: 2, .. }));

        provider.mine(1).await.unwrap();
        let receipt = provider
            .wait_for_confirmations(hash, 2, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(receipt.status);
        assert_eq!(provider.nonce(signer.address()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn http_provider_surfaces_rpc_errors() {
        let devnet = Arc::new(Mutex::new(Devnet::new(
            DevnetConfig::default(),
            ArtifactRegistry::new(),
        )));
        let url = serve(devnet).await;
        let provider = HttpProvider::new(url).unwrap();

        let request = CallRequest::call(Address::ZERO, Address([1; 20]), "owner", vec![]);
        let err = provider.call(&request).await.unwrap_err();
        assert_eq!(
            err.revert_reason(),
            Some("call to non-contract address 0x0101010101010101010101010101010101010101")
        );
    }

    #[tokio::test]
    async fn http_provider_transport_error() {
        let provider = HttpProvider::new("http://127.0.0.1:1").unwrap();
        assert!(matches!(
            provider.chain_id().await,
            Err(ProviderError::Transport(_))
        ));
    }
}
