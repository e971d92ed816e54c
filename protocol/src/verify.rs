//! # Source Verification
//!
//! Publishes a deployed contract's source to a block explorer so its
//! interface is readable there. [`EtherscanVerifier`] speaks the Etherscan
//! contract API:
//!
//! 1. `POST module=contract&action=verifysourcecode` with the address,
//!    contract name, constructor arguments and source. The answer carries a
//!    GUID.
//! 2. `GET module=contract&action=checkverifystatus&guid=…` until the
//!    result leaves the queue.
//!
//! A contract the explorer already knows is reported as
//! [`VerifyOutcome::AlreadyVerified`], not as an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::abi::Token;
use crate::config::{HTTP_REQUEST_TIMEOUT, VERIFY_MAX_POLLS, VERIFY_POLL_INTERVAL};
use crate::types::Address;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("transport error: {0}")]
    Transport(String),

    /// The explorer answered with a non-`1` status.
    #[error("verification rejected: {message}: {result}")]
    Rejected { message: String, result: String },

    #[error("verification failed: {0}")]
    Failed(String),

    #[error("verification still pending after {polls} status checks")]
    StillPending { polls: u32 },
}

impl From<reqwest::Error> for VerifyError {
    fn from(err: reqwest::Error) -> Self {
        VerifyError::Transport(err.to_string())
    }
}

/// What to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub address: Address,
    pub contract_name: String,
    pub source: String,
    pub constructor_args: Vec<Token>,
}

impl VerifyRequest {
    /// Constructor arguments in their canonical encoding, hex without `0x`.
    /// Empty when there are none.
    pub fn encoded_args(&self) -> String {
        if self.constructor_args.is_empty() {
            return String::new();
        }
        hex::encode(Token::encode_all(&self.constructor_args))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyOutcome, VerifyError>;
}

// ---------------------------------------------------------------------------
// Etherscan
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    message: String,
    result: String,
}

fn is_already_verified(text: &str) -> bool {
    text.to_ascii_lowercase().contains("already verified")
}

/// Client of an Etherscan-compatible API.
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl EtherscanVerifier {
    /// # Errors
    ///
    /// [`VerifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            poll_interval: VERIFY_POLL_INTERVAL,
            max_polls: VERIFY_MAX_POLLS,
        })
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    async fn submit(&self, request: &VerifyRequest) -> Result<ApiResponse, VerifyError> {
        let address = request.address.to_string();
        let args = request.encoded_args();
        let form = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "verifysourcecode"),
            ("contractaddress", address.as_str()),
            ("sourceCode", request.source.as_str()),
            ("codeformat", "solidity-single-file"),
            ("contractname", request.contract_name.as_str()),
            // Etherscan's spelling.
            ("constructorArguements", args.as_str()),
        ];
        Ok(self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    async fn check(&self, guid: &str) -> Result<ApiResponse, VerifyError> {
        let query = [
            ("apikey", self.api_key.as_str()),
            ("module", "contract"),
            ("action", "checkverifystatus"),
            ("guid", guid),
        ];
        Ok(self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[async_trait]
impl Verifier for EtherscanVerifier {
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyOutcome, VerifyError> {
        tracing::info!(
            address = %request.address,
            contract = %request.contract_name,
            "submitting source for verification"
        );
        let submitted = self.submit(request).await?;
        if submitted.status != "1" {
            if is_already_verified(&submitted.result) {
                tracing::info!(address = %request.address, "already verified");
                return Ok(VerifyOutcome::AlreadyVerified);
            }
            return Err(VerifyError::Rejected {
                message: submitted.message,
                result: submitted.result,
            });
        }

        let guid = submitted.result;
        tracing::debug!(%guid, "verification queued");
        for _ in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let status = self.check(&guid).await?;
            if status.result.to_ascii_lowercase().contains("pending") {
                continue;
            }
            if is_already_verified(&status.result) {
                tracing::info!(address = %request.address, "already verified");
                return Ok(VerifyOutcome::AlreadyVerified);
            }
            if status.status == "1" {
                tracing::info!(address = %request.address, result = %status.result, "verified");
                return Ok(VerifyOutcome::Verified);
            }
            return Err(VerifyError::Failed(status.result));
        }
        Err(VerifyError::StillPending {
            polls: self.max_polls,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Form, Query, State};
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Scripted explorer: the submit answer, then status answers in order.
    #[derive(Default)]
    struct Explorer {
        submit: Value,
        statuses: Vec<Value>,
        submitted: Option<HashMap<String, String>>,
    }

    async fn submit(
        State(explorer): State<Arc<Mutex<Explorer>>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<Value> {
        let mut explorer = explorer.lock();
        explorer.submitted = Some(form);
        Json(explorer.submit.clone())
    }

    async fn status(
        State(explorer): State<Arc<Mutex<Explorer>>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        assert_eq!(query.get("action").map(String::as_str), Some("checkverifystatus"));
        assert_eq!(query.get("guid").map(String::as_str), Some("guid-1"));
        let mut explorer = explorer.lock();
        if explorer.statuses.len() > 1 {
            Json(explorer.statuses.remove(0))
        } else {
            Json(explorer.statuses[0].clone())
        }
    }

    async fn serve(explorer: Arc<Mutex<Explorer>>) -> String {
        let app = Router::new()
            .route("/api", post(submit).get(status))
            .with_state(explorer);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn request() -> VerifyRequest {
        VerifyRequest {
            address: Address([0x5f; 20]),
            contract_name: "NFTMarket".into(),
            source: "contract NFTMarket {}".into(),
            constructor_args: vec![],
        }
    }

    fn verifier(url: String) -> EtherscanVerifier {
        EtherscanVerifier::new(url, "KEY")
            .unwrap()
            .with_polling(Duration::from_millis(10), 5)
    }

    #[tokio::test]
    async fn verifies_after_pending() {
        let explorer = Arc::new(Mutex::new(Explorer {
            submit: json!({"status": "1", "message": "OK", "result": "guid-1"}),
            statuses: vec![
                json!({"status": "0", "message": "NOTOK", "result": "Pending in queue"}),
                json!({"status": "1", "message": "OK", "result": "Pass - Verified"}),
            ],
            ..Default::default()
        }));
        let url = serve(Arc::clone(&explorer)).await;

        let outcome = verifier(url).verify(&request()).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);

        let form = explorer.lock().submitted.clone().unwrap();
        assert_eq!(form["apikey"], "KEY");
        assert_eq!(form["action"], "verifysourcecode");
        assert_eq!(
            form["contractaddress"],
            "0x5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f5f"
        );
        assert_eq!(form["contractname"], "NFTMarket");
        assert_eq!(form["constructorArguements"], "");
    }

    #[tokio::test]
    async fn already_verified_is_success() {
        let explorer = Arc::new(Mutex::new(Explorer {
            submit: json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Contract source code already verified"
            }),
            statuses: vec![json!({})],
            ..Default::default()
        }));
        let url = serve(explorer).await;
        let outcome = verifier(url).verify(&request()).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::AlreadyVerified);
    }

    #[tokio::test]
    async fn rejection_carries_message() {
        let explorer = Arc::new(Mutex::new(Explorer {
            submit: json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"}),
            statuses: vec![json!({})],
            ..Default::default()
        }));
        let url = serve(explorer).await;
        let err = verifier(url).verify(&request()).await.unwrap_err();
        match err {
            VerifyError::Rejected { result, .. } => assert_eq!(result, "Invalid API Key"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_status_is_an_error() {
        let explorer = Arc::new(Mutex::new(Explorer {
            submit: json!({"status": "1", "message": "OK", "result": "guid-1"}),
            statuses: vec![json!({"status": "0", "message": "NOTOK", "result": "Fail - Unable to verify"})],
            ..Default::default()
        }));
        let url = serve(explorer).await;
        let err = verifier(url).verify(&request()).await.unwrap_err();
        assert!(matches!(err, VerifyError::Failed(ref r) if r == "Fail - Unable to verify"));
    }

    #[tokio::test]
    async fn gives_up_while_pending() {
        let explorer = Arc::new(Mutex::new(Explorer {
            submit: json!({"status": "1", "message": "OK", "result": "guid-1"}),
            statuses: vec![json!({"status": "0", "message": "NOTOK", "result": "Pending in queue"})],
            ..Default::default()
        }));
        let url = serve(explorer).await;
        let err = verifier(url).verify(&request()).await.unwrap_err();
        assert!(matches!(err, VerifyError::StillPending { polls: 5 }));
    }

    #[test]
    fn encodes_constructor_args() {
        let mut req = request();
        assert_eq!(req.encoded_args(), "");
        req.constructor_args = vec![Token::Bool(true)];
        assert!(!req.encoded_args().is_empty());
    }
}
