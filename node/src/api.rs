//! # HTTP API
//!
//! The axum router of `nft-market node`. Handlers share the development
//! chain through [`AppState`]; the chain lock is taken per request and
//! never held across an await.
//!
//! ## Endpoints
//!
//! | Method | Path                  | Description                          |
//! |--------|-----------------------|--------------------------------------|
//! | GET    | `/health`             | Liveness probe                       |
//! | GET    | `/status`             | Chain id, head, pool size, mining    |
//! | POST   | `/rpc`                | JSON-RPC 2.0 (`market_*` methods)    |
//! | GET    | `/blocks/:number`     | Block by number                      |
//! | GET    | `/accounts`           | Development accounts with balances   |
//! | GET    | `/accounts/:address`  | Balance and nonce of one account     |

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use nftmarket_protocol::rpc::{self, RpcRequest, RpcResponse};
use nftmarket_protocol::{Address, Devnet};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    /// Mining mode as shown by `/status`, e.g. `automine` or `interval 2s`.
    pub mining: String,
    pub devnet: Arc<Mutex<Devnet>>,
    pub metrics: SharedMetrics,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the API router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/blocks/:number", get(block_handler))
        .route("/accounts", get(accounts_handler))
        .route("/accounts/:address", get(account_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub chain_id: u64,
    pub block_number: u64,
    pub pending_transactions: usize,
    pub accounts: usize,
    pub mining: String,
    pub started_at: String,
    pub timestamp: String,
}

/// Response payload for the account endpoints. Balances are decimal wei.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    pub balance: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(message: String) -> axum::response::Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse { error: message })).into_response()
}

fn bad_request(message: String) -> axum::response::Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let devnet = state.devnet.lock();
    Json(StatusResponse {
        version: state.version.clone(),
        chain_id: devnet.chain_id(),
        block_number: devnet.block_number(),
        pending_transactions: devnet.pending_count(),
        accounts: devnet.accounts().len(),
        mining: state.mining.clone(),
        started_at: state.started_at.to_rfc3339(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Label of a method for the request counter. Unknown names are folded
/// into one series.
fn method_label(method: &str) -> &str {
    if method.starts_with("market_") {
        method
    } else {
        "other"
    }
}

/// `POST /rpc`: one JSON-RPC 2.0 request.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let started = Instant::now();
    let method = request.method.clone();
    state
        .metrics
        .rpc_requests_total
        .with_label_values(&[method_label(&method)])
        .inc();

    let response = rpc::handle(&state.devnet, request);

    state
        .metrics
        .rpc_latency_seconds
        .observe(started.elapsed().as_secs_f64());
    match &response.error {
        Some(error) => {
            state.metrics.rpc_errors_total.inc();
            tracing::debug!(%method, code = error.code, message = %error.message, "rpc error");
        }
        None if method == rpc::METHOD_SEND_RAW_TRANSACTION => {
            state.metrics.transactions_received_total.inc();
        }
        None => {}
    }
    let head = state.devnet.lock().block_number();
    state.metrics.observe_head(head);
    Json(response)
}

async fn block_handler(
    State(state): State<AppState>,
    Path(number): Path<u64>,
) -> axum::response::Response {
    let devnet = state.devnet.lock();
    match devnet.block(number) {
        Some(block) => Json(block.clone()).into_response(),
        None => not_found(format!("block {} not found", number)),
    }
}

fn account(devnet: &Devnet, address: Address) -> AccountResponse {
    AccountResponse {
        address,
        balance: devnet.balance(&address).to_string(),
        nonce: devnet.nonce(&address),
    }
}

async fn accounts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let devnet = state.devnet.lock();
    let accounts: Vec<AccountResponse> = devnet
        .accounts()
        .into_iter()
        .map(|address| account(&devnet, address))
        .collect();
    Json(accounts)
}

async fn account_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> axum::response::Response {
    let address: Address = match address.parse() {
        Ok(address) => address,
        Err(e) => return bad_request(format!("invalid address: {}", e)),
    };
    let devnet = state.devnet.lock();
    Json(account(&devnet, address)).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
