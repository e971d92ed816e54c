//! # JSON-RPC Wire Protocol
//!
//! The dialect spoken between `nft-market node` and [`crate::HttpProvider`]:
//! JSON-RPC 2.0 with positional parameters and `market_` method names.
//!
//! | Method                         | Params            | Result              |
//! |--------------------------------|-------------------|---------------------|
//! | `market_chainId`               | —                 | number              |
//! | `market_blockNumber`           | —                 | number              |
//! | `market_accounts`              | —                 | `[address]`         |
//! | `market_gasPrice`              | —                 | decimal string      |
//! | `market_getBalance`            | `[address]`       | decimal string      |
//! | `market_getTransactionCount`   | `[address]`       | number              |
//! | `market_getCodeHash`           | `[address]`       | hash or `null`      |
//! | `market_estimateGas`           | `[CallRequest]`   | number              |
//! | `market_sendRawTransaction`    | `["0x…"]`         | hash                |
//! | `market_getTransactionReceipt` | `[hash]`          | `Receipt` or `null` |
//! | `market_call`                  | `[CallRequest]`   | `Token`             |
//! | `market_mine`                  | `[blocks?]`       | number (new head)   |
//!
//! A revert is error code `3` with `data.reason` holding the reason
//! string, so clients can tell a revert from every other failure.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::devnet::{CallRequest, ChainError, Devnet};
use crate::transaction::SignedTransaction;
use crate::types::{Address, H256};

// ---------------------------------------------------------------------------
// Method names and error codes
// ---------------------------------------------------------------------------

pub const METHOD_CHAIN_ID: &str = "market_chainId";
pub const METHOD_BLOCK_NUMBER: &str = "market_blockNumber";
pub const METHOD_ACCOUNTS: &str = "market_accounts";
pub const METHOD_GAS_PRICE: &str = "market_gasPrice";
pub const METHOD_GET_BALANCE: &str = "market_getBalance";
pub const METHOD_GET_TRANSACTION_COUNT: &str = "market_getTransactionCount";
pub const METHOD_GET_CODE_HASH: &str = "market_getCodeHash";
pub const METHOD_ESTIMATE_GAS: &str = "market_estimateGas";
pub const METHOD_SEND_RAW_TRANSACTION: &str = "market_sendRawTransaction";
pub const METHOD_GET_TRANSACTION_RECEIPT: &str = "market_getTransactionReceipt";
pub const METHOD_CALL: &str = "market_call";
pub const METHOD_MINE: &str = "market_mine";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const SERVER_ERROR: i64 = -32000;
pub const EXECUTION_REVERTED: i64 = 3;

// ---------------------------------------------------------------------------
// Envelope types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: json!(id),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn reverted(reason: &str) -> Self {
        Self {
            code: EXECUTION_REVERTED,
            message: format!("execution reverted: {}", reason),
            data: Some(json!({ "reason": reason })),
        }
    }

    /// The revert reason carried in `data`, for code `3` errors.
    pub fn revert_reason(&self) -> Option<String> {
        if self.code != EXECUTION_REVERTED {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|d| d.get("reason"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl From<ChainError> for RpcError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Reverted { reason } => RpcError::reverted(&reason),
            other => RpcError::new(SERVER_ERROR, other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Server-side dispatch
// ---------------------------------------------------------------------------

/// Positional parameter `index`, deserialized.
fn param<T: DeserializeOwned>(params: &Value, index: usize) -> Result<T, RpcError> {
    let value = params
        .get(index)
        .cloned()
        .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("missing parameter {}", index)))?;
    serde_json::from_value(value)
        .map_err(|e| RpcError::new(INVALID_PARAMS, format!("parameter {}: {}", index, e)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(SERVER_ERROR, e.to_string()))
}

/// Executes one request against `devnet`. The lock is held only for the
/// duration of the call.
pub fn dispatch(devnet: &Mutex<Devnet>, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        METHOD_CHAIN_ID => to_value(devnet.lock().chain_id()),
        METHOD_BLOCK_NUMBER => to_value(devnet.lock().block_number()),
        METHOD_ACCOUNTS => to_value(devnet.lock().accounts()),
        METHOD_GAS_PRICE => to_value(devnet.lock().gas_price().to_string()),
        METHOD_GET_BALANCE => {
            let address: Address = param(params, 0)?;
            to_value(devnet.lock().balance(&address).to_string())
        }
        METHOD_GET_TRANSACTION_COUNT => {
            let address: Address = param(params, 0)?;
            to_value(devnet.lock().nonce(&address))
        }
        METHOD_GET_CODE_HASH => {
            let address: Address = param(params, 0)?;
            to_value(devnet.lock().code_hash(&address))
        }
        METHOD_ESTIMATE_GAS => {
            let request: CallRequest = param(params, 0)?;
            to_value(devnet.lock().estimate_gas(&request)?)
        }
        METHOD_SEND_RAW_TRANSACTION => {
            let raw: String = param(params, 0)?;
            let stx = SignedTransaction::from_raw(&raw)
                .map_err(|e| RpcError::new(INVALID_PARAMS, e.to_string()))?;
            to_value(devnet.lock().send_raw_transaction(stx)?)
        }
        METHOD_GET_TRANSACTION_RECEIPT => {
            let hash: H256 = param(params, 0)?;
            to_value(devnet.lock().receipt(&hash).cloned())
        }
        METHOD_CALL => {
            let request: CallRequest = param(params, 0)?;
            to_value(devnet.lock().call(&request)?)
        }
        METHOD_MINE => {
            let blocks: u64 = if params.get(0).is_some() {
                param(params, 0)?
            } else {
                1
            };
            to_value(devnet.lock().mine(blocks)?)
        }
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("method {} not found", other),
        )),
    }
}

/// Handles a full request envelope.
pub fn handle(devnet: &Mutex<Devnet>, request: RpcRequest) -> RpcResponse {
    if request.jsonrpc != "2.0" {
        return RpcResponse::failure(
            request.id,
            RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        );
    }
    match dispatch(devnet, &request.method, &request.params) {
        Ok(result) => RpcResponse::success(request.id, result),
        Err(error) => RpcResponse::failure(request.id, error),
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

    fn devnet() -> Mutex<Devnet> {
        Mutex::new(Devnet::new(DevnetConfig::default(), ArtifactRegistry::new()))
    }

    #[test]
    fn chain_id_and_accounts() {
        let net = devnet();
        assert_eq!(dispatch(&net, METHOD_CHAIN_ID, &json!([])).unwrap(), json!(31337));
        let accounts = dispatch(&net, METHOD_ACCOUNTS, &json!([])).unwrap();
        assert_eq!(
            accounts[0],
            json!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266")
        );
    }

    #[test]
    fn balance_is_decimal_string() {
        let net = devnet();
        let result = dispatch(
            &net,
            METHOD_GET_BALANCE,
            &json!(["0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"]),
        )
        .unwrap();
        assert_eq!(result, json!("10000000000000000000000"));
    }

    #[test]
    fn send_raw_and_fetch_receipt() {
        let net = devnet();
        let signer = net.lock().signers()[0].clone();
        let tx = TransactionBuilder::new(signer.address())
            .transfer(Address([1; 20]))
            .value(5)
            .build();
        let raw = sign_transaction(tx, &signer).unwrap().to_raw();

        let hash = dispatch(&net, METHOD_SEND_RAW_TRANSACTION, &json!([raw])).unwrap();
        let receipt = dispatch(&net, METHOD_GET_TRANSACTION_RECEIPT, &json!([hash])).unwrap();
        assert_eq!(receipt["status"], json!(true));
        assert_eq!(receipt["block_number"], json!(1));
    }

    #[test]
    fn unknown_method_and_bad_params() {
        let net = devnet();
        let err = dispatch(&net, "eth_chainId", &json!([])).unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);

        let err = dispatch(&net, METHOD_GET_BALANCE, &json!(["nope"])).unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);

        let err = dispatch(&net, METHOD_GET_BALANCE, &json!([])).unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
    }

    #[test]
    fn mine_defaults_to_one_block() {
        let net = devnet();
        assert_eq!(dispatch(&net, METHOD_MINE, &json!([])).unwrap(), json!(1));
        assert_eq!(dispatch(&net, METHOD_MINE, &json!([3])).unwrap(), json!(4));
    }

    #[test]
    fn reverts_use_code_three() {
        let err: RpcError = ChainError::Reverted {
            reason: "NFTMarket__ZeroBalance".into(),
        }
        .into();
        assert_eq!(err.code, EXECUTION_REVERTED);
        assert_eq!(err.revert_reason().as_deref(), Some("NFTMarket__ZeroBalance"));

        let other = RpcError::new(SERVER_ERROR, "x");
        assert_eq!(other.revert_reason(), None);
    }

    #[test]
    fn handle_rejects_wrong_version() {
        let net = devnet();
        let mut request = RpcRequest::new(1, METHOD_CHAIN_ID, json!([]));
        request.jsonrpc = "1.0".into();
        let response = handle(&net, request);
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn handle_echoes_id() {
        let net = devnet();
        let response = handle(&net, RpcRequest::new(42, METHOD_BLOCK_NUMBER, json!([])));
        assert_eq!(response.id, json!(42));
        assert_eq!(response.result, Some(json!(0)));
    }
}
