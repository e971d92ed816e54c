//! Receipts and event logs.
//!
//! A [`Receipt`] is produced for every mined transaction, successful or
//! not. Logs are kept in emission order; a reverted transaction has none.

use serde::{Deserialize, Serialize};

use crate::abi::Token;
use crate::types::{quantity, Address, Wei, H256};

/// A named event parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogParam {
    pub name: String,
    pub value: Token,
}

/// An event emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract.
    pub address: Address,
    /// Event name, e.g. `Transfer`.
    pub event: String,
    /// Parameters in declaration order.
    pub params: Vec<LogParam>,
}

impl Log {
    pub fn new(address: Address, event: impl Into<String>) -> Self {
        Self {
            address,
            event: event.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter. Chainable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Token>) -> Self {
        self.params.push(LogParam {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Looks a parameter up by name.
    pub fn param(&self, name: &str) -> Option<&Token> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: H256,
    pub block_number: u64,
    pub block_hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    /// Set for successful creation transactions.
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    #[serde(with = "quantity")]
    pub effective_gas_price: Wei,
    /// `true` when execution succeeded.
    pub status: bool,
    pub logs: Vec<Log>,
    /// Reason string of a reverted transaction.
    pub revert_reason: Option<String>,
}

impl Receipt {
    /// What the sender paid for gas: `gas_used * effective_gas_price`.
    pub fn gas_cost(&self) -> Wei {
        self.gas_used as Wei * self.effective_gas_price
    }

    /// Logs named `event`, in order.
    pub fn events<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a Log> + 'a {
        self.logs.iter().filter(move |log| log.event == event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt() -> Receipt {
        Receipt {
            tx_hash: H256([1; 32]),
            block_number: 3,
            block_hash: H256([2; 32]),
            from: Address([3; 20]),
            to: Some(Address([4; 20])),
            contract_address: None,
            gas_used: 50_000,
            effective_gas_price: 2,
            status: true,
            logs: vec![
                Log::new(Address([4; 20]), "Transfer").with("tokenId", 0u64),
                Log::new(Address([4; 20]), "NFTTransfer")
                    .with("tokenId", 0u64)
                    .with("tokenUri", "uri"),
            ],
            revert_reason: None,
        }
    }

    #[test]
    fn gas_cost_is_used_times_price() {
        assert_eq!(receipt().gas_cost(), 100_000);
    }

    #[test]
    fn log_param_lookup() {
        let r = receipt();
        let log = r.events("NFTTransfer").next().unwrap();
        assert_eq!(log.param("tokenUri").and_then(Token::as_str), Some("uri"));
        assert!(log.param("price").is_none());
    }

    #[test]
    fn events_filter_by_name() {
        let r = receipt();
        assert_eq!(r.events("Transfer").count(), 1);
        assert_eq!(r.events("Approval").count(), 0);
    }

    #[test]
    fn receipt_json_roundtrip() {
        let r = receipt();
        let json = serde_json::to_string(&r).unwrap();
        let back: Receipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
