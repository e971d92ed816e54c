//! What a transaction does once it is executed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::abi::Token;

/// Discriminant and payload of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxKind {
    /// Plain value transfer to `to`.
    Transfer,
    /// Create a contract from the named artifact. `to` must be `None`.
    Deploy { contract: String, args: Vec<Token> },
    /// Invoke `method` on the contract at `to`.
    Call { method: String, args: Vec<Token> },
}

impl TxKind {
    /// Tag byte used in the canonical encoding.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Self::Transfer => 0,
            Self::Deploy { .. } => 1,
            Self::Call { .. } => 2,
        }
    }

    pub fn is_deploy(&self) -> bool {
        matches!(self, Self::Deploy { .. })
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transfer => write!(f, "transfer"),
            Self::Deploy { contract, .. } => write!(f, "deploy {}", contract),
            Self::Call { method, .. } => write!(f, "call {}", method),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_json_shape() {
        let kind = TxKind::Call {
            method: "buyNFT".into(),
            args: vec![Token::Uint(0)],
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "call");
        assert_eq!(json["method"], "buyNFT");
        assert_eq!(json["args"][0]["value"], "0");
    }

    #[test]
    fn display() {
        assert_eq!(TxKind::Transfer.to_string(), "transfer");
        let deploy = TxKind::Deploy {
            contract: "NFTMarket".into(),
            args: vec![],
        };
        assert_eq!(deploy.to_string(), "deploy NFTMarket");
        assert!(deploy.is_deploy());
    }
}
