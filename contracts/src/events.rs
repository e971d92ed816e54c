//! Event constructors, one per event the market emits.
//!
//! Parameter names follow the Solidity declarations so tests and explorers
//! read them the same way.

use nftmarket_protocol::transaction::Log;
use nftmarket_protocol::{Address, Wei};

pub const TRANSFER: &str = "Transfer";
pub const APPROVAL: &str = "Approval";
pub const APPROVAL_FOR_ALL: &str = "ApprovalForAll";
pub const OWNERSHIP_TRANSFERRED: &str = "OwnershipTransferred";
pub const NFT_TRANSFER: &str = "NFTTransfer";

pub fn transfer(emitter: Address, from: Address, to: Address, token_id: u64) -> Log {
    Log::new(emitter, TRANSFER)
        .with("from", from)
        .with("to", to)
        .with("tokenId", token_id)
}

pub fn approval(emitter: Address, owner: Address, approved: Address, token_id: u64) -> Log {
    Log::new(emitter, APPROVAL)
        .with("owner", owner)
        .with("approved", approved)
        .with("tokenId", token_id)
}

pub fn approval_for_all(emitter: Address, owner: Address, operator: Address, approved: bool) -> Log {
    Log::new(emitter, APPROVAL_FOR_ALL)
        .with("owner", owner)
        .with("operator", operator)
        .with("approved", approved)
}

pub fn ownership_transferred(emitter: Address, previous: Address, new_owner: Address) -> Log {
    Log::new(emitter, OWNERSHIP_TRANSFERRED)
        .with("previousOwner", previous)
        .with("newOwner", new_owner)
}

/// The market's own event, emitted on every custody change.
pub fn nft_transfer(
    emitter: Address,
    token_id: u64,
    from: Address,
    to: Address,
    token_uri: &str,
    price: Wei,
) -> Log {
    Log::new(emitter, NFT_TRANSFER)
        .with("tokenId", token_id)
        .with("from", from)
        .with("to", to)
        .with("tokenUri", token_uri)
        .with("price", price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nftmarket_protocol::Token;

    #[test]
    fn nft_transfer_field_names() {
        let market = Address([0xaa; 20]);
        let seller = Address([0x01; 20]);
        let log = nft_transfer(market, 1, seller, market, "uri", 69);

        assert_eq!(log.event, NFT_TRANSFER);
        assert_eq!(log.param("tokenId").and_then(Token::as_u64), Some(1));
        assert_eq!(log.param("tokenUri").and_then(Token::as_str), Some("uri"));
        assert_eq!(log.param("from").and_then(Token::as_address), Some(seller));
        assert_eq!(log.param("to").and_then(Token::as_address), Some(market));
        assert_eq!(log.param("price").and_then(Token::as_uint), Some(69));
        assert!(log.param("tokenID").is_none());
    }
}
