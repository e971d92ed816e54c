//! Deployable artifacts of this crate.

use nftmarket_protocol::vm::{Artifact, ArtifactRegistry};

use crate::nft_market::{NftMarket, CONTRACT_NAME};

/// The market. Its source is what verification submits, and its hash is
/// the code hash deployments are compared by.
pub const NFT_MARKET: Artifact = Artifact {
    name: CONTRACT_NAME,
    source: include_str!("../sol/NFTMarket.sol"),
    constructor: NftMarket::deploy,
};

/// Every artifact, for building a chain or a deploy context.
pub fn artifacts() -> ArtifactRegistry {
    ArtifactRegistry::new().with(NFT_MARKET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_the_market() {
        let registry = artifacts();
        let market = registry.get("NFTMarket").unwrap();
        assert_eq!(market.code_hash(), NFT_MARKET.code_hash());
        assert!(market.source.contains("contract NFTMarket"));
    }
}
