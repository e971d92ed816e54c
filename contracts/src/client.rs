//! # Typed Market Client
//!
//! [`NftMarketClient`] wraps a [`Wallet`] and a market address with one
//! method per contract entry point. Writes return the
//! [`PendingTransaction`]; reads decode the returned [`Token`].
//!
//! ```no_run
//! # async fn demo(market: nftmarket_contracts::client::NftMarketClient) -> Result<(), nftmarket_protocol::ProviderError> {
//! let receipt = market.mint_nft("ipfs://cat").await?.wait(1).await?;
//! let listed = market.list_nft(0, 69).await?.wait(1).await?;
//! # let _ = (receipt, listed);
//! # Ok(())
//! # }
//! ```

use nftmarket_protocol::provider::{ProviderError, ProviderResult};
use nftmarket_protocol::wallet::TxRequest;
use nftmarket_protocol::{Address, PendingTransaction, Token, Wallet, Wei};

use crate::nft_market::Listing;

#[derive(Debug, Clone)]
pub struct NftMarketClient {
    address: Address,
    wallet: Wallet,
}

fn decode<T>(method: &str, value: Token, f: impl FnOnce(&Token) -> Option<T>) -> ProviderResult<T> {
    f(&value).ok_or_else(|| ProviderError::Decode {
        method: method.to_string(),
        value,
    })
}

impl NftMarketClient {
    pub fn new(address: Address, wallet: Wallet) -> Self {
        Self { address, wallet }
    }

    /// The same market, signing as `wallet`.
    pub fn connect(&self, wallet: Wallet) -> Self {
        Self::new(self.address, wallet)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    async fn send(&self, method: &str, args: Vec<Token>, value: Wei) -> ProviderResult<PendingTransaction> {
        self.wallet
            .send(TxRequest::call(self.address, method, args).value(value))
            .await
    }

    async fn read(&self, method: &str, args: Vec<Token>) -> ProviderResult<Token> {
        self.wallet.read(self.address, method, args).await
    }

    // -- Writes --------------------------------------------------------------

    pub async fn mint_nft(&self, uri: &str) -> ProviderResult<PendingTransaction> {
        self.send("mintNFT", vec![Token::from(uri)], 0).await
    }

    pub async fn list_nft(&self, token_id: u64, price: Wei) -> ProviderResult<PendingTransaction> {
        self.send("listNFT", vec![Token::from(token_id), Token::Uint(price)], 0)
            .await
    }

    pub async fn buy_nft(&self, token_id: u64, value: Wei) -> ProviderResult<PendingTransaction> {
        self.send("buyNFT", vec![Token::from(token_id)], value).await
    }

    pub async fn cancel_listing(&self, token_id: u64) -> ProviderResult<PendingTransaction> {
        self.send("cancelListing", vec![Token::from(token_id)], 0)
            .await
    }

    pub async fn withdraw_funds(&self) -> ProviderResult<PendingTransaction> {
        self.send("withdrawFunds", vec![], 0).await
    }

    pub async fn approve(&self, to: Address, token_id: u64) -> ProviderResult<PendingTransaction> {
        self.send("approve", vec![Token::from(to), Token::from(token_id)], 0)
            .await
    }

    pub async fn set_approval_for_all(
        &self,
        operator: Address,
        approved: bool,
    ) -> ProviderResult<PendingTransaction> {
        let args = vec![Token::from(operator), Token::from(approved)];
        self.send("setApprovalForAll", args, 0).await
    }

    pub async fn transfer_from(
        &self,
        from: Address,
        to: Address,
        token_id: u64,
    ) -> ProviderResult<PendingTransaction> {
        let args = vec![Token::from(from), Token::from(to), Token::from(token_id)];
        self.send("transferFrom", args, 0).await
    }

    pub async fn transfer_ownership(&self, new_owner: Address) -> ProviderResult<PendingTransaction> {
        self.send("transferOwnership", vec![Token::from(new_owner)], 0)
            .await
    }

    // -- Reads ---------------------------------------------------------------

    pub async fn get_token_id(&self) -> ProviderResult<u64> {
        let value = self.read("getTokenId", vec![]).await?;
        decode("getTokenId", value, Token::as_u64)
    }

    pub async fn token_uri(&self, token_id: u64) -> ProviderResult<String> {
        let value = self.read("tokenURI", vec![Token::from(token_id)]).await?;
        decode("tokenURI", value, |t| t.as_str().map(str::to_string))
    }

    pub async fn owner_of(&self, token_id: u64) -> ProviderResult<Address> {
        let value = self.read("ownerOf", vec![Token::from(token_id)]).await?;
        decode("ownerOf", value, Token::as_address)
    }

    pub async fn balance_of(&self, owner: Address) -> ProviderResult<u128> {
        let value = self.read("balanceOf", vec![Token::from(owner)]).await?;
        decode("balanceOf", value, Token::as_uint)
    }

    pub async fn get_approved(&self, token_id: u64) -> ProviderResult<Address> {
        let value = self.read("getApproved", vec![Token::from(token_id)]).await?;
        decode("getApproved", value, Token::as_address)
    }

    pub async fn is_approved_for_all(&self, owner: Address, operator: Address) -> ProviderResult<bool> {
        let value = self
            .read("isApprovedForAll", vec![Token::from(owner), Token::from(operator)])
            .await?;
        decode("isApprovedForAll", value, Token::as_bool)
    }

    /// The listing of `token_id`, `None` when it is not listed.
    pub async fn get_listing(&self, token_id: u64) -> ProviderResult<Option<Listing>> {
        let value = self.read("getListing", vec![Token::from(token_id)]).await?;
        let listing = decode("getListing", value, |t| match t.as_tuple()? {
            [price, seller] => Some(Listing {
                price: price.as_uint()?,
                seller: seller.as_address()?,
            }),
            _ => None,
        })?;
        Ok((listing.price > 0).then_some(listing))
    }

    pub async fn owner(&self) -> ProviderResult<Address> {
        let value = self.read("owner", vec![]).await?;
        decode("owner", value, Token::as_address)
    }

    pub async fn name(&self) -> ProviderResult<String> {
        let value = self.read("name", vec![]).await?;
        decode("name", value, |t| t.as_str().map(str::to_string))
    }

    pub async fn symbol(&self) -> ProviderResult<String> {
        let value = self.read("symbol", vec![]).await?;
        decode("symbol", value, |t| t.as_str().map(str::to_string))
    }

    /// Native balance held by the market.
    pub async fn market_balance(&self) -> ProviderResult<Wei> {
        self.wallet.provider().balance(self.address).await
    }
}
