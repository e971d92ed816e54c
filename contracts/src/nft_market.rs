//! # NFTMarket Contract
//!
//! An ERC-721 collection (`NFTMarket` / `NFTM`) that is also its own
//! marketplace:
//!
//! - `mintNFT(uri)` mints the next token id (starting at 0) to the caller.
//! - `listNFT(id, price)` approves the market and moves the token into its
//!   custody at a fixed price.
//! - `buyNFT(id)` (payable, exact price) hands the token to the buyer and
//!   pays the seller 95% of the price. The market keeps the rest.
//! - `cancelListing(id)` returns the token to its seller.
//! - `withdrawFunds()` sends the market's whole balance to the owner.
//!
//! Every custody change emits `NFTTransfer(tokenId, from, to, tokenUri,
//! price)` after the ERC-721 events; `price` is non-zero only when listing.
//!
//! ## Methods
//!
//! | Method               | Payable | Returns                      |
//! |----------------------|---------|------------------------------|
//! | `mintNFT`            | no      | token id                     |
//! | `listNFT`            | no      | —                            |
//! | `buyNFT`             | yes     | —                            |
//! | `cancelListing`      | no      | —                            |
//! | `withdrawFunds`      | no      | —                            |
//! | `getTokenId`         | no      | tokens minted so far         |
//! | `getListing`         | no      | `(price, seller)`            |
//! | `tokenURI`, `ownerOf`, `balanceOf`, `getApproved`, `isApprovedForAll`, `owner`, `name`, `symbol` | no | |
//! | `approve`, `setApprovalForAll`, `transferFrom`, `transferOwnership`, `renounceOwnership` | no | — |

use std::collections::BTreeMap;

use nftmarket_protocol::vm::{unknown_method, Args, Contract, Env, ExecResult, Revert};
use nftmarket_protocol::{Address, Token, Wei};

use crate::erc721::Erc721;
use crate::events;
use crate::ownable::Ownable;

pub const CONTRACT_NAME: &str = "NFTMarket";
pub const TOKEN_NAME: &str = "NFTMarket";
pub const TOKEN_SYMBOL: &str = "NFTM";

pub const ERR_INVALID_PRICE: &str = "NFTMarket__InvalidPrice";
pub const ERR_NOT_LISTED: &str = "NFTMarket__NFTnotListed";
pub const ERR_NOT_OWNER: &str = "NFTMarket__NotOwner";
pub const ERR_ZERO_BALANCE: &str = "NFTMarket__ZeroBalance";
pub const ERR_INCORRECT_PRICE: &str = "NFT Market: Incorrect price";

/// Seller's share of a sale, in percent.
pub const SELLER_SHARE_PERCENT: u128 = 95;

/// What the seller receives for a sale at `price`, rounded down.
pub fn seller_proceeds(price: Wei) -> Wei {
    price * SELLER_SHARE_PERCENT / 100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub price: Wei,
    pub seller: Address,
}

#[derive(Debug, Clone)]
pub struct NftMarket {
    token: Erc721,
    ownable: Ownable,
    next_token_id: u64,
    listings: BTreeMap<u64, Listing>,
}

impl NftMarket {
    /// Constructor: the deployer becomes the owner.
    pub fn deploy(env: &mut Env<'_>, args: &[Token]) -> ExecResult<Box<dyn Contract>> {
        Args::new("constructor", args).expect_len(0)?;
        env.non_payable()?;
        let deployer = env.sender();
        let ownable = Ownable::init(env, deployer)?;
        Ok(Box::new(Self {
            token: Erc721::new(TOKEN_NAME, TOKEN_SYMBOL),
            ownable,
            next_token_id: 0,
            listings: BTreeMap::new(),
        }))
    }

    fn listing(&self, token_id: u64) -> ExecResult<Listing> {
        self.listings
            .get(&token_id)
            .copied()
            .ok_or_else(|| Revert::new(ERR_NOT_LISTED))
    }

    fn uri(&self, token_id: u64) -> String {
        self.token
            .token_uri(token_id)
            .map(str::to_string)
            .unwrap_or_default()
    }

    // -- Marketplace -----------------------------------------------------------

    fn mint_nft(&mut self, env: &mut Env<'_>, uri: &str) -> ExecResult<Token> {
        let caller = env.sender();
        env.sload()?;
        let token_id = self.next_token_id;
        env.sstore(token_id == 0)?;
        self.next_token_id += 1;

        self.token.mint(env, caller, token_id)?;
        self.token.set_token_uri(env, token_id, uri)?;
        env.emit(events::nft_transfer(
            env.this(),
            token_id,
            Address::ZERO,
            caller,
            uri,
            0,
        ))?;
        Ok(Token::from(token_id))
    }

    fn list_nft(&mut self, env: &mut Env<'_>, token_id: u64, price: Wei) -> ExecResult<Token> {
        if price == 0 {
            return Err(Revert::new(ERR_INVALID_PRICE));
        }
        let caller = env.sender();
        let market = env.this();

        self.token.approve(env, caller, market, token_id)?;
        self.token
            .transfer_from(env, caller, caller, market, token_id)?;

        env.sstore(true)?;
        self.listings.insert(
            token_id,
            Listing {
                price,
                seller: caller,
            },
        );
        let uri = self.uri(token_id);
        env.emit(events::nft_transfer(market, token_id, caller, market, &uri, price))?;
        Ok(Token::void())
    }

    fn buy_nft(&mut self, env: &mut Env<'_>, token_id: u64) -> ExecResult<Token> {
        env.sload()?;
        let listing = self.listing(token_id)?;
        if env.value() != listing.price {
            return Err(Revert::new(ERR_INCORRECT_PRICE));
        }
        let buyer = env.sender();
        let market = env.this();

        // The market moves its own token, so it is the caller here.
        self.token
            .transfer_from(env, market, market, buyer, token_id)?;
        env.sstore(false)?;
        self.listings.remove(&token_id);
        env.transfer(listing.seller, seller_proceeds(listing.price))?;

        let uri = self.uri(token_id);
        env.emit(events::nft_transfer(market, token_id, market, buyer, &uri, 0))?;
        Ok(Token::void())
    }

    fn cancel_listing(&mut self, env: &mut Env<'_>, token_id: u64) -> ExecResult<Token> {
        env.sload()?;
        let listing = self.listing(token_id)?;
        if listing.seller != env.sender() {
            return Err(Revert::new(ERR_NOT_OWNER));
        }
        let market = env.this();

        self.token
            .transfer(env, market, listing.seller, token_id)?;
        env.sstore(false)?;
        self.listings.remove(&token_id);

        let uri = self.uri(token_id);
        env.emit(events::nft_transfer(
            market,
            token_id,
            market,
            listing.seller,
            &uri,
            0,
        ))?;
        Ok(Token::void())
    }

    fn withdraw_funds(&mut self, env: &mut Env<'_>) -> ExecResult<Token> {
        self.ownable.only_owner(env.sender())?;
        let balance = env.balance_of(&env.this());
        if balance == 0 {
            return Err(Revert::new(ERR_ZERO_BALANCE));
        }
        env.transfer(self.ownable.owner(), balance)?;
        Ok(Token::void())
    }
}

/// Number of arguments each method takes, or `None` for an unknown method.
fn arity(method: &str) -> Option<usize> {
    let n = match method {
        "withdrawFunds" | "getTokenId" | "name" | "symbol" | "owner" | "renounceOwnership" => 0,
        "mintNFT" | "buyNFT" | "cancelListing" | "getListing" | "tokenURI" | "ownerOf"
        | "balanceOf" | "getApproved" | "transferOwnership" => 1,
        "listNFT" | "isApprovedForAll" | "approve" | "setApprovalForAll" => 2,
        "transferFrom" => 3,
        _ => return None,
    };
    Some(n)
}

impl Contract for NftMarket {
    fn name(&self) -> &str {
        CONTRACT_NAME
    }

    fn execute(&mut self, env: &mut Env<'_>, method: &str, args: &[Token]) -> ExecResult<Token> {
        let arity = arity(method).ok_or_else(|| unknown_method(CONTRACT_NAME, method))?;
        let a = Args::new(method, args);
        a.expect_len(arity)?;
        if method != "buyNFT" {
            env.non_payable()?;
        }
        let caller = env.sender();

        match method {
            // Marketplace
            "mintNFT" => self.mint_nft(env, a.string(0)?),
            "listNFT" => self.list_nft(env, a.u64(0)?, a.uint(1)?),
            "buyNFT" => self.buy_nft(env, a.u64(0)?),
            "cancelListing" => self.cancel_listing(env, a.u64(0)?),
            "withdrawFunds" => self.withdraw_funds(env),
            "getTokenId" => Ok(Token::from(self.next_token_id)),
            "getListing" => {
                let listing = self.listings.get(&a.u64(0)?).copied();
                let (price, seller) = listing
                    .map(|l| (l.price, l.seller))
                    .unwrap_or((0, Address::ZERO));
                Ok(Token::Tuple(vec![Token::Uint(price), Token::Address(seller)]))
            }

            // ERC-721
            "name" => Ok(Token::from(self.token.name())),
            "symbol" => Ok(Token::from(self.token.symbol())),
            "tokenURI" => Ok(Token::from(self.token.token_uri(a.u64(0)?)?)),
            "ownerOf" => Ok(Token::from(self.token.owner_of(a.u64(0)?)?)),
            "balanceOf" => Ok(Token::from(self.token.balance_of(a.address(0)?)?)),
            "getApproved" => Ok(Token::from(self.token.get_approved(a.u64(0)?)?)),
            "isApprovedForAll" => Ok(Token::from(
                self.token
                    .is_approved_for_all(a.address(0)?, a.address(1)?),
            )),
            "approve" => {
                self.token
                    .approve(env, caller, a.address(0)?, a.u64(1)?)?;
                Ok(Token::void())
            }
            "setApprovalForAll" => {
                self.token
                    .set_approval_for_all(env, caller, a.address(0)?, a.bool(1)?)?;
                Ok(Token::void())
            }
            "transferFrom" => {
                self.token
                    .transfer_from(env, caller, a.address(0)?, a.address(1)?, a.u64(2)?)?;
                Ok(Token::void())
            }

            // Ownable
            "owner" => Ok(Token::from(self.ownable.owner())),
            "transferOwnership" => {
                self.ownable
                    .transfer_ownership(env, caller, a.address(0)?)?;
                Ok(Token::void())
            }
            "renounceOwnership" => {
                self.ownable.renounce_ownership(env, caller)?;
                Ok(Token::void())
            }

            _ => Err(unknown_method(CONTRACT_NAME, method)),
        }
    }

    fn clone_box(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }
}
