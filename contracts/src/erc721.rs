//! # ERC-721 Core
//!
//! Non-fungible token ledger with per-token URIs, matching OpenZeppelin
//! 4.8's `ERC721URIStorage` in behaviour and revert reasons.
//!
//! Every entry point takes the caller explicitly. The market calls these
//! both as itself (an external `transferFrom` on its own token) and on
//! behalf of the transaction sender (an internal `approve`), and the two
//! differ only in who `caller` is.
//!
//! Gas: reads charge [`Env::sload`], writes [`Env::sstore`] with whether
//! the slot was empty.

use std::collections::{BTreeMap, BTreeSet};

use nftmarket_protocol::vm::{require, Env, ExecResult, Revert};
use nftmarket_protocol::Address;

use crate::events;

pub const INVALID_TOKEN_ID: &str = "ERC721: invalid token ID";
pub const ZERO_OWNER: &str = "ERC721: address zero is not a valid owner";
pub const APPROVAL_TO_OWNER: &str = "ERC721: approval to current owner";
pub const APPROVE_NOT_AUTHORIZED: &str =
    "ERC721: approve caller is not token owner or approved for all";
pub const APPROVE_TO_CALLER: &str = "ERC721: approve to caller";
pub const NOT_OWNER_OR_APPROVED: &str = "ERC721: caller is not token owner or approved";
pub const INCORRECT_OWNER: &str = "ERC721: transfer from incorrect owner";
pub const TRANSFER_TO_ZERO: &str = "ERC721: transfer to the zero address";
pub const MINT_TO_ZERO: &str = "ERC721: mint to the zero address";
pub const ALREADY_MINTED: &str = "ERC721: token already minted";
pub const BALANCE_UNDERFLOW: &str = "panic: arithmetic underflow or overflow (0x11)";

#[derive(Debug, Clone, Default)]
pub struct Erc721 {
    name: String,
    symbol: String,
    owners: BTreeMap<u64, Address>,
    balances: BTreeMap<Address, u128>,
    token_approvals: BTreeMap<u64, Address>,
    operator_approvals: BTreeSet<(Address, Address)>,
    token_uris: BTreeMap<u64, String>,
}

impl Erc721 {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    // -- Views ---------------------------------------------------------------

    pub fn balance_of(&self, owner: Address) -> ExecResult<u128> {
        require(!owner.is_zero(), ZERO_OWNER)?;
        Ok(self.balances.get(&owner).copied().unwrap_or(0))
    }

    pub fn owner_of(&self, token_id: u64) -> ExecResult<Address> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or_else(|| Revert::new(INVALID_TOKEN_ID))
    }

    pub fn exists(&self, token_id: u64) -> bool {
        self.owners.contains_key(&token_id)
    }

    pub fn get_approved(&self, token_id: u64) -> ExecResult<Address> {
        self.owner_of(token_id)?;
        Ok(self
            .token_approvals
            .get(&token_id)
            .copied()
            .unwrap_or(Address::ZERO))
    }

    pub fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.operator_approvals.contains(&(owner, operator))
    }

    pub fn token_uri(&self, token_id: u64) -> ExecResult<&str> {
        self.owner_of(token_id)?;
        Ok(self
            .token_uris
            .get(&token_id)
            .map(String::as_str)
            .unwrap_or(""))
    }

    fn is_approved_or_owner(&self, spender: Address, token_id: u64) -> ExecResult<bool> {
        let owner = self.owner_of(token_id)?;
        Ok(spender == owner
            || self.is_approved_for_all(owner, spender)
            || self.token_approvals.get(&token_id) == Some(&spender))
    }

    // -- Writes --------------------------------------------------------------

    pub fn approve(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        to: Address,
        token_id: u64,
    ) -> ExecResult<()> {
        env.sload()?;
        let owner = self.owner_of(token_id)?;
        require(to != owner, APPROVAL_TO_OWNER)?;
        require(
            caller == owner || self.is_approved_for_all(owner, caller),
            APPROVE_NOT_AUTHORIZED,
        )?;
        self.set_approval(env, owner, to, token_id)
    }

    fn set_approval(
        &mut self,
        env: &mut Env<'_>,
        owner: Address,
        to: Address,
        token_id: u64,
    ) -> ExecResult<()> {
        let was_empty = !self.token_approvals.contains_key(&token_id);
        env.sstore(was_empty)?;
        if to.is_zero() {
            self.token_approvals.remove(&token_id);
        } else {
            self.token_approvals.insert(token_id, to);
        }
        env.emit(events::approval(env.this(), owner, to, token_id))
    }

    pub fn set_approval_for_all(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> ExecResult<()> {
        require(caller != operator, APPROVE_TO_CALLER)?;
        let key = (caller, operator);
        env.sstore(!self.operator_approvals.contains(&key))?;
        if approved {
            self.operator_approvals.insert(key);
        } else {
            self.operator_approvals.remove(&key);
        }
        env.emit(events::approval_for_all(env.this(), caller, operator, approved))
    }

    /// `transferFrom` as called by `caller`.
    pub fn transfer_from(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        from: Address,
        to: Address,
        token_id: u64,
    ) -> ExecResult<()> {
        env.sload()?;
        require(
            self.is_approved_or_owner(caller, token_id)?,
            NOT_OWNER_OR_APPROVED,
        )?;
        self.transfer(env, from, to, token_id)
    }

    /// Moves a token without an authorization check.
    pub fn transfer(
        &mut self,
        env: &mut Env<'_>,
        from: Address,
        to: Address,
        token_id: u64,
    ) -> ExecResult<()> {
        require(self.owner_of(token_id)? == from, INCORRECT_OWNER)?;
        require(!to.is_zero(), TRANSFER_TO_ZERO)?;

        if self.token_approvals.remove(&token_id).is_some() {
            env.sstore(false)?;
        }
        self.debit(env, from)?;
        self.credit(env, to)?;
        env.sstore(false)?;
        self.owners.insert(token_id, to);
        env.emit(events::transfer(env.this(), from, to, token_id))
    }

    pub fn mint(&mut self, env: &mut Env<'_>, to: Address, token_id: u64) -> ExecResult<()> {
        require(!to.is_zero(), MINT_TO_ZERO)?;
        require(!self.exists(token_id), ALREADY_MINTED)?;
        self.credit(env, to)?;
        env.sstore(true)?;
        self.owners.insert(token_id, to);
        env.emit(events::transfer(env.this(), Address::ZERO, to, token_id))
    }

    pub fn set_token_uri(
        &mut self,
        env: &mut Env<'_>,
        token_id: u64,
        uri: &str,
    ) -> ExecResult<()> {
        require(self.exists(token_id), "ERC721URIStorage: URI set of nonexistent token")?;
        env.sstore(!self.token_uris.contains_key(&token_id))?;
        self.token_uris.insert(token_id, uri.to_string());
        Ok(())
    }

    fn credit(&mut self, env: &mut Env<'_>, owner: Address) -> ExecResult<()> {
        let balance = self.balances.entry(owner).or_insert(0);
        env.sstore(*balance == 0)?;
        *balance += 1;
        Ok(())
    }

    /// Every address in `owners` holds a balance entry, so a missing one is
    /// a corrupted ledger and fails like a checked underflow.
    fn debit(&mut self, env: &mut Env<'_>, owner: Address) -> ExecResult<()> {
        env.sstore(false)?;
        let balance = self
            .balances
            .get_mut(&owner)
            .filter(|balance| **balance > 0)
            .ok_or_else(|| Revert::new(BALANCE_UNDERFLOW))?;
        *balance -= 1;
        if *balance == 0 {
            self.balances.remove(&owner);
        }
        Ok(())
    }
}
