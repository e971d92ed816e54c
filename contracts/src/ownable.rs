//! Single-owner access control, as OpenZeppelin's `Ownable`.

use nftmarket_protocol::vm::{require, Env, ExecResult};
use nftmarket_protocol::Address;

use crate::events;

pub const CALLER_NOT_OWNER: &str = "Ownable: caller is not the owner";
pub const NEW_OWNER_ZERO: &str = "Ownable: new owner is the zero address";

#[derive(Debug, Clone, Default)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    /// Makes `owner` the owner, emitting `OwnershipTransferred` from zero.
    pub fn init(env: &mut Env<'_>, owner: Address) -> ExecResult<Self> {
        let mut ownable = Self::default();
        ownable.set_owner(env, owner)?;
        Ok(ownable)
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn only_owner(&self, caller: Address) -> ExecResult<()> {
        require(caller == self.owner, CALLER_NOT_OWNER)
    }

    pub fn transfer_ownership(
        &mut self,
        env: &mut Env<'_>,
        caller: Address,
        new_owner: Address,
    ) -> ExecResult<()> {
        self.only_owner(caller)?;
        require(!new_owner.is_zero(), NEW_OWNER_ZERO)?;
        self.set_owner(env, new_owner)
    }

    pub fn renounce_ownership(&mut self, env: &mut Env<'_>, caller: Address) -> ExecResult<()> {
        self.only_owner(caller)?;
        self.set_owner(env, Address::ZERO)
    }

    fn set_owner(&mut self, env: &mut Env<'_>, new_owner: Address) -> ExecResult<()> {
        env.sstore(self.owner.is_zero())?;
        let previous = std::mem::replace(&mut self.owner, new_owner);
        env.emit(events::ownership_transferred(env.this(), previous, new_owner))
    }
}
