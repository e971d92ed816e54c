//! # Contract Execution
//!
//! Contracts on the dev chain are Rust types implementing [`Contract`].
//! The chain dispatches a call by method name with decoded [`Token`]
//! arguments; the contract reads and changes chain state only through the
//! [`Env`] it is handed, which meters gas and collects logs.
//!
//! ## Failure model
//!
//! Every contract failure is a [`Revert`] carrying a reason string. The
//! chain executes against clones of the contract and the state tree and
//! commits them only on success, so a revert leaves nothing behind except
//! the sender's nonce bump and gas payment.
//!
//! ```text
//! artifact.rs — Artifact (name, source, constructor), ArtifactRegistry
//! env.rs      — CallContext, GasMeter, Env
//! args.rs     — positional argument decoding
//! ```

pub mod args;
pub mod artifact;
pub mod env;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use thiserror::Error;

use crate::abi::Token;

pub use args::Args;
pub use artifact::{Artifact, ArtifactRegistry, Constructor};
pub use env::{CallContext, Env, GasMeter};

/// A contract-level failure with its reason string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Revert(pub String);

impl Revert {
    pub fn new(reason: impl Into<String>) -> Self {
        Revert(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// Result of anything that may revert.
pub type ExecResult<T> = Result<T, Revert>;

/// Reverts with `reason` unless `condition` holds.
pub fn require(condition: bool, reason: &str) -> ExecResult<()> {
    if condition {
        Ok(())
    } else {
        Err(Revert::new(reason))
    }
}

/// Reason used when a method is not part of a contract's interface.
pub fn unknown_method(contract: &str, method: &str) -> Revert {
    Revert(format!("{}: unknown method {}", contract, method))
}

/// A deployed contract instance.
///
/// Implementations own their storage. `execute` must leave `self`
/// unchanged when it returns `Err`, or be called on a clone; the chain
/// always does the latter.
pub trait Contract: Send + Sync {
    /// Artifact name this instance was created from.
    fn name(&self) -> &str;

    /// Runs `method` with `args`.
    fn execute(&mut self, env: &mut Env<'_>, method: &str, args: &[Token]) -> ExecResult<Token>;

    /// Boxed clone, for atomic execution.
    fn clone_box(&self) -> Box<dyn Contract>;
}

impl Clone for Box<dyn Contract> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Contract({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_passes_and_fails() {
        assert!(require(true, "nope").is_ok());
        assert_eq!(
            require(false, "NFTMarket__InvalidPrice").unwrap_err().reason(),
            "NFTMarket__InvalidPrice"
        );
    }

    #[test]
    fn revert_displays_reason() {
        assert_eq!(Revert::new("out of gas").to_string(), "out of gas");
        assert_eq!(
            unknown_method("NFTMarket", "burn").reason(),
            "NFTMarket: unknown method burn"
        );
    }
}
