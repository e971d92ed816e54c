//! Compiled-contract stand-ins: what a deployment transaction names.

use std::collections::BTreeMap;
use std::fmt;

use super::{Contract, Env, ExecResult};
use crate::abi::Token;
use crate::crypto::hash::keccak256;
use crate::types::H256;

/// Builds a contract instance from constructor arguments. Runs inside the
/// creation transaction, so it may charge gas and emit logs.
pub type Constructor = fn(&mut Env<'_>, &[Token]) -> ExecResult<Box<dyn Contract>>;

/// A deployable contract: its name, its source text (submitted for
/// verification and hashed into the code hash), and its constructor.
#[derive(Clone, Copy)]
pub struct Artifact {
    pub name: &'static str,
    pub source: &'static str,
    pub constructor: Constructor,
}

impl Artifact {
    /// `keccak256(source)`. Stored as the account's code hash, and compared
    /// by the deployment cache to detect changed code.
    pub fn code_hash(&self) -> H256 {
        H256(keccak256(self.source.as_bytes()))
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("code_hash", &self.code_hash())
            .finish()
    }
}

/// Artifacts by name.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    artifacts: BTreeMap<&'static str, Artifact>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `artifact`, replacing any previous one of the same name.
    pub fn register(&mut self, artifact: Artifact) {
        self.artifacts.insert(artifact.name, artifact);
    }

    /// Chainable [`ArtifactRegistry::register`].
    pub fn with(mut self, artifact: Artifact) -> Self {
        self.register(artifact);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.artifacts.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{unknown_method, Revert};

    #[derive(Clone)]
    struct Noop;

    impl Contract for Noop {
        fn name(&self) -> &str {
            "Noop"
        }

        fn execute(&mut self, _: &mut Env<'_>, method: &str, _: &[Token]) -> ExecResult<Token> {
            Err(unknown_method("Noop", method))
        }

        fn clone_box(&self) -> Box<dyn Contract> {
            Box::new(self.clone())
        }
    }

    fn construct(_: &mut Env<'_>, args: &[Token]) -> ExecResult<Box<dyn Contract>> {
        if !args.is_empty() {
            return Err(Revert::new("no arguments"));
        }
        Ok(Box::new(Noop))
    }

    const NOOP: Artifact = Artifact {
        name: "Noop",
        source: "contract Noop {}",
        constructor: construct,
    };

    #[test]
    fn registry_lookup() {
        let registry = ArtifactRegistry::new().with(NOOP);
        assert!(registry.get("Noop").is_some());
        assert!(registry.get("Other").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Noop"]);
    }

    #[test]
    fn code_hash_follows_source() {
        let changed = Artifact {
            source: "contract Noop { }",
            ..NOOP
        };
        assert_eq!(NOOP.code_hash(), NOOP.code_hash());
        assert_ne!(NOOP.code_hash(), changed.code_hash());
    }
}
