//! Positional argument decoding with revert-on-mismatch.

use super::{ExecResult, Revert};
use crate::abi::Token;
use crate::types::Address;

/// Typed view over a method's arguments.
///
/// Every accessor reverts with `"<method>: argument <i> must be <type>"`
/// when the argument is missing or has the wrong type.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    method: &'a str,
    args: &'a [Token],
}

impl<'a> Args<'a> {
    pub fn new(method: &'a str, args: &'a [Token]) -> Self {
        Self { method, args }
    }

    /// Reverts unless exactly `n` arguments were passed.
    pub fn expect_len(&self, n: usize) -> ExecResult<()> {
        if self.args.len() == n {
            Ok(())
        } else {
            Err(Revert(format!(
                "{}: expected {} arguments, got {}",
                self.method,
                n,
                self.args.len()
            )))
        }
    }

    fn bad(&self, index: usize, kind: &str) -> Revert {
        Revert(format!(
            "{}: argument {} must be {}",
            self.method, index, kind
        ))
    }

    pub fn uint(&self, index: usize) -> ExecResult<u128> {
        self.args
            .get(index)
            .and_then(Token::as_uint)
            .ok_or_else(|| self.bad(index, "uint"))
    }

    /// A `uint` that must fit in 64 bits, such as a token id.
    pub fn u64(&self, index: usize) -> ExecResult<u64> {
        self.args
            .get(index)
            .and_then(Token::as_u64)
            .ok_or_else(|| self.bad(index, "uint64"))
    }

    pub fn address(&self, index: usize) -> ExecResult<Address> {
        self.args
            .get(index)
            .and_then(Token::as_address)
            .ok_or_else(|| self.bad(index, "address"))
    }

    pub fn string(&self, index: usize) -> ExecResult<&'a str> {
        self.args
            .get(index)
            .and_then(Token::as_str)
            .ok_or_else(|| self.bad(index, "string"))
    }

    pub fn bool(&self, index: usize) -> ExecResult<bool> {
        self.args
            .get(index)
            .and_then(Token::as_bool)
            .ok_or_else(|| self.bad(index, "bool"))
    }
}
