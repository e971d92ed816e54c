//! A small contract for exercising the chain, wallets and the deploy
//! pipeline without the marketplace.

use super::{require, unknown_method, Args, Artifact, Contract, Env, ExecResult};
use crate::abi::Token;
use crate::transaction::Log;

#[derive(Clone, Default)]
pub(crate) struct Counter {
    count: u128,
}

impl Contract for Counter {
    fn name(&self) -> &str {
        "Counter"
    }

    fn execute(&mut self, env: &mut Env<'_>, method: &str, args: &[Token]) -> ExecResult<Token> {
        let args = Args::new(method, args);
        match method {
            "increment" => {
                env.non_payable()?;
                env.sstore(self.count == 0)?;
                self.count += 1;
                let log = Log::new(env.this(), "Incremented").with("count", self.count);
                env.emit(log)?;
                Ok(Token::void())
            }
            "incrementThenFail" => {
                self.count += 1;
                require(false, "Counter: failed on purpose")?;
                Ok(Token::void())
            }
            "deposit" => Ok(Token::void()),
            "add" => {
                let n = args.uint(0)?;
                require(n > 0, "Counter: zero")?;
                env.sstore(false)?;
                self.count += n;
                Ok(Token::void())
            }
            "count" => Ok(Token::Uint(self.count)),
            _ => Err(unknown_method("Counter", method)),
        }
    }

    fn clone_box(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }
}

fn construct(_: &mut Env<'_>, _: &[Token]) -> ExecResult<Box<dyn Contract>> {
    Ok(Box::new(Counter::default()))
}

pub(crate) const COUNTER: Artifact = Artifact {
    name: "Counter",
    source: "contract Counter { uint count; }",
    constructor: construct,
};
