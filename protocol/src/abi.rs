//! Contract argument and return values.
//!
//! A deliberately small ABI: unsigned integers, addresses, strings, bools,
//! and tuples cover every entry point of the marketplace. Tokens have a
//! canonical byte encoding (used when hashing transactions) and a tagged
//! JSON form (used on the RPC wire):
//!
//! ```text
//! {"type":"uint","value":"69"}
//! {"type":"address","value":"0x…"}
//! {"type":"tuple","value":[{"type":"string","value":"uri"}]}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Address;

/// A single ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Token {
    /// Unsigned integer, up to 128 bits.
    Uint(#[serde(with = "crate::types::quantity")] u128),
    /// A 20-byte address.
    Address(Address),
    /// UTF-8 string.
    String(String),
    /// Boolean.
    Bool(bool),
    /// Ordered group of values. The empty tuple is the "no return value".
    Tuple(Vec<Token>),
}

impl Token {
    /// The value returned by methods that return nothing.
    pub fn void() -> Self {
        Token::Tuple(Vec::new())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Token::Tuple(items) if items.is_empty())
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Token::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Narrowing accessor for ids and counters.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_uint().and_then(|v| u64::try_from(v).ok())
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Token]> {
        match self {
            Token::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the variant as it appears in method signatures.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Uint(_) => "uint",
            Token::Address(_) => "address",
            Token::String(_) => "string",
            Token::Bool(_) => "bool",
            Token::Tuple(_) => "tuple",
        }
    }

    /// Appends the canonical encoding of this token to `buf`.
    ///
    /// One tag byte, then a fixed-width or length-prefixed body. Integers
    /// are big-endian so the encoding sorts the same way the values do.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Token::Uint(v) => {
                buf.push(0x01);
                buf.extend_from_slice(&v.to_be_bytes());
            }
            Token::Address(a) => {
                buf.push(0x02);
                buf.extend_from_slice(a.as_bytes());
            }
            Token::String(s) => {
                buf.push(0x03);
                buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Token::Bool(b) => {
                buf.push(0x04);
                buf.push(u8::from(*b));
            }
            Token::Tuple(items) => {
                buf.push(0x05);
                buf.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    item.encode_into(buf);
                }
            }
        }
    }

    /// Canonical encoding of a whole argument list.
    pub fn encode_all(tokens: &[Token]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(tokens.len() * 24);
        buf.extend_from_slice(&(tokens.len() as u32).to_be_bytes());
        for token in tokens {
            token.encode_into(&mut buf);
        }
        buf
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Uint(v) => write!(f, "{}", v),
            Token::Address(a) => write!(f, "{}", a),
            Token::String(s) => write!(f, "{:?}", s),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<u64> for Token {
    fn from(v: u64) -> Self {
        Token::Uint(v as u128)
    }
}

impl From<u128> for Token {
    fn from(v: u128) -> Self {
        Token::Uint(v)
    }
}

impl From<Address> for Token {
    fn from(a: Address) -> Self {
        Token::Address(a)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::String(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::String(s)
    }
}

impl From<bool> for Token {
    fn from(b: bool) -> Self {
        Token::Bool(b)
    }
}
