//! # Key Management
//!
//! secp256k1 signing keys, recoverable signatures, and Ethereum-style
//! address derivation.
//!
//! An address is the last 20 bytes of the Keccak-256 of the uncompressed
//! public key (without its `0x04` prefix). Signatures are 65 bytes,
//! `r ‖ s ‖ v` with `v` the recovery id, so whoever holds a signed payload
//! can recover the signer's address without being told the public key.
//!
//! ## Security considerations
//!
//! - `OsRng` for key generation.
//! - `LocalSigner` does not implement `Serialize` and its `Debug` prints the
//!   address only. Exporting key bytes is an explicit call.
//! - The development accounts below are publicly known. Never fund them on
//!   a real network.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::hash::keccak256;
use crate::types::Address;

/// Errors from key parsing, signing, and recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid secret key: not a 32-byte scalar in range")]
    InvalidSecretKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("signing failed")]
    SigningFailed,

    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Private keys of the ten well-known local development accounts, in
/// account-index order. These are the accounts every local Ethereum
/// toolchain funds by default.
pub const DEV_PRIVATE_KEYS: [&str; 10] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
    "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a",
    "7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6",
    "47e179ec197488593b187f80a00eb0da91f1b9d0b13f8733639f19c30a34926a",
    "8b3a350cf5c34c9194ca85829a2df0ec3153be0318b5e2d3348e872092edffba",
    "92db14e403b83dfe3df233f83dfa3a0d7096f21ca9b0d6d6b8d88b2b4ec1564e",
    "4bbbf85ce3377467afe5d46f804f221813b2bb87f24d81f60f1fcdbf7cbf4356",
    "dbda1821b80551c9d65939329250298aa3472ba22feea921c0cf5d620ea67b97",
    "2a871d0798f97d79848a013d4936a73bf4cc922c825d33c1cf7073dff6d409c6",
];

// ---------------------------------------------------------------------------
// LocalSigner
// ---------------------------------------------------------------------------

/// A secp256k1 key held in memory, with its address cached.
///
/// # Examples
///
/// ```
/// use nftmarket_protocol::crypto::keccak256;
/// use nftmarket_protocol::crypto::keys::LocalSigner;
///
/// let signer = LocalSigner::generate();
/// let digest = keccak256(b"list token 0 for 69 wei");
/// let sig = signer.sign_digest(&digest).unwrap();
/// assert_eq!(sig.recover(&digest).unwrap(), signer.address());
/// ```
#[derive(Clone)]
pub struct LocalSigner {
    key: SigningKey,
    address: Address,
}

impl LocalSigner {
    /// Generates a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self::from_key(SigningKey::random(&mut OsRng))
    }

    /// Loads a key from its 32 raw bytes.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidSecretKey`] if the bytes are zero or not below the
    /// curve order.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        SigningKey::from_slice(bytes)
            .map(Self::from_key)
            .map_err(|_| KeyError::InvalidSecretKey)
    }

    /// Loads a key from hex, with or without a `0x` prefix. Surrounding
    /// whitespace is ignored so values read from `.env` files work as-is.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let s = s.trim();
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| KeyError::InvalidSecretKey)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Self::from_bytes(&arr)
    }

    /// The `index`-th development account, or `None` past the tenth.
    pub fn dev_account(index: usize) -> Option<Self> {
        DEV_PRIVATE_KEYS
            .get(index)
            .and_then(|key| Self::from_hex(key).ok())
    }

    /// All ten development accounts in index order.
    pub fn dev_accounts() -> Vec<Self> {
        (0..DEV_PRIVATE_KEYS.len())
            .filter_map(Self::dev_account)
            .collect()
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte digest.
    ///
    /// The digest is signed as-is (no further hashing), which is what
    /// transaction signing wants: callers pass the Keccak-256 of the
    /// canonical transaction bytes.
    ///
    /// # Errors
    ///
    /// [`KeyError::SigningFailed`] if the underlying ECDSA operation fails,
    /// which for a valid key and a 32-byte digest does not happen in practice.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, KeyError> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|_| KeyError::SigningFailed)?;
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recid.to_byte();
        Ok(Signature(bytes))
    }

    /// Exports the raw secret key. Handle with care.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.key.to_bytes());
        out
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalSigner({})", self.address)
    }
}

impl PartialEq for LocalSigner {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for LocalSigner {}

fn address_of(key: &VerifyingKey) -> Address {
    let point = key.as_affine().to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_digest(&digest)
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 65-byte recoverable ECDSA signature: `r ‖ s ‖ v`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    /// Recovers the signer's address from this signature over `digest`.
    ///
    /// # Errors
    ///
    /// [`KeyError::InvalidSignature`] for a malformed `r`, `s`, or `v`;
    /// [`KeyError::RecoveryFailed`] if no public key matches.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<Address, KeyError> {
        let sig =
            EcdsaSignature::from_slice(&self.0[..64]).map_err(|_| KeyError::InvalidSignature)?;
        let recid = RecoveryId::from_byte(self.0[64]).ok_or(KeyError::InvalidSignature)?;
        let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
            .map_err(|_| KeyError::RecoveryFailed)?;
        Ok(address_of(&key))
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parses `0x`-prefixed (or bare) hex.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| KeyError::InvalidSignature)?;
        let arr: [u8; 65] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSignature)?;
        Ok(Signature(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &self.to_hex()[..18])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_dev_account_address() {
        let signer = LocalSigner::dev_account(0).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn second_dev_account_address() {
        let signer = LocalSigner::dev_account(1).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );
    }

    #[test]
    fn dev_accounts_are_ten_and_distinct() {
        let accounts = LocalSigner::dev_accounts();
        assert_eq!(accounts.len(), 10);
        let mut addrs: Vec<_> = accounts.iter().map(|a| a.address()).collect();
        addrs.sort();
        addrs.dedup();
        assert_eq!(addrs.len(), 10);
        assert!(LocalSigner::dev_account(10).is_none());
    }

    #[test]
    fn from_hex_accepts_prefix_and_whitespace() {
        let a = LocalSigner::from_hex(DEV_PRIVATE_KEYS[0]).unwrap();
        let b = LocalSigner::from_hex(&format!("  0x{}\n", DEV_PRIVATE_KEYS[0])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert_eq!(
            LocalSigner::from_hex("0x1234").unwrap_err(),
            KeyError::InvalidSecretKey
        );
        assert_eq!(
            LocalSigner::from_hex(&"00".repeat(32)).unwrap_err(),
            KeyError::InvalidSecretKey
        );
    }

    #[test]
    fn sign_and_recover() {
        let signer = LocalSigner::generate();
        let digest = keccak256(b"buy token 3");
        let sig = signer.sign_digest(&digest).unwrap();
        assert_eq!(sig.recover(&digest).unwrap(), signer.address());
    }

    #[test]
    fn recover_with_other_digest_gives_other_address() {
        let signer = LocalSigner::generate();
        let sig = signer.sign_digest(&keccak256(b"one")).unwrap();
        let recovered = sig.recover(&keccak256(b"two"));
        assert!(recovered.map(|a| a != signer.address()).unwrap_or(true));
    }

    #[test]
    fn signature_hex_roundtrip() {
        let signer = LocalSigner::generate();
        let sig = signer.sign_digest(&keccak256(b"x")).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(sig, back);
    }

    #[test]
    fn debug_hides_secret() {
        let signer = LocalSigner::dev_account(0).unwrap();
        let dbg = format!("{:?}", signer);
        assert!(!dbg.contains(DEV_PRIVATE_KEYS[0]));
        assert!(dbg.contains("0xf39f"));
    }
}
