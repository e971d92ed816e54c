//! # Hashing Utilities
//!
//! Keccak-256 (the pre-standard SHA-3 variant Ethereum uses, not FIPS-202
//! SHA3-256) and a binary Merkle root built on it.
//!
//! The Merkle root commits a block to its ordered transaction hashes. A
//! single leaf is paired with itself and odd levels duplicate their last
//! node, so the root is always the output of a hash.

use sha3::{Digest, Keccak256};

/// Keccak-256 of `data`.
///
/// # Example
///
/// ```
/// use nftmarket_protocol::crypto::keccak256;
///
/// let digest = keccak256(b"");
/// assert_eq!(
///     hex::encode(digest),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Keccak-256 over the concatenation of `parts`, without allocating the
/// concatenation.
pub fn keccak256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Binary Merkle root over `leaves`. Empty input yields all zeros.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0u8; 32];
    }

    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    if level.len() == 1 {
        return keccak256_multi(&[level[0].as_slice(), level[0].as_slice()]);
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                keccak256_multi(&[pair[0].as_slice(), right.as_slice()])
            })
            .collect();
    }

    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn keccak_multi_matches_concatenation() {
        assert_eq!(
            keccak256_multi(&[b"hello", b" world"]),
            keccak256(b"hello world")
        );
    }

    #[test]
    fn merkle_root_empty_is_zero() {
        assert_eq!(merkle_root(&[]), [0u8; 32]);
    }

    #[test]
    fn merkle_root_single_leaf_pairs_with_itself() {
        let leaf = keccak256(b"only");
        assert_eq!(
            merkle_root(&[leaf]),
            keccak256_multi(&[leaf.as_slice(), leaf.as_slice()])
        );
    }

    #[test]
    fn merkle_root_odd_level_duplicates_last() {
        let a = keccak256(b"a");
        let b = keccak256(b"b");
        let c = keccak256(b"c");
        let ab = keccak256_multi(&[a.as_slice(), b.as_slice()]);
        let cc = keccak256_multi(&[c.as_slice(), c.as_slice()]);
        assert_eq!(
            merkle_root(&[a, b, c]),
            keccak256_multi(&[ab.as_slice(), cc.as_slice()])
        );
    }

    #[test]
    fn merkle_root_order_matters() {
        let a = keccak256(b"first");
        let b = keccak256(b"second");
        assert_ne!(merkle_root(&[a, b]), merkle_root(&[b, a]));
    }
}
