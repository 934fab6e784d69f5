//! Hash combiner boundary.
//!
//! The core never commits to a hash function: Merkleization is expressed
//! against a caller-supplied 2-to-1 combiner. Words enter the combiner in
//! their canonical 8-byte big-endian encoding; everything else about the
//! combiner (identity, domain separation, output width) is opaque here.
//!
//! [`Sha256Hash2`] is the combiner used by the test vectors.

use sha2::{Digest, Sha256};

use crate::key::{word_bytes, Word};

/// A 2-to-1 hash combiner.
pub trait Hash2 {
    /// Combine two byte strings into one digest.
    fn hash2(a: &[u8], b: &[u8]) -> Vec<u8>;

    /// Combine a key/value pair in canonical word encoding.
    fn hash_pair(key: Word, value: Word) -> Vec<u8> {
        Self::hash2(&word_bytes(key), &word_bytes(value))
    }

    /// Fold a word into an existing digest.
    fn hash_with_word(digest: &[u8], w: Word) -> Vec<u8> {
        Self::hash2(digest, &word_bytes(w))
    }
}

/// SHA-256 as a 2-to-1 combiner: `H(a, b) = SHA-256(a || b)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hash2;

impl Hash2 for Sha256Hash2 {
    fn hash2(a: &[u8], b: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(a);
        hasher.update(b);
        hasher.finalize().to_vec()
    }
}

/// Render a digest as lowercase hex, as the test vectors are written.
#[must_use]
pub fn to_hex(digest: &[u8]) -> String {
    let mut s = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(s, "{byte:02x}");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::{to_hex, Hash2, Sha256Hash2};

    #[test]
    fn test_hash_pair_vector() {
        // First fingerprint of the 2-3 root-hash table: a single-entry leaf.
        let digest = Sha256Hash2::hash_pair(1, 1);
        assert_eq!(
            to_hex(&digest),
            "532deabf88729cb43995ab5a9cd49bf9b90a079904dc0645ecda9e47ce7345a9"
        );
    }

    #[test]
    fn test_hash2_is_concatenation_order_sensitive() {
        let ab = Sha256Hash2::hash2(b"a", b"b");
        let ba = Sha256Hash2::hash2(b"b", b"a");
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0xff, 0x1a]), "00ff1a");
        assert_eq!(to_hex(&[]), "");
    }
}
