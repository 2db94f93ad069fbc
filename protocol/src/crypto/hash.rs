//! # Hashing Utilities
//!
//! Two hash functions, and we refuse to support more without a very good
//! reason:
//!
//! - **BLAKE3** — the default. Fast on every platform, parallelizable, and
//!   used for every authorization digest in the protocol.
//! - **SHA-256** — for interoperability with systems that chose SHA-256 in
//!   2009 and are now stuck with it. Game commitments use it so that
//!   off-chain game servers in any language can reproduce them.

use sha2::{Digest, Sha256};

use crate::config::DIGEST_LENGTH;

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. This is the workhorse
/// hash of the protocol — authorization digests, vault instance ids,
/// anything Arcade-native.
pub fn blake3_hash(data: &[u8]) -> [u8; DIGEST_LENGTH] {
    *blake3::hash(data).as_bytes()
}

/// Compute the SHA-256 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. Used for game
/// commitments: `commitment = SHA-256(player_secret)`, reproducible from
/// any language's standard crypto library.
pub fn sha256(data: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; DIGEST_LENGTH];
    output.copy_from_slice(&result);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_is_deterministic() {
        assert_eq!(blake3_hash(b"arcade"), blake3_hash(b"arcade"));
        assert_ne!(blake3_hash(b"arcade"), blake3_hash(b"arcane"));
    }

    #[test]
    fn sha256_known_vector() {
        // SHA-256 of the empty string — the one test vector everyone knows.
        let digest = sha256(b"");
        assert_eq!(
            hex::encode(digest),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hashes_differ_between_functions() {
        // Same input, different functions, different digests. If this ever
        // fails, buy a lottery ticket.
        assert_ne!(blake3_hash(b"input"), sha256(b"input"));
    }
}
