//! # Protocol Configuration & Constants
//!
//! Every magic number in Arcade lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values are bound into signed digests and fee math, so changing them
//! after launch invalidates outstanding authorizations. Choose wisely.

// ---------------------------------------------------------------------------
// Execution Domains
// ---------------------------------------------------------------------------

/// Mainnet domain identifier — the real deal. Bound into every signed
/// digest so a signature issued for one domain is garbage on another.
pub const CHAIN_ID_MAINNET: u64 = 0x41524341; // "ARCA" in ASCII hex. Yes, we're that cute.

/// Testnet domain identifier — where we break things on purpose.
pub const CHAIN_ID_TESTNET: u64 = 0x41524354; // "ARCT"

/// Devnet domain identifier — reset weekly, no promises, no survivors.
pub const CHAIN_ID_DEVNET: u64 = 0x41524344; // "ARCD"

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 secret keys are 32 bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes. If yours isn't, something
/// has gone terribly wrong.
pub const SIGNATURE_LENGTH: usize = 64;

/// Digest output length in bytes. BLAKE3 produces 32-byte digests.
pub const DIGEST_LENGTH: usize = 32;

/// Game commitments are 32-byte hashes of the player's secret.
pub const COMMITMENT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Fee & Lock Parameters
// ---------------------------------------------------------------------------

/// Fee rates are expressed in basis points. 1 bp = 0.01%, so the
/// denominator is 10_000. Same convention as every other protocol that
/// learned percentages are a rounding-error factory.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default early-exit fee rate for new factories: 100 bps = 1%.
pub const DEFAULT_FEE_RATE_BPS: u64 = 100;

/// Default withdrawal lock period for new factories: one day. Completing a
/// withdrawal earlier than this is allowed but charged the early-exit fee.
pub const DEFAULT_LOCK_PERIOD_SECS: u64 = 86_400;

/// Hard ceiling on configurable fee rates. A factory owner who wants more
/// than 20% of an early exit is running a rug, not a protocol.
pub const MAX_FEE_RATE_BPS: u64 = 2_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_are_distinct() {
        // If these collide, someone has been editing hex while sleep-deprived.
        assert_ne!(CHAIN_ID_MAINNET, CHAIN_ID_TESTNET);
        assert_ne!(CHAIN_ID_MAINNET, CHAIN_ID_DEVNET);
        assert_ne!(CHAIN_ID_TESTNET, CHAIN_ID_DEVNET);
    }

    #[test]
    fn chain_ids_are_valid_ascii() {
        // The domain ids should decode to readable 4-char ASCII tags.
        let bytes = (CHAIN_ID_MAINNET as u32).to_be_bytes();
        assert!(bytes.iter().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn fee_constants_sanity() {
        assert!(DEFAULT_FEE_RATE_BPS <= MAX_FEE_RATE_BPS);
        assert!(MAX_FEE_RATE_BPS < BPS_DENOMINATOR);
        assert!(DEFAULT_LOCK_PERIOD_SECS > 0);
    }

    #[test]
    fn crypto_parameter_sizes() {
        assert_eq!(SIGNING_KEY_LENGTH, 32);
        assert_eq!(VERIFYING_KEY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(DIGEST_LENGTH, 32);
        assert_eq!(COMMITMENT_LENGTH, 32);
    }
}
