//! # Signature Authorization Library
//!
//! Stateless verification of signed economic claims. Every fund movement in
//! the protocol — reward claims, session stakes — is gated by a digest that
//! the off-chain authorizer signed, and this module is the single place that
//! digest is built and checked.
//!
//! ## Replay protection by construction
//!
//! Each digest binds, in order:
//!
//! 1. the **execution-domain id** (chain id) — a signature for testnet is
//!    garbage on mainnet;
//! 2. the **contract instance id** — a signature for vault A cannot be
//!    redeemed against vault B;
//! 3. the **invoking account** — a signature issued to one player cannot be
//!    redeemed by another;
//! 4. every economically relevant field of the operation.
//!
//! The nonce/session-id single-use bookkeeping lives with the contracts
//! (it is state); everything here is pure.
//!
//! ## Uniform failure
//!
//! Verification returns a bare `bool`. Wrong signer, tampered amount, wrong
//! caller — all the same `false`. Detailed failure reasons are an oracle
//! we refuse to provide.

use chrono::{DateTime, Utc};

use crate::config::{COMMITMENT_LENGTH, DIGEST_LENGTH};
use crate::crypto::hash::blake3_hash;
use crate::crypto::{ArcadeKeypair, ArcadePublicKey, ArcadeSignature};

// ---------------------------------------------------------------------------
// DigestBuilder
// ---------------------------------------------------------------------------

/// Byte-packs heterogeneous fields into a BLAKE3 digest.
///
/// Integers are fixed-width big-endian. Variable-length fields (account ids,
/// asset ids) are length-prefixed, which closes the concatenation-ambiguity
/// hole: `("ab", "c")` and `("a", "bc")` must not produce the same digest.
/// EVM-style `abi.encodePacked` gets away without prefixes because addresses
/// are fixed-width; our string identifiers are not.
#[derive(Debug, Default)]
pub struct DigestBuilder {
    buf: Vec<u8>,
}

impl DigestBuilder {
    /// Start an empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fixed-width unsigned integer.
    pub fn u64(mut self, value: u64) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    /// Append a UTC timestamp as its unix-seconds representation.
    pub fn timestamp(self, value: DateTime<Utc>) -> Self {
        self.u64(value.timestamp() as u64)
    }

    /// Append a length-prefixed byte string.
    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.buf.extend_from_slice(&(value.len() as u64).to_be_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    /// Append a length-prefixed UTF-8 string (account ids, asset ids).
    pub fn str(self, value: &str) -> Self {
        self.bytes(value.as_bytes())
    }

    /// Finalize into a 32-byte BLAKE3 digest.
    pub fn finish(self) -> [u8; DIGEST_LENGTH] {
        blake3_hash(&self.buf)
    }
}

// ---------------------------------------------------------------------------
// Digest layouts
// ---------------------------------------------------------------------------

/// Digest for a reward claim against a vault.
///
/// Field order mirrors the original wire format:
/// `{chain, vault, nonce, claimer, asset, amount, deadline}`.
#[allow(clippy::too_many_arguments)]
pub fn claim_digest(
    chain_id: u64,
    vault_id: &str,
    nonce: u64,
    claimer: &str,
    asset: &str,
    amount: u64,
    deadline: DateTime<Utc>,
) -> [u8; DIGEST_LENGTH] {
    DigestBuilder::new()
        .u64(chain_id)
        .str(vault_id)
        .u64(nonce)
        .str(claimer)
        .str(asset)
        .u64(amount)
        .timestamp(deadline)
        .finish()
}

/// Digest for a game-session start against the session ledger.
///
/// Binds the full economic terms: `{chain, ledger, player, session,
/// commitment, asset, amount, rate, deadline}`.
#[allow(clippy::too_many_arguments)]
pub fn session_digest(
    chain_id: u64,
    ledger_id: &str,
    player: &str,
    session_id: u64,
    commitment: &[u8; COMMITMENT_LENGTH],
    asset: &str,
    amount: u64,
    rate: u64,
    deadline: DateTime<Utc>,
) -> [u8; DIGEST_LENGTH] {
    DigestBuilder::new()
        .u64(chain_id)
        .str(ledger_id)
        .str(player)
        .u64(session_id)
        .bytes(commitment)
        .str(asset)
        .u64(amount)
        .u64(rate)
        .timestamp(deadline)
        .finish()
}

// ---------------------------------------------------------------------------
// AuthorityVerifier
// ---------------------------------------------------------------------------

/// The seam between the contracts and the trusted signer.
///
/// The protocol currently trusts a single off-chain key, but the contracts
/// only ever see this trait, so swapping in a multi-signer quorum or a
/// policy engine later touches zero accounting code.
pub trait AuthorityVerifier {
    /// Returns `true` iff `signature` is the expected authority's signature
    /// over `digest`. Pure; reads no state beyond the configured identity.
    fn verify_digest(&self, digest: &[u8; DIGEST_LENGTH], signature: &ArcadeSignature) -> bool;

    /// The authority's account identity, for event records and logging.
    fn authority_id(&self) -> String;
}

/// Single trusted Ed25519 signer — the deployed configuration.
#[derive(Debug, Clone)]
pub struct Ed25519Authority {
    public_key: ArcadePublicKey,
}

impl Ed25519Authority {
    /// Create a verifier trusting the given public key.
    pub fn new(public_key: ArcadePublicKey) -> Self {
        Self { public_key }
    }

    /// Convenience constructor from the signer's keypair (tests, tooling).
    pub fn from_keypair(keypair: &ArcadeKeypair) -> Self {
        Self::new(keypair.public_key())
    }
}

impl AuthorityVerifier for Ed25519Authority {
    fn verify_digest(&self, digest: &[u8; DIGEST_LENGTH], signature: &ArcadeSignature) -> bool {
        self.public_key.verify(digest, signature)
    }

    fn authority_id(&self) -> String {
        self.public_key.to_hex()
    }
}
