//! # Arcade Protocol — Core Library
//!
//! The custody layer for a play-to-earn token economy. Players stake tokens
//! to open game sessions, an off-chain authority co-signs the economic terms,
//! and pooled vaults hold and disburse funds under share-based accounting.
//! This crate provides the primitives the contracts are built on; the
//! contracts themselves live in `arcade-contracts`.
//!
//! ## Architecture
//!
//! - **crypto** — Ed25519 keys and signatures, BLAKE3/SHA-256 hashing.
//!   Thin wrappers over audited implementations; nothing hand-rolled.
//! - **authorization** — The signature authorization library. Builds
//!   replay-protected digests over economic claims and verifies them against
//!   the trusted authority. Every fund movement in the system goes through
//!   here exactly once.
//! - **token** — The fungible asset ledger: balances and allowances for the
//!   staked and rewarded tokens. The contracts treat this as an external
//!   collaborator, the same way an EVM contract treats an ERC-20.
//! - **config** — Protocol constants and default parameters.
//!
//! ## Design Philosophy
//!
//! 1. Checked arithmetic everywhere money moves. Wrapping and money do not mix.
//! 2. Signature verification is pure and uniform — one `false`, no error oracle.
//! 3. The execution substrate owns the clock: time-sensitive operations take
//!    the transaction timestamp as an argument rather than reading a wall clock.
//! 4. If it touches money, it has tests. Plural.

pub mod authorization;
pub mod config;
pub mod crypto;
pub mod token;

pub use authorization::{AuthorityVerifier, DigestBuilder, Ed25519Authority};
pub use crypto::{ArcadeKeypair, ArcadePublicKey, ArcadeSignature};
pub use token::{AssetId, AssetLedger};
