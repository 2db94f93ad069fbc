//! # Arcade Custody Contracts
//!
//! The fund-management layer for the Arcade play-to-earn economy. These
//! contracts hold player deposits, pay out authorizer-signed rewards, and
//! collect game-session stakes:
//!
//! - **Token Vault** — share-based custody of one asset, with a two-phase
//!   time-locked withdrawal queue and an early-exit fee.
//! - **Vault Factory** — spawns one vault per asset from a shared logic
//!   template, and retargets live vaults when the template moves on.
//! - **Launches** — the game-session ledger. Records each staked session
//!   exactly once and composes session start with a reward claim atomically.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — we use `checked_add` and
//!    `checked_sub` everywhere, because wrapping arithmetic and money do not
//!    mix.
//! 2. Every fund movement is gated by a signature from the off-chain
//!    authorizer, and every signed digest carries its own replay protection
//!    (chain id, instance id, caller, nonce).
//! 3. Failures are total: an operation either fully happens or leaves no
//!    trace, including across composed multi-contract calls.
//! 4. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod factory;
pub mod launches;
pub mod vault;

pub use factory::{FactoryError, VaultFactory, VaultLogic};
pub use launches::{LaunchError, Launches, SessionTicket};
pub use vault::{ClaimTicket, TokenVault, VaultError, VaultParams};
