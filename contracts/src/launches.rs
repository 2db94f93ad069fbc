//! # Launches — the Game Session Ledger
//!
//! Records every staked game session exactly once. A session is opened by
//! the player presenting the authorizer's signature over the full economic
//! terms (stake, reward rate, commitment, deadline); the stake moves from
//! the player into the asset's vault, and the session record itself is the
//! replay guard — created once, never mutated, never deleted.
//!
//! The composed entry point `start_game_and_claim_reward` settles a pending
//! reward and opens the next session in one atomic step, so a player rolls
//! winnings forward without an intermediate state other traffic could
//! observe.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use arcade_protocol::authorization::{session_digest, AuthorityVerifier, Ed25519Authority};
use arcade_protocol::config::COMMITMENT_LENGTH;
use arcade_protocol::token::TokenError;
use arcade_protocol::{ArcadeSignature, AssetId, AssetLedger};

use crate::factory::{FactoryError, VaultFactory};
use crate::vault::{ClaimTicket, Claimed, VaultError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur on the session ledger.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The session id was already consumed.
    #[error("session {session_id} already used")]
    SessionAlreadyUsed { session_id: u64 },

    /// The signed deadline has passed.
    #[error("authorization expired at {deadline}, current time {now}")]
    SignatureExpired {
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// No vault exists for the staked asset.
    #[error("asset {asset} is not whitelisted")]
    AssetNotWhitelisted { asset: AssetId },

    /// The authorizer's signature did not verify over the session terms.
    #[error("invalid authorization signature")]
    InvalidSignature,

    /// A zero stake was supplied.
    #[error("stake must be positive")]
    ZeroAmount,

    /// The stake transfer failed on the asset ledger.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A vault-side failure while crediting the stake.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// A factory-side failure during a composed operation.
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Authorizer-signed terms for one game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTicket {
    /// Unique session id; each value opens at most one session.
    pub session_id: u64,
    /// Commitment to the game's hidden parameters, `SHA-256(secret)`.
    pub commitment: [u8; COMMITMENT_LENGTH],
    /// Asset being staked.
    pub asset: AssetId,
    /// Stake amount, in smallest denomination.
    pub amount: u64,
    /// Reward rate for the session, in basis points.
    pub rate: u64,
    /// Signature validity deadline.
    pub deadline: DateTime<Utc>,
    /// The authorizer's signature over the session digest.
    pub signature: ArcadeSignature,
}

/// An opened session. Written once; existence is the replay guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub player: String,
    pub commitment: [u8; COMMITMENT_LENGTH],
    pub asset: AssetId,
    pub amount: u64,
    pub rate: u64,
    pub started_at: DateTime<Utc>,
}

/// Record of a session opening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStarted {
    pub ledger_id: String,
    pub session_id: u64,
    pub player: String,
    pub asset: AssetId,
    pub amount: u64,
    pub rate: u64,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Launches
// ---------------------------------------------------------------------------

/// The session ledger.
///
/// Stakes flow through the ledger's own account authority: players approve
/// the ledger on the asset ledger, and the ledger pulls the stake straight
/// into the vault's custody.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Launches {
    /// Instance id; also the spender identity for stake pulls.
    pub ledger_id: String,
    sessions: HashMap<u64, GameSession>,
}

impl Default for Launches {
    fn default() -> Self {
        Self::new()
    }
}

impl Launches {
    pub fn new() -> Self {
        Self {
            ledger_id: format!("launches-{}", Uuid::new_v4()),
            sessions: HashMap::new(),
        }
    }

    /// The session opened under `session_id`, if any.
    pub fn session(&self, session_id: u64) -> Option<&GameSession> {
        self.sessions.get(&session_id)
    }

    /// Opens a game session: verifies the authorizer's signature over the
    /// full terms, pulls the stake from the player into the asset's vault,
    /// and writes the session record.
    pub fn start_game(
        &mut self,
        factory: &mut VaultFactory,
        ledger: &mut AssetLedger,
        caller: &str,
        ticket: &SessionTicket,
        now: DateTime<Utc>,
    ) -> Result<GameStarted, LaunchError> {
        if self.sessions.contains_key(&ticket.session_id) {
            return Err(LaunchError::SessionAlreadyUsed {
                session_id: ticket.session_id,
            });
        }
        if now > ticket.deadline {
            return Err(LaunchError::SignatureExpired {
                deadline: ticket.deadline,
                now,
            });
        }
        if ticket.amount == 0 {
            return Err(LaunchError::ZeroAmount);
        }
        let vault_id = match factory.vault(&ticket.asset) {
            Some(vault) => vault.vault_id.clone(),
            None => {
                return Err(LaunchError::AssetNotWhitelisted {
                    asset: ticket.asset.clone(),
                })
            }
        };

        let digest = session_digest(
            factory.chain_id,
            &self.ledger_id,
            caller,
            ticket.session_id,
            &ticket.commitment,
            &ticket.asset,
            ticket.amount,
            ticket.rate,
            ticket.deadline,
        );
        let verifier = Ed25519Authority::new(factory.authorizer.clone());
        if !verifier.verify_digest(&digest, &ticket.signature) {
            return Err(LaunchError::InvalidSignature);
        }

        // Stake lands in the vault's custody account, and the vault's own
        // pool tracking moves with it.
        ledger.transfer_from(&ticket.asset, &self.ledger_id, caller, &vault_id, ticket.amount)?;
        factory.credit_stake(&ticket.asset, ticket.amount)?;

        self.sessions.insert(
            ticket.session_id,
            GameSession {
                player: caller.to_string(),
                commitment: ticket.commitment,
                asset: ticket.asset.clone(),
                amount: ticket.amount,
                rate: ticket.rate,
                started_at: now,
            },
        );

        info!(
            ledger = %self.ledger_id,
            session = ticket.session_id,
            player = caller,
            asset = %ticket.asset,
            stake = ticket.amount,
            rate = ticket.rate,
            "game started"
        );

        Ok(GameStarted {
            ledger_id: self.ledger_id.clone(),
            session_id: ticket.session_id,
            player: caller.to_string(),
            asset: ticket.asset.clone(),
            amount: ticket.amount,
            rate: ticket.rate,
            started_at: now,
        })
    }

    /// Settles a pending reward claim and opens the next session in one
    /// atomic step.
    ///
    /// All state touched by either half — the asset ledger, the factory and
    /// its vaults, the session map — is snapshotted at entry and restored
    /// wholesale if either half fails. A failed claim leaves the session id
    /// unused; a failed session leaves the claim nonce unused.
    pub fn start_game_and_claim_reward(
        &mut self,
        factory: &mut VaultFactory,
        ledger: &mut AssetLedger,
        caller: &str,
        ticket: &SessionTicket,
        claim: &ClaimTicket,
        now: DateTime<Utc>,
    ) -> Result<(GameStarted, Claimed), LaunchError> {
        let sessions_snapshot = self.sessions.clone();
        let factory_snapshot = factory.clone();
        let ledger_snapshot = ledger.clone();

        let result = self.start_game(factory, ledger, caller, ticket, now).and_then(|started| {
            let claimed = factory.pay_claim(ledger, &claim.asset, caller, caller, claim, now)?;
            Ok((started, claimed))
        });

        match result {
            Ok(events) => Ok(events),
            Err(err) => {
                warn!(
                    ledger = %self.ledger_id,
                    session = ticket.session_id,
                    nonce = claim.nonce,
                    error = %err,
                    "composed session+claim rolled back"
                );
                self.sessions = sessions_snapshot;
                *factory = factory_snapshot;
                *ledger = ledger_snapshot;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_protocol::config::CHAIN_ID_DEVNET;
    use arcade_protocol::crypto::ArcadeKeypair;
    use crate::factory::VaultLogic;
    use chrono::{Duration, TimeZone};

    const GOLD: &str = "GOLD";

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn setup() -> (ArcadeKeypair, VaultFactory, Launches, AssetLedger) {
        let authorizer = ArcadeKeypair::from_seed(&[2u8; 32]);
        let mut factory = VaultFactory::new(
            "owner",
            authorizer.public_key(),
            CHAIN_ID_DEVNET,
            VaultLogic::new("vault-logic", 1),
        );
        factory.create_vault(GOLD).unwrap();
        let launches = Launches::new();
        let ledger = AssetLedger::new();
        (authorizer, factory, launches, ledger)
    }

    fn signed_ticket(
        authorizer: &ArcadeKeypair,
        launches: &Launches,
        player: &str,
        session_id: u64,
        amount: u64,
    ) -> SessionTicket {
        let commitment = arcade_protocol::crypto::sha256(b"player secret");
        let deadline = t0() + Duration::hours(1);
        let digest = session_digest(
            CHAIN_ID_DEVNET,
            &launches.ledger_id,
            player,
            session_id,
            &commitment,
            GOLD,
            amount,
            150,
            deadline,
        );
        SessionTicket {
            session_id,
            commitment,
            asset: GOLD.to_string(),
            amount,
            rate: 150,
            deadline,
            signature: authorizer.sign(&digest),
        }
    }

    #[test]
    fn start_game_pulls_stake_into_vault() {
        let (authorizer, mut factory, mut launches, mut ledger) = setup();
        ledger.mint(GOLD, "player", 1_000).unwrap();
        ledger.approve(GOLD, "player", &launches.ledger_id, 1_000);

        let ticket = signed_ticket(&authorizer, &launches, "player", 50, 500);
        let event = launches
            .start_game(&mut factory, &mut ledger, "player", &ticket, t0())
            .unwrap();

        assert_eq!(event.session_id, 50);
        assert_eq!(ledger.balance_of(GOLD, "player"), 500);
        let vault = factory.vault(GOLD).unwrap();
        assert_eq!(ledger.balance_of(GOLD, &vault.vault_id), 500);
        assert_eq!(vault.total_assets, 500);
        assert_eq!(launches.session(50).unwrap().amount, 500);
    }

    #[test]
    fn session_id_is_single_use() {
        let (authorizer, mut factory, mut launches, mut ledger) = setup();
        ledger.mint(GOLD, "player", 1_000).unwrap();
        ledger.approve(GOLD, "player", &launches.ledger_id, 1_000);

        let ticket = signed_ticket(&authorizer, &launches, "player", 50, 100);
        launches
            .start_game(&mut factory, &mut ledger, "player", &ticket, t0())
            .unwrap();
        assert!(matches!(
            launches.start_game(&mut factory, &mut ledger, "player", &ticket, t0()),
            Err(LaunchError::SessionAlreadyUsed { session_id: 50 })
        ));
    }

    #[test]
    fn unwhitelisted_asset_rejected() {
        let (authorizer, mut factory, mut launches, mut ledger) = setup();
        let mut ticket = signed_ticket(&authorizer, &launches, "player", 50, 100);
        ticket.asset = "GEMS".to_string();
        assert!(matches!(
            launches.start_game(&mut factory, &mut ledger, "player", &ticket, t0()),
            Err(LaunchError::AssetNotWhitelisted { .. })
        ));
    }

    #[test]
    fn tampered_rate_rejected() {
        let (authorizer, mut factory, mut launches, mut ledger) = setup();
        ledger.mint(GOLD, "player", 1_000).unwrap();
        ledger.approve(GOLD, "player", &launches.ledger_id, 1_000);

        let mut ticket = signed_ticket(&authorizer, &launches, "player", 50, 100);
        ticket.rate = 10_000;
        assert!(matches!(
            launches.start_game(&mut factory, &mut ledger, "player", &ticket, t0()),
            Err(LaunchError::InvalidSignature)
        ));
        assert!(launches.session(50).is_none());
    }

    #[test]
    fn expired_ticket_rejected() {
        let (authorizer, mut factory, mut launches, mut ledger) = setup();
        let ticket = signed_ticket(&authorizer, &launches, "player", 50, 100);
        let late = ticket.deadline + Duration::seconds(1);
        assert!(matches!(
            launches.start_game(&mut factory, &mut ledger, "player", &ticket, late),
            Err(LaunchError::SignatureExpired { .. })
        ));
    }
}
