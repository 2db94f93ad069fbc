//! # Vault Factory Contract
//!
//! Spawns and administers one [`TokenVault`] per asset. Every vault is a
//! clone of the factory's current logic template — an explicit `{id,
//! version}` descriptor, never language-level inheritance — and the factory
//! is the single indirection point a vault consults when its logic needs to
//! move: swapping the template changes future clones, and
//! `batch_upgrade_vaults` retargets the live ones.
//!
//! The factory also owns the economic dials the vaults read at settlement
//! time (early-exit fee rate, lock period) and routes early-exit fees to
//! its owner.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use arcade_protocol::authorization::Ed25519Authority;
use arcade_protocol::config::{
    DEFAULT_FEE_RATE_BPS, DEFAULT_LOCK_PERIOD_SECS, MAX_FEE_RATE_BPS,
};
use arcade_protocol::crypto::ArcadePublicKey;
use arcade_protocol::{AssetId, AssetLedger};

use crate::vault::{
    ClaimTicket, Claimed, Deposit, FundsSwept, TokenVault, VaultError, VaultParams,
    WithdrawalFinalized, WithdrawalRequested,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during factory operations.
#[derive(Debug, Error)]
pub enum FactoryError {
    /// Only the factory owner may perform this operation.
    #[error("caller is not the factory owner")]
    NotOwner,

    /// A vault for this asset already exists.
    #[error("vault already exists for asset {asset}")]
    VaultExists { asset: AssetId },

    /// No vault is registered for this asset.
    #[error("no vault registered for asset {asset}")]
    UnknownVault { asset: AssetId },

    /// A batch upgrade named a vault id the registry does not contain.
    #[error("unknown vault id {vault_id}")]
    UnknownVaultId { vault_id: String },

    /// A batch upgrade contained an empty vault id.
    #[error("empty vault id in upgrade batch")]
    EmptyVaultId,

    /// The requested fee rate exceeds the protocol ceiling.
    #[error("fee rate {requested} bps exceeds maximum {max} bps")]
    FeeRateTooHigh { requested: u64, max: u64 },

    /// An operation on the targeted vault failed.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A vault logic template: the dispatch identity a vault instance carries.
///
/// Upgrades move this pointer; they never touch instance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultLogic {
    /// Stable identifier of the logic artifact.
    pub id: String,
    /// Monotonically increasing template version.
    pub version: u32,
}

impl VaultLogic {
    pub fn new(id: &str, version: u32) -> Self {
        Self {
            id: id.to_string(),
            version,
        }
    }
}

impl std::fmt::Display for VaultLogic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@v{}", self.id, self.version)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Record of a freshly cloned vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultCreated {
    pub factory_id: String,
    pub vault_id: String,
    pub asset: AssetId,
    pub logic: VaultLogic,
}

/// Record of a template swap. Affects future clones only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateUpdated {
    pub previous: VaultLogic,
    pub current: VaultLogic,
}

/// Record of a completed batch upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultsUpgraded {
    pub vault_ids: Vec<String>,
    pub logic: VaultLogic,
}

/// Record of a vault leaving the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRemoved {
    pub vault_id: String,
    pub asset: AssetId,
}

// ---------------------------------------------------------------------------
// VaultFactory
// ---------------------------------------------------------------------------

/// Registry and administrator of all token vaults.
///
/// Clonable in full — the session ledger snapshots the factory to get
/// transaction-style rollback for composed operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFactory {
    /// Instance id; vaults check it when gating factory-only entry points.
    pub factory_id: String,
    /// Administrative owner and early-exit fee recipient.
    pub owner: String,
    /// Public key of the trusted off-chain authorizer.
    pub authorizer: ArcadePublicKey,
    /// Execution-domain id bound into every signed digest.
    pub chain_id: u64,
    /// Template future clones are minted from.
    pub template: VaultLogic,
    /// Early-exit fee in basis points.
    pub fee_rate_bps: u64,
    /// Withdrawal lock period in seconds.
    pub lock_period_secs: u64,
    vaults: HashMap<AssetId, TokenVault>,
}

impl VaultFactory {
    /// Creates a factory with the protocol's default fee rate and lock
    /// period.
    pub fn new(owner: &str, authorizer: ArcadePublicKey, chain_id: u64, template: VaultLogic) -> Self {
        Self {
            factory_id: format!("factory-{}", Uuid::new_v4()),
            owner: owner.to_string(),
            authorizer,
            chain_id,
            template,
            fee_rate_bps: DEFAULT_FEE_RATE_BPS,
            lock_period_secs: DEFAULT_LOCK_PERIOD_SECS,
            vaults: HashMap::new(),
        }
    }

    /// The vault registered for `asset`, if any.
    pub fn vault(&self, asset: &str) -> Option<&TokenVault> {
        self.vaults.get(asset)
    }

    /// Number of registered vaults.
    pub fn vault_count(&self) -> usize {
        self.vaults.len()
    }

    fn vault_mut(&mut self, asset: &str) -> Result<&mut TokenVault, FactoryError> {
        self.vaults.get_mut(asset).ok_or_else(|| FactoryError::UnknownVault {
            asset: asset.to_string(),
        })
    }

    fn require_owner(&self, caller: &str) -> Result<(), FactoryError> {
        if caller != self.owner {
            return Err(FactoryError::NotOwner);
        }
        Ok(())
    }

    fn verifier(&self) -> Ed25519Authority {
        Ed25519Authority::new(self.authorizer.clone())
    }

    fn params(&self) -> VaultParams {
        VaultParams {
            fee_rate_bps: self.fee_rate_bps,
            lock_period_secs: self.lock_period_secs,
            fee_recipient: self.owner.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Clones the current template into a new vault for `asset`.
    ///
    /// Deliberately ungated — anyone may open a market for a new asset, but
    /// only one vault per asset ever exists.
    pub fn create_vault(&mut self, asset: &str) -> Result<VaultCreated, FactoryError> {
        if self.vaults.contains_key(asset) {
            return Err(FactoryError::VaultExists {
                asset: asset.to_string(),
            });
        }

        let vault_id = format!("vault-{}", Uuid::new_v4());
        let vault = TokenVault::new(
            vault_id.clone(),
            asset.to_string(),
            self.factory_id.clone(),
            self.template.clone(),
        );
        self.vaults.insert(asset.to_string(), vault);

        info!(factory = %self.factory_id, vault = %vault_id, asset, "vault created");

        Ok(VaultCreated {
            factory_id: self.factory_id.clone(),
            vault_id,
            asset: asset.to_string(),
            logic: self.template.clone(),
        })
    }

    /// Swaps the clone template. Live vaults keep their current logic until
    /// explicitly upgraded.
    pub fn set_template(&mut self, caller: &str, new: VaultLogic) -> Result<TemplateUpdated, FactoryError> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.template, new.clone());
        info!(factory = %self.factory_id, from = %previous, to = %new, "template updated");
        Ok(TemplateUpdated {
            previous,
            current: new,
        })
    }

    /// Retargets every listed vault at `new_logic`, all or nothing.
    ///
    /// The whole list is resolved before anything moves: one empty or
    /// unknown id rejects the entire batch with no vault touched.
    pub fn batch_upgrade_vaults(
        &mut self,
        caller: &str,
        vault_ids: &[String],
        new_logic: VaultLogic,
        init_data: Option<serde_json::Value>,
    ) -> Result<VaultsUpgraded, FactoryError> {
        self.require_owner(caller)?;

        let mut assets = Vec::with_capacity(vault_ids.len());
        for vault_id in vault_ids {
            if vault_id.is_empty() {
                return Err(FactoryError::EmptyVaultId);
            }
            let asset = self
                .vaults
                .iter()
                .find(|(_, v)| &v.vault_id == vault_id)
                .map(|(asset, _)| asset.clone())
                .ok_or_else(|| FactoryError::UnknownVaultId {
                    vault_id: vault_id.clone(),
                })?;
            assets.push(asset);
        }

        let factory_id = self.factory_id.clone();
        for asset in &assets {
            if let Some(vault) = self.vaults.get_mut(asset) {
                vault.retarget_logic(&factory_id, new_logic.clone(), init_data.clone())?;
            }
        }

        info!(
            factory = %factory_id,
            count = vault_ids.len(),
            logic = %new_logic,
            "vaults upgraded"
        );

        Ok(VaultsUpgraded {
            vault_ids: vault_ids.to_vec(),
            logic: new_logic,
        })
    }

    /// Drops the vault for `asset` from the registry.
    ///
    /// The instance and its state are returned to the caller rather than
    /// destroyed; any funds it still custodies stay on its ledger account.
    pub fn remove_vault(&mut self, caller: &str, asset: &str) -> Result<(VaultRemoved, TokenVault), FactoryError> {
        self.require_owner(caller)?;
        let vault = self.vaults.remove(asset).ok_or_else(|| FactoryError::UnknownVault {
            asset: asset.to_string(),
        })?;
        info!(factory = %self.factory_id, vault = %vault.vault_id, asset, "vault removed");
        Ok((
            VaultRemoved {
                vault_id: vault.vault_id.clone(),
                asset: asset.to_string(),
            },
            vault,
        ))
    }

    /// Sets the early-exit fee rate, capped at the protocol ceiling.
    pub fn set_fee_rate(&mut self, caller: &str, fee_rate_bps: u64) -> Result<(), FactoryError> {
        self.require_owner(caller)?;
        if fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(FactoryError::FeeRateTooHigh {
                requested: fee_rate_bps,
                max: MAX_FEE_RATE_BPS,
            });
        }
        info!(factory = %self.factory_id, from = self.fee_rate_bps, to = fee_rate_bps, "fee rate updated");
        self.fee_rate_bps = fee_rate_bps;
        Ok(())
    }

    /// Sets the withdrawal lock period. Applies to settlements from now on,
    /// including requests already queued.
    pub fn set_lock_period(&mut self, caller: &str, lock_period_secs: u64) -> Result<(), FactoryError> {
        self.require_owner(caller)?;
        info!(factory = %self.factory_id, from = self.lock_period_secs, to = lock_period_secs, "lock period updated");
        self.lock_period_secs = lock_period_secs;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Vault entry points
    // -----------------------------------------------------------------------
    //
    // Every user-facing vault operation dispatches through here so the vault
    // sees the factory's current parameters, not a stale copy.

    pub fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        asset: &str,
        caller: &str,
        receiver: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<Deposit, FactoryError> {
        Ok(self.vault_mut(asset)?.deposit(ledger, caller, receiver, amount, now)?)
    }

    pub fn request_withdrawal(
        &mut self,
        asset: &str,
        caller: &str,
        share_amount: u64,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequested, FactoryError> {
        Ok(self.vault_mut(asset)?.request_withdrawal(caller, share_amount, now)?)
    }

    pub fn complete_withdrawal(
        &mut self,
        ledger: &mut AssetLedger,
        asset: &str,
        caller: &str,
        id: u64,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalFinalized, FactoryError> {
        let params = self.params();
        Ok(self
            .vault_mut(asset)?
            .complete_withdrawal(ledger, &params, caller, id, now)?)
    }

    pub fn pay_claim(
        &mut self,
        ledger: &mut AssetLedger,
        asset: &str,
        caller: &str,
        beneficiary: &str,
        claim: &ClaimTicket,
        now: DateTime<Utc>,
    ) -> Result<Claimed, FactoryError> {
        let verifier = self.verifier();
        let chain_id = self.chain_id;
        Ok(self
            .vault_mut(asset)?
            .pay_claim(ledger, &verifier, chain_id, caller, beneficiary, claim, now)?)
    }

    pub fn batch_pay_claim(
        &mut self,
        ledger: &mut AssetLedger,
        asset: &str,
        caller: &str,
        beneficiary: &str,
        claims: &[ClaimTicket],
        now: DateTime<Utc>,
    ) -> Result<Vec<Claimed>, FactoryError> {
        let verifier = self.verifier();
        let chain_id = self.chain_id;
        Ok(self
            .vault_mut(asset)?
            .batch_pay_claim(ledger, &verifier, chain_id, caller, beneficiary, claims, now)?)
    }

    /// Records a stake inflow against the vault for `asset`. The session
    /// ledger calls this right after moving a stake into the vault's custody
    /// account, so the tracked pool and the ledger balance stay in lockstep.
    pub fn credit_stake(&mut self, asset: &str, amount: u64) -> Result<(), FactoryError> {
        Ok(self.vault_mut(asset)?.credit_stake(amount)?)
    }

    /// Owner sweep out of a vault's custody account.
    pub fn sweep_vault(
        &mut self,
        ledger: &mut AssetLedger,
        caller: &str,
        asset: &str,
        to: &str,
        amount: u64,
    ) -> Result<FundsSwept, FactoryError> {
        let owner = self.owner.clone();
        Ok(self
            .vault_mut(asset)?
            .transfer_funds(ledger, caller, &owner, to, amount)?)
    }
}
