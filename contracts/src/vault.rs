//! # Token Vault Contract
//!
//! Share-based custody of a single asset. Depositors receive shares priced
//! at the current assets-per-share ratio; the ratio is allowed to drift as
//! reward claims drain the pool and session stakes refill it, so a share is
//! a proportional claim on whatever the vault holds *now*, not a fixed IOU.
//!
//! Exits are two-phase: `request_withdrawal` locks shares into a queue
//! entry, `complete_withdrawal` settles it at the ratio in force at
//! settlement time. Settling before the lock period has fully elapsed costs
//! an early-exit fee, routed to the factory owner.
//!
//! Outbound rewards (`pay_claim`) require a digest signed by the off-chain
//! authorizer, with a write-once nonce per vault as the replay guard.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use arcade_protocol::authorization::{claim_digest, AuthorityVerifier};
use arcade_protocol::config::BPS_DENOMINATOR;
use arcade_protocol::token::TokenError;
use arcade_protocol::{ArcadeSignature, AssetId, AssetLedger};

use crate::factory::VaultLogic;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// A zero amount was supplied where a positive one is required.
    #[error("amount must be positive")]
    ZeroAmount,

    /// The authorizer's signature did not verify over the expected digest.
    ///
    /// One variant for every flavor of mismatch — wrong signer, tampered
    /// field, signature issued to a different caller. No error oracle.
    #[error("invalid authorization signature")]
    InvalidSignature,

    /// The signed deadline has passed.
    #[error("authorization expired at {deadline}, current time {now}")]
    SignatureExpired {
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// The claim nonce was already redeemed against this vault.
    #[error("nonce {nonce} already used")]
    NonceAlreadyUsed { nonce: u64 },

    /// The claim names a different asset than this vault custodies.
    #[error("asset mismatch: vault holds {expected}, claim names {actual}")]
    AssetMismatch { expected: AssetId, actual: AssetId },

    /// The caller does not hold enough shares.
    #[error("insufficient shares: holding {available}, requested {requested}")]
    InsufficientShares { available: u64, requested: u64 },

    /// The vault's tracked assets cannot cover the requested outflow.
    #[error("insufficient vault assets: holding {available}, requested {requested}")]
    InsufficientVaultAssets { available: u64, requested: u64 },

    /// No withdrawal request exists under this id.
    #[error("unknown withdrawal request {id}")]
    UnknownWithdrawal { id: u64 },

    /// The withdrawal request belongs to a different account.
    #[error("withdrawal request {id} does not belong to the caller")]
    NotRequestOwner { id: u64 },

    /// The withdrawal request was already settled.
    #[error("withdrawal request {id} already completed")]
    AlreadyCompleted { id: u64 },

    /// Only the factory owner may perform this operation.
    #[error("caller is not the owner")]
    NotOwner,

    /// Only the controlling factory may perform this operation.
    #[error("caller is not the controlling factory")]
    NotFactory,

    /// An arithmetic overflow would occur.
    #[error("amount overflow: operation would exceed allowed limits")]
    AmountOverflow,

    /// Shares are outstanding but the pool is empty, so no share price exists.
    #[error("share price undefined: pool drained with shares outstanding")]
    DrainedPool,

    /// The underlying asset ledger refused a transfer.
    #[error(transparent)]
    Token(#[from] TokenError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle of a withdrawal queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Shares locked, awaiting settlement.
    Pending,
    /// Settled and paid out.
    Completed,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A queued exit. Requests are never deleted — completed entries stay in
/// the map as the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Account that locked the shares.
    pub account: String,
    /// Share amount locked into this request.
    pub shares: u64,
    /// When the request was created; the lock period counts from here.
    pub requested_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: WithdrawalStatus,
    /// When the request was settled, if it has been.
    pub completed_at: Option<DateTime<Utc>>,
}

/// An authorizer-signed reward claim, presented by the claimer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimTicket {
    /// Per-vault replay nonce. Each value redeems at most once.
    pub nonce: u64,
    /// Asset being claimed; must match the vault's asset.
    pub asset: AssetId,
    /// Amount to pay out, in smallest denomination.
    pub amount: u64,
    /// Signature validity deadline.
    pub deadline: DateTime<Utc>,
    /// The authorizer's signature over the claim digest.
    pub signature: ArcadeSignature,
}

/// Factory-level parameters a vault consults at settlement time.
///
/// Snapshotted by the factory per call, so a parameter change between
/// request and completion applies the *current* values — the queue entry
/// stores no fee terms of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultParams {
    /// Early-exit fee in basis points of the gross payout.
    pub fee_rate_bps: u64,
    /// Seconds a request must age before it settles fee-free.
    pub lock_period_secs: u64,
    /// Account the early-exit fee is routed to (the factory owner).
    pub fee_recipient: String,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Record of a completed deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub vault_id: String,
    pub caller: String,
    pub receiver: String,
    pub amount: u64,
    pub shares_minted: u64,
    pub timestamp: DateTime<Utc>,
}

/// Record of shares entering the withdrawal queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequested {
    pub vault_id: String,
    pub account: String,
    pub request_id: u64,
    pub shares: u64,
    pub requested_at: DateTime<Utc>,
}

/// Record of a settled withdrawal. `gross_assets == net_assets + fee` holds
/// exactly; the pool shrinks by the gross amount either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalFinalized {
    pub vault_id: String,
    pub account: String,
    pub request_id: u64,
    pub shares: u64,
    pub gross_assets: u64,
    pub fee: u64,
    pub net_assets: u64,
    pub completed_at: DateTime<Utc>,
}

/// Record of a paid reward claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claimed {
    pub vault_id: String,
    pub claimer: String,
    pub beneficiary: String,
    pub nonce: u64,
    pub asset: AssetId,
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
}

/// Record of an administrative sweep out of the vault's custody account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundsSwept {
    pub vault_id: String,
    pub to: String,
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// TokenVault
// ---------------------------------------------------------------------------

/// Custody vault for one asset.
///
/// The vault's id doubles as its account on the asset ledger: deposits land
/// there, payouts leave from there. `total_assets` is the vault's own view
/// of the pool and moves in lockstep with its ledger balance through the
/// contract entry points; tokens pushed to the account directly sit outside
/// the share math until swept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenVault {
    /// Instance id; also the vault's account on the asset ledger.
    pub vault_id: String,
    /// The asset this vault custodies.
    pub asset: AssetId,
    /// Instance id of the controlling factory.
    pub factory: String,
    /// Logic template this instance currently dispatches through.
    pub logic: VaultLogic,
    /// Initialization payload supplied with the most recent retarget.
    pub logic_init: Option<serde_json::Value>,
    /// Total shares outstanding, including shares locked in pending requests.
    pub total_shares: u64,
    /// The vault's tracked pool of assets.
    pub total_assets: u64,
    shares: HashMap<String, u64>,
    used_nonces: HashSet<u64>,
    withdrawal_index: u64,
    withdrawal_requests: HashMap<u64, WithdrawalRequest>,
}

impl TokenVault {
    /// Creates an empty vault. Instances are normally minted by the factory.
    pub fn new(vault_id: String, asset: AssetId, factory: String, logic: VaultLogic) -> Self {
        Self {
            vault_id,
            asset,
            factory,
            logic,
            logic_init: None,
            total_shares: 0,
            total_assets: 0,
            shares: HashMap::new(),
            used_nonces: HashSet::new(),
            withdrawal_index: 0,
            withdrawal_requests: HashMap::new(),
        }
    }

    /// Shares held by `account`, excluding any locked in pending requests.
    pub fn shares_of(&self, account: &str) -> u64 {
        self.shares.get(account).copied().unwrap_or(0)
    }

    /// Whether `nonce` has been redeemed against this vault.
    pub fn nonce_used(&self, nonce: u64) -> bool {
        self.used_nonces.contains(&nonce)
    }

    /// Looks up a withdrawal request by id.
    pub fn withdrawal_request(&self, id: u64) -> Option<&WithdrawalRequest> {
        self.withdrawal_requests.get(&id)
    }

    /// Ids of `account`'s still-pending withdrawal requests, ascending.
    pub fn pending_withdrawal_ids(&self, account: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .withdrawal_requests
            .iter()
            .filter(|(_, r)| r.account == account && r.status == WithdrawalStatus::Pending)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Deposits `amount` of the vault's asset, minting shares to `receiver`.
    ///
    /// The first deposit mints 1:1. Every later deposit mints
    /// `amount * total_shares / total_assets`, floor division, so a deposit
    /// never mints more than its proportional entitlement.
    ///
    /// The caller must have approved the vault on the asset ledger; the
    /// funds are pulled, not pushed.
    pub fn deposit(
        &mut self,
        ledger: &mut AssetLedger,
        caller: &str,
        receiver: &str,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<Deposit, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let shares_minted = if self.total_shares == 0 {
            amount
        } else {
            self.assets_to_shares(amount)?
        };

        ledger.transfer_from(&self.asset, &self.vault_id, caller, &self.vault_id, amount)?;

        self.total_assets = self
            .total_assets
            .checked_add(amount)
            .ok_or(VaultError::AmountOverflow)?;
        self.total_shares = self
            .total_shares
            .checked_add(shares_minted)
            .ok_or(VaultError::AmountOverflow)?;
        let balance = self.shares.entry(receiver.to_string()).or_insert(0);
        *balance = balance
            .checked_add(shares_minted)
            .ok_or(VaultError::AmountOverflow)?;

        info!(
            vault = %self.vault_id,
            receiver,
            amount,
            shares_minted,
            "deposit accepted"
        );

        Ok(Deposit {
            vault_id: self.vault_id.clone(),
            caller: caller.to_string(),
            receiver: receiver.to_string(),
            amount,
            shares_minted,
            timestamp: now,
        })
    }

    // -----------------------------------------------------------------------
    // Withdrawal queue
    // -----------------------------------------------------------------------

    /// Locks `share_amount` of the caller's shares into a new queue entry.
    ///
    /// The caller's spendable share balance drops immediately; the pool
    /// totals do not move until settlement.
    pub fn request_withdrawal(
        &mut self,
        caller: &str,
        share_amount: u64,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequested, VaultError> {
        if share_amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let held = self.shares_of(caller);
        if held < share_amount {
            return Err(VaultError::InsufficientShares {
                available: held,
                requested: share_amount,
            });
        }

        if let Some(balance) = self.shares.get_mut(caller) {
            *balance -= share_amount;
        }

        let request_id = self.withdrawal_index;
        self.withdrawal_index += 1;
        self.withdrawal_requests.insert(
            request_id,
            WithdrawalRequest {
                account: caller.to_string(),
                shares: share_amount,
                requested_at: now,
                status: WithdrawalStatus::Pending,
                completed_at: None,
            },
        );

        debug!(vault = %self.vault_id, caller, request_id, share_amount, "withdrawal queued");

        Ok(WithdrawalRequested {
            vault_id: self.vault_id.clone(),
            account: caller.to_string(),
            request_id,
            shares: share_amount,
            requested_at: now,
        })
    }

    /// Settles a pending withdrawal at the current assets-per-share ratio.
    ///
    /// If the lock period has not fully elapsed, `fee_rate_bps` of the gross
    /// payout goes to the fee recipient and the requester keeps the rest.
    /// The pool shrinks by the gross amount in both cases.
    pub fn complete_withdrawal(
        &mut self,
        ledger: &mut AssetLedger,
        params: &VaultParams,
        caller: &str,
        id: u64,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalFinalized, VaultError> {
        let request = self
            .withdrawal_requests
            .get(&id)
            .ok_or(VaultError::UnknownWithdrawal { id })?;
        if request.account != caller {
            return Err(VaultError::NotRequestOwner { id });
        }
        if request.status == WithdrawalStatus::Completed {
            return Err(VaultError::AlreadyCompleted { id });
        }
        let shares = request.shares;
        let requested_at = request.requested_at;

        // Settlement-time ratio. Locked shares still count toward
        // total_shares, so the ratio is consistent with the pool they are
        // about to leave.
        let gross = mul_div(shares, self.total_assets, self.total_shares)?;

        // Both transfers must be covered before either runs, so a custody
        // shortfall leaves the request Pending and nothing paid.
        let custody = ledger.balance_of(&self.asset, &self.vault_id);
        if gross > custody {
            return Err(VaultError::InsufficientVaultAssets {
                available: custody,
                requested: gross,
            });
        }

        let elapsed = (now - requested_at).num_seconds().max(0) as u64;
        let fee = if elapsed < params.lock_period_secs {
            mul_div(gross, params.fee_rate_bps, BPS_DENOMINATOR)?
        } else {
            0
        };
        let net = gross - fee;

        ledger.transfer(&self.asset, &self.vault_id, caller, net)?;
        if fee > 0 {
            ledger.transfer(&self.asset, &self.vault_id, &params.fee_recipient, fee)?;
        }

        self.total_assets = self
            .total_assets
            .checked_sub(gross)
            .ok_or(VaultError::AmountOverflow)?;
        self.total_shares = self
            .total_shares
            .checked_sub(shares)
            .ok_or(VaultError::AmountOverflow)?;

        if let Some(request) = self.withdrawal_requests.get_mut(&id) {
            request.status = WithdrawalStatus::Completed;
            request.completed_at = Some(now);
        }

        info!(
            vault = %self.vault_id,
            caller,
            request_id = id,
            gross,
            fee,
            net,
            early = fee > 0,
            "withdrawal settled"
        );

        Ok(WithdrawalFinalized {
            vault_id: self.vault_id.clone(),
            account: caller.to_string(),
            request_id: id,
            shares,
            gross_assets: gross,
            fee,
            net_assets: net,
            completed_at: now,
        })
    }

    // -----------------------------------------------------------------------
    // Reward claims
    // -----------------------------------------------------------------------

    /// Validates a claim ticket without touching state.
    ///
    /// Shared by [`pay_claim`](Self::pay_claim), the batch path, and the
    /// composed session-plus-claim operation.
    pub fn check_claim(
        &self,
        verifier: &dyn AuthorityVerifier,
        chain_id: u64,
        caller: &str,
        claim: &ClaimTicket,
        now: DateTime<Utc>,
    ) -> Result<(), VaultError> {
        if claim.amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if claim.asset != self.asset {
            return Err(VaultError::AssetMismatch {
                expected: self.asset.clone(),
                actual: claim.asset.clone(),
            });
        }
        if now > claim.deadline {
            return Err(VaultError::SignatureExpired {
                deadline: claim.deadline,
                now,
            });
        }
        if self.used_nonces.contains(&claim.nonce) {
            return Err(VaultError::NonceAlreadyUsed { nonce: claim.nonce });
        }
        if claim.amount > self.total_assets {
            return Err(VaultError::InsufficientVaultAssets {
                available: self.total_assets,
                requested: claim.amount,
            });
        }

        let digest = claim_digest(
            chain_id,
            &self.vault_id,
            claim.nonce,
            caller,
            &claim.asset,
            claim.amount,
            claim.deadline,
        );
        if !verifier.verify_digest(&digest, &claim.signature) {
            return Err(VaultError::InvalidSignature);
        }
        Ok(())
    }

    /// Pays out an authorizer-signed claim to `beneficiary`.
    ///
    /// The signature is bound to `caller`, the account the authorizer issued
    /// it to; the beneficiary only names where the tokens land.
    pub fn pay_claim(
        &mut self,
        ledger: &mut AssetLedger,
        verifier: &dyn AuthorityVerifier,
        chain_id: u64,
        caller: &str,
        beneficiary: &str,
        claim: &ClaimTicket,
        now: DateTime<Utc>,
    ) -> Result<Claimed, VaultError> {
        self.check_claim(verifier, chain_id, caller, claim, now)?;
        let custody = ledger.balance_of(&self.asset, &self.vault_id);
        if claim.amount > custody {
            return Err(VaultError::InsufficientVaultAssets {
                available: custody,
                requested: claim.amount,
            });
        }

        // Burn the nonce before the tokens move.
        self.used_nonces.insert(claim.nonce);
        self.total_assets -= claim.amount;
        ledger.transfer(&self.asset, &self.vault_id, beneficiary, claim.amount)?;

        info!(
            vault = %self.vault_id,
            caller,
            beneficiary,
            nonce = claim.nonce,
            amount = claim.amount,
            "claim paid"
        );

        Ok(Claimed {
            vault_id: self.vault_id.clone(),
            claimer: caller.to_string(),
            beneficiary: beneficiary.to_string(),
            nonce: claim.nonce,
            asset: claim.asset.clone(),
            amount: claim.amount,
            timestamp: now,
        })
    }

    /// Pays a batch of claims, all or nothing.
    ///
    /// The whole batch is validated first — including duplicate nonces
    /// *within* the batch and the cumulative amount against the pool — so a
    /// single bad ticket rejects everything with no observable effect.
    pub fn batch_pay_claim(
        &mut self,
        ledger: &mut AssetLedger,
        verifier: &dyn AuthorityVerifier,
        chain_id: u64,
        caller: &str,
        beneficiary: &str,
        claims: &[ClaimTicket],
        now: DateTime<Utc>,
    ) -> Result<Vec<Claimed>, VaultError> {
        let mut batch_nonces = HashSet::new();
        let mut cumulative: u64 = 0;
        for claim in claims {
            self.check_claim(verifier, chain_id, caller, claim, now)?;
            if !batch_nonces.insert(claim.nonce) {
                return Err(VaultError::NonceAlreadyUsed { nonce: claim.nonce });
            }
            cumulative = cumulative
                .checked_add(claim.amount)
                .ok_or(VaultError::AmountOverflow)?;
        }
        if cumulative > self.total_assets {
            return Err(VaultError::InsufficientVaultAssets {
                available: self.total_assets,
                requested: cumulative,
            });
        }
        let custody = ledger.balance_of(&self.asset, &self.vault_id);
        if cumulative > custody {
            return Err(VaultError::InsufficientVaultAssets {
                available: custody,
                requested: cumulative,
            });
        }

        let mut events = Vec::with_capacity(claims.len());
        for claim in claims {
            self.used_nonces.insert(claim.nonce);
            self.total_assets -= claim.amount;
            ledger.transfer(&self.asset, &self.vault_id, beneficiary, claim.amount)?;
            events.push(Claimed {
                vault_id: self.vault_id.clone(),
                claimer: caller.to_string(),
                beneficiary: beneficiary.to_string(),
                nonce: claim.nonce,
                asset: claim.asset.clone(),
                amount: claim.amount,
                timestamp: now,
            });
        }

        info!(
            vault = %self.vault_id,
            caller,
            count = claims.len(),
            total = cumulative,
            "claim batch paid"
        );

        Ok(events)
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Sweeps `amount` out of the vault's custody account to `to`.
    ///
    /// Owner-only. Can also recover tokens pushed to the custody account
    /// directly, which sit above `total_assets`.
    pub fn transfer_funds(
        &mut self,
        ledger: &mut AssetLedger,
        caller: &str,
        owner: &str,
        to: &str,
        amount: u64,
    ) -> Result<FundsSwept, VaultError> {
        if caller != owner {
            return Err(VaultError::NotOwner);
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        ledger.transfer(&self.asset, &self.vault_id, to, amount)?;
        // The sweep may include unreconciled tokens beyond the tracked pool.
        self.total_assets = self.total_assets.saturating_sub(amount);

        info!(vault = %self.vault_id, to, amount, "funds swept");

        Ok(FundsSwept {
            vault_id: self.vault_id.clone(),
            to: to.to_string(),
            amount,
        })
    }

    /// Repoints this instance at a new logic template.
    ///
    /// Only the controlling factory may invoke this, regardless of who owns
    /// the factory. Share balances, pending requests, and used nonces are
    /// untouched — only the dispatch pointer moves.
    pub fn retarget_logic(
        &mut self,
        caller: &str,
        new_logic: VaultLogic,
        init_data: Option<serde_json::Value>,
    ) -> Result<(), VaultError> {
        if caller != self.factory {
            return Err(VaultError::NotFactory);
        }
        info!(
            vault = %self.vault_id,
            from = %self.logic,
            to = %new_logic,
            "logic retargeted"
        );
        self.logic = new_logic;
        self.logic_init = init_data;
        Ok(())
    }

    /// Records an inflow that landed in the vault's custody account outside
    /// the deposit path, e.g. a game-session stake. Keeps `total_assets`
    /// reconciled with the ledger balance without minting shares.
    pub fn credit_stake(&mut self, amount: u64) -> Result<(), VaultError> {
        self.total_assets = self
            .total_assets
            .checked_add(amount)
            .ok_or(VaultError::AmountOverflow)?;
        Ok(())
    }

    fn assets_to_shares(&self, amount: u64) -> Result<u64, VaultError> {
        if self.total_assets == 0 {
            return Err(VaultError::DrainedPool);
        }
        mul_div(amount, self.total_shares, self.total_assets)
    }
}

/// `a * b / d` with a u128 intermediate, floor division.
fn mul_div(a: u64, b: u64, d: u64) -> Result<u64, VaultError> {
    if d == 0 {
        return Err(VaultError::AmountOverflow);
    }
    let wide = u128::from(a) * u128::from(b) / u128::from(d);
    u64::try_from(wide).map_err(|_| VaultError::AmountOverflow)
}
