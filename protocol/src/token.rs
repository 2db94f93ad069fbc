//! # Fungible Asset Ledger
//!
//! Balance and allowance bookkeeping for the staked and rewarded tokens.
//! The contracts treat this module as an external collaborator — the same
//! relationship an EVM contract has with an ERC-20. A vault pulls a deposit
//! with `transfer_from` (so the depositor must have approved it first) and
//! pays a claim with `transfer` out of its own custody account.
//!
//! Accounts are hex-encoded public keys for people and instance ids for
//! contracts; the ledger does not care which is which. Balances are `u64`
//! smallest-denomination units and every mutation is overflow-checked.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Identifier of a fungible asset (e.g. the reward token's symbol or mint id).
pub type AssetId = String;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
///
/// Insufficient balance and insufficient allowance are deliberately distinct
/// variants: an automated caller needs to know whether to top up or to
/// approve more, and a merged "transfer failed" tells it neither.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Attempted to move more than the sender holds.
    #[error("insufficient balance: account has {available}, needs {requested} ({asset})")]
    InsufficientBalance {
        asset: AssetId,
        available: u64,
        requested: u64,
    },

    /// Attempted to `transfer_from` more than the owner approved.
    #[error("insufficient allowance: approved {approved}, needs {requested} ({asset})")]
    InsufficientAllowance {
        asset: AssetId,
        approved: u64,
        requested: u64,
    },

    /// A credit would overflow the recipient's balance or the total supply.
    #[error("balance overflow: crediting {amount} would exceed u64::MAX ({asset})")]
    Overflow { asset: AssetId, amount: u64 },
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// Per-asset balances and allowances for every account in the system.
///
/// In production this state would live in the execution substrate's state
/// trie; the in-memory representation carries the same semantics for the
/// contracts and their tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetLedger {
    /// Ledger books keyed by asset id.
    books: HashMap<AssetId, AssetBook>,
}

/// The complete book for one asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AssetBook {
    total_supply: u64,
    /// Account -> balance.
    balances: HashMap<String, u64>,
    /// Owner -> (spender -> approved amount).
    allowances: HashMap<String, HashMap<String, u64>>,
}

impl AssetLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `amount` of `asset` to `to`. Creates the asset's book on first
    /// use; issuer gating belongs to the token's own contract, not here.
    pub fn mint(&mut self, asset: &str, to: &str, amount: u64) -> Result<(), TokenError> {
        let book = self.books.entry(asset.to_string()).or_default();

        book.total_supply = book
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| TokenError::Overflow {
                asset: asset.to_string(),
                amount,
            })?;

        let balance = book.balances.entry(to.to_string()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| TokenError::Overflow {
            asset: asset.to_string(),
            amount,
        })?;

        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s balance of `asset`.
    ///
    /// Overwrite semantics, not increment — matching the allowance model
    /// callers already know from ERC-20.
    pub fn approve(&mut self, asset: &str, owner: &str, spender: &str, amount: u64) {
        self.books
            .entry(asset.to_string())
            .or_default()
            .allowances
            .entry(owner.to_string())
            .or_default()
            .insert(spender.to_string(), amount);
    }

    /// Moves `amount` of `asset` from `from` to `to`, on `from`'s own authority.
    pub fn transfer(&mut self, asset: &str, from: &str, to: &str, amount: u64) -> Result<(), TokenError> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }

    /// Moves `amount` of `asset` from `from` to `to` on `spender`'s authority,
    /// consuming allowance. The allowance check happens before any balance
    /// moves, so a failed call leaves both untouched.
    pub fn transfer_from(
        &mut self,
        asset: &str,
        spender: &str,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<(), TokenError> {
        let approved = self.allowance(asset, from, spender);
        if approved < amount {
            return Err(TokenError::InsufficientAllowance {
                asset: asset.to_string(),
                approved,
                requested: amount,
            });
        }

        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)?;

        // Only burn the allowance once the transfer itself has succeeded.
        if let Some(book) = self.books.get_mut(asset) {
            if let Some(per_spender) = book.allowances.get_mut(from) {
                if let Some(entry) = per_spender.get_mut(spender) {
                    *entry -= amount;
                }
            }
        }

        Ok(())
    }

    /// Returns `account`'s balance of `asset`, or 0.
    pub fn balance_of(&self, asset: &str, account: &str) -> u64 {
        self.books
            .get(asset)
            .and_then(|b| b.balances.get(account))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the amount `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, asset: &str, owner: &str, spender: &str) -> u64 {
        self.books
            .get(asset)
            .and_then(|b| b.allowances.get(owner))
            .and_then(|per_spender| per_spender.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the total minted supply of `asset`, or 0.
    pub fn total_supply(&self, asset: &str) -> u64 {
        self.books.get(asset).map(|b| b.total_supply).unwrap_or(0)
    }

    fn debit(&mut self, asset: &str, account: &str, amount: u64) -> Result<(), TokenError> {
        let available = self.balance_of(asset, account);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                asset: asset.to_string(),
                available,
                requested: amount,
            });
        }
        // Book and entry both exist: balance_of just found them.
        let book = self.books.get_mut(asset).ok_or_else(|| TokenError::InsufficientBalance {
            asset: asset.to_string(),
            available: 0,
            requested: amount,
        })?;
        if let Some(balance) = book.balances.get_mut(account) {
            *balance -= amount;
        }
        Ok(())
    }

    fn credit(&mut self, asset: &str, account: &str, amount: u64) -> Result<(), TokenError> {
        let book = self.books.entry(asset.to_string()).or_default();
        let balance = book.balances.entry(account.to_string()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| TokenError::Overflow {
            asset: asset.to_string(),
            amount,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_and_transfer() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", 1_000).unwrap();
        ledger.transfer("GOLD", "alice", "bob", 400).unwrap();

        assert_eq!(ledger.balance_of("GOLD", "alice"), 600);
        assert_eq!(ledger.balance_of("GOLD", "bob"), 400);
        assert_eq!(ledger.total_supply("GOLD"), 1_000);
    }

    #[test]
    fn transfer_more_than_balance_rejected() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", 100).unwrap();
        let result = ledger.transfer("GOLD", "alice", "bob", 101);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        // Nothing moved.
        assert_eq!(ledger.balance_of("GOLD", "alice"), 100);
        assert_eq!(ledger.balance_of("GOLD", "bob"), 0);
    }

    #[test]
    fn transfer_from_consumes_allowance() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", 1_000).unwrap();
        ledger.approve("GOLD", "alice", "vault-1", 500);

        ledger.transfer_from("GOLD", "vault-1", "alice", "vault-1", 300).unwrap();

        assert_eq!(ledger.balance_of("GOLD", "alice"), 700);
        assert_eq!(ledger.balance_of("GOLD", "vault-1"), 300);
        assert_eq!(ledger.allowance("GOLD", "alice", "vault-1"), 200);
    }

    #[test]
    fn transfer_from_beyond_allowance_rejected() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", 1_000).unwrap();
        ledger.approve("GOLD", "alice", "vault-1", 100);

        let result = ledger.transfer_from("GOLD", "vault-1", "alice", "vault-1", 101);
        assert!(matches!(result, Err(TokenError::InsufficientAllowance { .. })));
        assert_eq!(ledger.balance_of("GOLD", "alice"), 1_000);
    }

    #[test]
    fn transfer_from_insufficient_balance_keeps_allowance() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", 50).unwrap();
        ledger.approve("GOLD", "alice", "vault-1", 100);

        let result = ledger.transfer_from("GOLD", "vault-1", "alice", "vault-1", 80);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        // The allowance survives a failed transfer.
        assert_eq!(ledger.allowance("GOLD", "alice", "vault-1"), 100);
    }

    #[test]
    fn approve_overwrites_rather_than_accumulates() {
        let mut ledger = AssetLedger::new();
        ledger.approve("GOLD", "alice", "spender", 100);
        ledger.approve("GOLD", "alice", "spender", 40);
        assert_eq!(ledger.allowance("GOLD", "alice", "spender"), 40);
    }

    #[test]
    fn assets_are_isolated() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", 100).unwrap();
        ledger.mint("GEMS", "alice", 7).unwrap();
        assert_eq!(ledger.balance_of("GOLD", "alice"), 100);
        assert_eq!(ledger.balance_of("GEMS", "alice"), 7);
        assert_eq!(ledger.balance_of("GEMS", "bob"), 0);
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut ledger = AssetLedger::new();
        ledger.mint("GOLD", "alice", u64::MAX).unwrap();
        assert!(matches!(
            ledger.mint("GOLD", "bob", 1),
            Err(TokenError::Overflow { .. })
        ));
    }
}
