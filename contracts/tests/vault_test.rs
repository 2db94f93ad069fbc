//! Integration tests for the vault lifecycle through the factory entry
//! points: deposits, the two-phase withdrawal queue, and reward claims.

use arcade_contracts::factory::{VaultFactory, VaultLogic};
use arcade_contracts::vault::ClaimTicket;
use arcade_protocol::authorization::claim_digest;
use arcade_protocol::config::CHAIN_ID_DEVNET;
use arcade_protocol::crypto::ArcadeKeypair;
use arcade_protocol::AssetLedger;
use chrono::{DateTime, Duration, TimeZone, Utc};

const GOLD: &str = "GOLD";

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

fn setup() -> (ArcadeKeypair, VaultFactory, AssetLedger) {
    let authorizer = ArcadeKeypair::from_seed(&[7u8; 32]);
    let mut factory = VaultFactory::new(
        "owner",
        authorizer.public_key(),
        CHAIN_ID_DEVNET,
        VaultLogic::new("vault-logic", 1),
    );
    factory.create_vault(GOLD).unwrap();
    (authorizer, factory, AssetLedger::new())
}

fn fund(ledger: &mut AssetLedger, factory: &VaultFactory, account: &str, amount: u64) {
    let vault_id = factory.vault(GOLD).unwrap().vault_id.clone();
    ledger.mint(GOLD, account, amount).unwrap();
    ledger.approve(GOLD, account, &vault_id, amount);
}

fn signed_claim(
    authorizer: &ArcadeKeypair,
    factory: &VaultFactory,
    claimer: &str,
    nonce: u64,
    amount: u64,
) -> ClaimTicket {
    let vault_id = &factory.vault(GOLD).unwrap().vault_id;
    let deadline = t0() + Duration::hours(1);
    let digest = claim_digest(CHAIN_ID_DEVNET, vault_id, nonce, claimer, GOLD, amount, deadline);
    ClaimTicket {
        nonce,
        asset: GOLD.to_string(),
        amount,
        deadline,
        signature: authorizer.sign(&digest),
    }
}

// ---------------------------------------------------------------------------
// Share accounting
// ---------------------------------------------------------------------------

#[test]
fn two_depositors_split_the_pool_proportionally() {
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 3_000);
    fund(&mut ledger, &factory, "bob", 1_000);

    factory.deposit(&mut ledger, GOLD, "alice", "alice", 3_000, t0()).unwrap();
    factory.deposit(&mut ledger, GOLD, "bob", "bob", 1_000, t0()).unwrap();

    let vault = factory.vault(GOLD).unwrap();
    assert_eq!(vault.shares_of("alice"), 3_000);
    assert_eq!(vault.shares_of("bob"), 1_000);
    assert_eq!(vault.total_shares, 4_000);
    assert_eq!(vault.total_assets, 4_000);
}

#[test]
fn share_minting_never_exceeds_proportional_entitlement() {
    // With the pool trading above 1:1, a deposit must round its shares down.
    let (authorizer, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 1_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 1_000, t0()).unwrap();

    // Drain 300 via a claim: 1000 shares now back 700 assets.
    let claim = signed_claim(&authorizer, &factory, "carol", 1, 300);
    factory.pay_claim(&mut ledger, GOLD, "carol", "carol", &claim, t0()).unwrap();

    fund(&mut ledger, &factory, "bob", 500);
    let event = factory.deposit(&mut ledger, GOLD, "bob", "bob", 500, t0()).unwrap();
    // 500 * 1000 / 700 = 714.28..., floored.
    assert_eq!(event.shares_minted, 714);
}

#[test]
fn deposit_receiver_can_differ_from_payer() {
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 1_000);
    factory.deposit(&mut ledger, GOLD, "alice", "bob", 1_000, t0()).unwrap();

    let vault = factory.vault(GOLD).unwrap();
    assert_eq!(vault.shares_of("alice"), 0);
    assert_eq!(vault.shares_of("bob"), 1_000);
}

// ---------------------------------------------------------------------------
// Withdrawal queue and the lock-period boundary
// ---------------------------------------------------------------------------

#[test]
fn withdrawal_conserves_value_exactly() {
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 9_999);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 9_999, t0()).unwrap();
    factory.request_withdrawal(GOLD, "alice", 9_999, t0()).unwrap();

    // Early settlement: fee applies, and gross = net + fee to the unit.
    let event = factory
        .complete_withdrawal(&mut ledger, GOLD, "alice", 0, t0() + Duration::seconds(10))
        .unwrap();
    assert_eq!(event.gross_assets, 9_999);
    assert_eq!(event.fee, 99); // floor(9999 * 100 / 10000)
    assert_eq!(event.net_assets, 9_900);
    assert_eq!(event.net_assets + event.fee, event.gross_assets);

    assert_eq!(ledger.balance_of(GOLD, "alice"), 9_900);
    assert_eq!(ledger.balance_of(GOLD, "owner"), 99);
    let vault = factory.vault(GOLD).unwrap();
    assert_eq!(vault.total_assets, 0);
    assert_eq!(vault.total_shares, 0);
    assert_eq!(ledger.balance_of(GOLD, &vault.vault_id), 0);
}

#[test]
fn fee_applies_one_second_before_the_lock_boundary_and_not_at_it() {
    let lock = factory_lock_period();

    // One second early: fee charged.
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 10_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 10_000, t0()).unwrap();
    factory.request_withdrawal(GOLD, "alice", 10_000, t0()).unwrap();
    let event = factory
        .complete_withdrawal(&mut ledger, GOLD, "alice", 0, t0() + Duration::seconds(lock - 1))
        .unwrap();
    assert_eq!(event.fee, 100);

    // Exactly at the boundary: no fee.
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 10_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 10_000, t0()).unwrap();
    factory.request_withdrawal(GOLD, "alice", 10_000, t0()).unwrap();
    let event = factory
        .complete_withdrawal(&mut ledger, GOLD, "alice", 0, t0() + Duration::seconds(lock))
        .unwrap();
    assert_eq!(event.fee, 0);
    assert_eq!(event.net_assets, 10_000);
}

fn factory_lock_period() -> i64 {
    arcade_protocol::config::DEFAULT_LOCK_PERIOD_SECS as i64
}

#[test]
fn settlement_reads_current_factory_parameters() {
    // The queue entry stores no fee terms: a rate change between request and
    // completion applies the new rate.
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 10_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 10_000, t0()).unwrap();
    factory.request_withdrawal(GOLD, "alice", 10_000, t0()).unwrap();

    factory.set_fee_rate("owner", 2_000).unwrap();
    let event = factory
        .complete_withdrawal(&mut ledger, GOLD, "alice", 0, t0() + Duration::seconds(10))
        .unwrap();
    assert_eq!(event.fee, 2_000);
}

#[test]
fn pending_ids_track_queue_state() {
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 1_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 1_000, t0()).unwrap();
    factory.request_withdrawal(GOLD, "alice", 200, t0()).unwrap();
    factory.request_withdrawal(GOLD, "alice", 300, t0()).unwrap();

    assert_eq!(factory.vault(GOLD).unwrap().pending_withdrawal_ids("alice"), vec![0, 1]);

    factory
        .complete_withdrawal(&mut ledger, GOLD, "alice", 0, t0() + Duration::days(2))
        .unwrap();
    assert_eq!(factory.vault(GOLD).unwrap().pending_withdrawal_ids("alice"), vec![1]);
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

#[test]
fn claim_nonces_are_independent_per_vault() {
    let (authorizer, mut factory, mut ledger) = setup();
    factory.create_vault("GEMS").unwrap();
    fund(&mut ledger, &factory, "alice", 1_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 1_000, t0()).unwrap();

    let gems_vault = factory.vault("GEMS").unwrap().vault_id.clone();
    ledger.mint("GEMS", "alice", 1_000).unwrap();
    ledger.approve("GEMS", "alice", &gems_vault, 1_000);
    factory.deposit(&mut ledger, "GEMS", "alice", "alice", 1_000, t0()).unwrap();

    // Same nonce value against two different vaults: both redeem, because
    // the vault instance id is part of the signed digest.
    let gold_claim = signed_claim(&authorizer, &factory, "bob", 5, 100);
    factory.pay_claim(&mut ledger, GOLD, "bob", "bob", &gold_claim, t0()).unwrap();

    let deadline = t0() + Duration::hours(1);
    let digest = claim_digest(CHAIN_ID_DEVNET, &gems_vault, 5, "bob", "GEMS", 100, deadline);
    let gems_claim = ClaimTicket {
        nonce: 5,
        asset: "GEMS".to_string(),
        amount: 100,
        deadline,
        signature: authorizer.sign(&digest),
    };
    factory.pay_claim(&mut ledger, "GEMS", "bob", "bob", &gems_claim, t0()).unwrap();

    assert_eq!(ledger.balance_of(GOLD, "bob"), 100);
    assert_eq!(ledger.balance_of("GEMS", "bob"), 100);
}

#[test]
fn failed_batch_leaves_every_nonce_redeemable() {
    let (authorizer, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 1_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 1_000, t0()).unwrap();

    let good = signed_claim(&authorizer, &factory, "bob", 1, 100);
    let mut bad = signed_claim(&authorizer, &factory, "bob", 2, 100);
    bad.amount = 999; // no longer matches its signature

    let claims = vec![good.clone(), bad];
    assert!(factory
        .batch_pay_claim(&mut ledger, GOLD, "bob", "bob", &claims, t0())
        .is_err());
    assert_eq!(ledger.balance_of(GOLD, "bob"), 0);

    // The good ticket is still redeemable on its own.
    factory.pay_claim(&mut ledger, GOLD, "bob", "bob", &good, t0()).unwrap();
    assert_eq!(ledger.balance_of(GOLD, "bob"), 100);
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[test]
fn owner_sweep_moves_funds_and_respects_gate() {
    let (_, mut factory, mut ledger) = setup();
    fund(&mut ledger, &factory, "alice", 1_000);
    factory.deposit(&mut ledger, GOLD, "alice", "alice", 1_000, t0()).unwrap();

    assert!(factory
        .sweep_vault(&mut ledger, "mallory", GOLD, "mallory", 500)
        .is_err());
    factory
        .sweep_vault(&mut ledger, "owner", GOLD, "treasury", 500)
        .unwrap();
    assert_eq!(ledger.balance_of(GOLD, "treasury"), 500);
}
