//! Integration test: sentry-gated access to oracle prices.
//!
//! Exercises the sentry as an outside gate in front of the oracle:
//! 1. Register allow-list strategies up to the capacity limit
//! 2. Verify duplicate, capacity and not-found rejections leave state intact
//! 3. Gate oracle reads by the sentry and change membership live
//! 4. Screen a sanctioned account and clear the list again
//! 5. Hand the admin role over and verify the old admin is locked out

use std::collections::HashMap;
use std::sync::Arc;

use cadence_oracle::clock::ManualClock;
use cadence_oracle::source::FixedPriceSource;
use cadence_oracle::twap::TwapOracle;
use cadence_oracle::U256;
use cadence_sentry::strategy::{
    AllowListStrategy, SanctionsList, SanctionsRegistry, SentryStrategy,
};
use cadence_sentry::{Sentry, SentryError, SentryEvent};
use cadence_types::events::EventType;
use cadence_types::{Address, DEFAULT_PERIOD_SECS, MAX_SENTRY_STRATEGIES};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

const ADMIN: Address = Address::repeat(0xad);
const TRADER: Address = Address::repeat(0x01);
const OUTSIDER: Address = Address::repeat(0x02);

const ASSET_A: Address = Address::repeat(0x0a);
const ASSET_B: Address = Address::repeat(0x0b);

type Oracle = TwapOracle<Arc<FixedPriceSource>, ManualClock>;

/// An oracle that has priced one A at one B for a full period.
fn priced_oracle() -> Oracle {
    let clock = ManualClock::new(BASE_TIME);
    let source = Arc::new(FixedPriceSource::new(
        ASSET_A,
        ASSET_B,
        (1_000_000, 1_000_000_000_000_000_000),
        BASE_TIME as u32,
    ));
    let metadata: HashMap<Address, u8> = [(ASSET_A, 6), (ASSET_B, 18)].into_iter().collect();
    let mut oracle = TwapOracle::new(Arc::clone(&source), &metadata, clock.clone(), DEFAULT_PERIOD_SECS)
        .expect("oracle should bind");

    let period = U256::new(u128::from(DEFAULT_PERIOD_SECS));
    let price0 = U256::new(1_000_000_000_000) << 112u32;
    let price1 = (U256::ONE << 112u32) / U256::new(1_000_000_000_000);
    clock.advance(DEFAULT_PERIOD_SECS);
    source
        .set_cumulative(
            price0 * period,
            price1 * period,
            (BASE_TIME + DEFAULT_PERIOD_SECS) as u32,
        )
        .expect("set accumulators");
    oracle.update().expect("first update");
    oracle
}

/// Price `amount` of asset A for `account`, if the sentry lets it through.
fn gated_consult(sentry: &Sentry, oracle: &Oracle, account: &Address, amount: U256) -> Option<U256> {
    if !sentry.is_allowed(account) {
        return None;
    }
    Some(oracle.consult(&ASSET_A, amount).expect("consult"))
}

#[test]
fn sentry_gating_capacity_duplicate_and_not_found() {
    let mut sentry = Sentry::new(ADMIN);

    // =========================================================
    // Step 1: Fill the registry
    // =========================================================
    for i in 0..MAX_SENTRY_STRATEGIES {
        let address = Address::repeat(0x20 + i as u8);
        let event = sentry
            .add_strategy(&ADMIN, Arc::new(AllowListStrategy::new(address)))
            .expect("registration under capacity should succeed");
        assert_eq!(event, SentryEvent::AddSentryStrategy { strategy: address });
    }
    let registered = sentry.strategies();
    assert_eq!(registered.len(), MAX_SENTRY_STRATEGIES);

    // =========================================================
    // Step 2: Rejections do not disturb the registry
    // =========================================================
    let eleventh = Address::repeat(0x7f);
    assert_eq!(
        sentry.add_strategy(&ADMIN, Arc::new(AllowListStrategy::new(eleventh))),
        Err(SentryError::CapacityReached {
            max: MAX_SENTRY_STRATEGIES
        })
    );

    let existing = Address::repeat(0x20);
    assert_eq!(
        sentry.add_strategy(&ADMIN, Arc::new(AllowListStrategy::new(existing))),
        Err(SentryError::DuplicateStrategy(existing))
    );

    assert_eq!(
        sentry.remove_strategy(&ADMIN, &eleventh),
        Err(SentryError::StrategyNotFound(eleventh))
    );
    assert_eq!(sentry.strategies(), registered);

    // Freeing a slot makes room for exactly one more.
    sentry
        .remove_strategy(&ADMIN, &Address::repeat(0x25))
        .expect("remove registered strategy");
    sentry
        .add_strategy(&ADMIN, Arc::new(AllowListStrategy::new(eleventh)))
        .expect("slot was freed");
    assert_eq!(sentry.strategies().last(), Some(&eleventh));
    assert!(sentry
        .add_strategy(&ADMIN, Arc::new(AllowListStrategy::new(Address::repeat(0x7e))))
        .is_err());
}

#[test]
fn sentry_gating_controls_oracle_reads() {
    let oracle = priced_oracle();
    let mut sentry = Sentry::new(ADMIN);
    let one_a = U256::new(1_000_000);
    let one_b = U256::new(1_000_000_000_000_000_000);

    // An empty sentry lets everyone through.
    assert_eq!(gated_consult(&sentry, &oracle, &OUTSIDER, one_a), Some(one_b));

    // =========================================================
    // Step 3: Membership is read live from the shared strategy
    // =========================================================
    let desk = Arc::new(AllowListStrategy::with_members(Address::repeat(0x10), [TRADER]));
    let registered: Arc<dyn SentryStrategy> = desk.clone();
    sentry
        .add_strategy(&ADMIN, registered)
        .expect("add strategy");

    assert_eq!(gated_consult(&sentry, &oracle, &TRADER, one_a), Some(one_b));
    assert_eq!(gated_consult(&sentry, &oracle, &OUTSIDER, one_a), None);

    assert!(desk.insert(OUTSIDER).expect("insert"));
    assert_eq!(gated_consult(&sentry, &oracle, &OUTSIDER, one_a), Some(one_b));

    // A second strategy must also agree.
    let compliance = Arc::new(AllowListStrategy::with_members(Address::repeat(0x11), [TRADER]));
    sentry
        .add_strategy(&ADMIN, compliance)
        .expect("add second strategy");
    assert_eq!(gated_consult(&sentry, &oracle, &OUTSIDER, one_a), None);

    // =========================================================
    // Step 4: Sanctions override every strategy
    // =========================================================
    let sanctions: Arc<dyn SanctionsList> =
        Arc::new(SanctionsRegistry::new(Address::repeat(0x50), [TRADER]));
    let event = sentry
        .update_sanctions_list(&ADMIN, Some(sanctions))
        .expect("set sanctions");
    assert_eq!(event.to_event(BASE_TIME).event_type, EventType::UpdateSanctionsList);
    assert_eq!(gated_consult(&sentry, &oracle, &TRADER, one_a), None);

    sentry
        .update_sanctions_list(&ADMIN, None)
        .expect("clear sanctions");
    assert_eq!(sentry.sanctions_list(), None);
    assert_eq!(gated_consult(&sentry, &oracle, &TRADER, one_a), Some(one_b));
}

#[test]
fn sentry_gating_admin_handover() {
    let mut sentry = Sentry::new(ADMIN);
    let successor = Address::repeat(0xae);

    // =========================================================
    // Step 5: Grant, then the old admin steps down
    // =========================================================
    let granted = sentry.grant_admin(&ADMIN, successor).expect("grant");
    assert_eq!(
        granted.to_event(BASE_TIME).payload["account"],
        successor.to_string()
    );
    assert_eq!(
        sentry.grant_admin(&ADMIN, successor),
        Err(SentryError::AdminAlreadyGranted(successor))
    );

    sentry.revoke_admin(&ADMIN, &ADMIN).expect("self revoke");
    assert!(!sentry.is_admin(&ADMIN));
    assert!(sentry.is_admin(&successor));

    let strategy = Arc::new(AllowListStrategy::new(Address::repeat(0x10)));
    assert_eq!(
        sentry.add_strategy(&ADMIN, strategy.clone()),
        Err(SentryError::Unauthorized(ADMIN))
    );
    sentry
        .add_strategy(&successor, strategy)
        .expect("new admin can register");
    assert_eq!(
        sentry.revoke_admin(&successor, &ADMIN),
        Err(SentryError::AdminNotFound(ADMIN))
    );
}
