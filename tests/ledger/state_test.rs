// Ledger State Tests
// Genesis, transfers, allowances and delegated transfers

use lovecoin::identity::Address;
use lovecoin::ledger::{
    Amount, ConfigError, GenesisConfig, Ledger, LedgerError, LedgerEvent, LedgerState,
    ManualClock, Role, TokenMetadata,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn genesis_supply() -> Amount {
    Amount::new(10_000_000 * 10u128.pow(18))
}

fn deploy() -> (Ledger, Address) {
    let deployer = Address::generate();
    let clock = ManualClock::new(1_700_000_000);
    let ledger = Ledger::with_clock(&GenesisConfig::default(), deployer, Arc::new(clock)).unwrap();
    (ledger, deployer)
}

fn sum_of_balances(ledger: &Ledger) -> Amount {
    ledger
        .holders()
        .iter()
        .fold(Amount::ZERO, |acc, (_, amount)| acc.checked_add(*amount).unwrap())
}

// ============================================================================
// GENESIS
// ============================================================================

#[test]
fn test_metadata() {
    let (ledger, _) = deploy();

    assert_eq!(ledger.name(), "LoveCoin");
    assert_eq!(ledger.symbol(), "LOVE");
    assert_eq!(ledger.decimals(), 18);
}

#[test]
fn test_genesis_supply_belongs_to_deployer() {
    let (ledger, deployer) = deploy();

    assert_eq!(ledger.total_supply(), genesis_supply());
    assert_eq!(ledger.balance_of(&deployer), genesis_supply());
    assert_eq!(ledger.admin(), &deployer);
}

#[test]
fn test_genesis_minting_disabled() {
    let (ledger, deployer) = deploy();

    assert_eq!(ledger.mint_amount(), Amount::ZERO);
    assert_eq!(ledger.last_mint(&deployer), None);
    assert!(ledger.events().is_empty());
}

#[test]
fn test_unknown_accounts_read_as_zero() {
    let (ledger, _) = deploy();
    let stranger = Address::generate();

    assert_eq!(ledger.balance_of(&stranger), Amount::ZERO);
    assert_eq!(ledger.allowance(&stranger, &Address::generate()), Amount::ZERO);
    assert_eq!(ledger.holders().len(), 1);
}

#[test]
fn test_custom_genesis() {
    let deployer = Address::generate();
    let config = GenesisConfig::new()
        .with_name("PiticoBidugoCoin")
        .with_symbol("PBC")
        .with_decimals(6)
        .with_initial_supply(500);
    let ledger = Ledger::new(&config, deployer).unwrap();

    assert_eq!(ledger.symbol(), "PBC");
    assert_eq!(ledger.total_supply(), Amount::new(500_000_000));
}

#[test]
fn test_genesis_config_validation() {
    let deployer = Address::generate();

    let empty_name = GenesisConfig::new().with_name("  ");
    assert_eq!(Ledger::new(&empty_name, deployer).unwrap_err(), ConfigError::EmptyName);

    let empty_symbol = GenesisConfig::new().with_symbol("");
    assert_eq!(Ledger::new(&empty_symbol, deployer).unwrap_err(), ConfigError::EmptySymbol);

    let decimals = GenesisConfig::new().with_decimals(39);
    assert_eq!(
        Ledger::new(&decimals, deployer).unwrap_err(),
        ConfigError::TooManyDecimals(39)
    );

    let supply = GenesisConfig::new().with_initial_supply(u128::MAX);
    assert!(matches!(
        Ledger::new(&supply, deployer).unwrap_err(),
        ConfigError::SupplyOverflow { .. }
    ));
}

#[test]
fn test_zero_genesis_supply() {
    let deployer = Address::generate();
    let config = GenesisConfig::new().with_initial_supply(0);
    let ledger = Ledger::new(&config, deployer).unwrap();

    assert_eq!(ledger.total_supply(), Amount::ZERO);
    assert!(ledger.holders().is_empty());
}

#[test]
fn test_multiple_ledgers_are_independent() {
    let (mut first, deployer_a) = deploy();
    let (second, deployer_b) = deploy();

    first.transfer(&deployer_a, &deployer_b, Amount::new(1)).unwrap();

    assert_eq!(second.balance_of(&deployer_b), genesis_supply());
    assert_eq!(second.balance_of(&deployer_a), Amount::ZERO);
}

// ============================================================================
// TRANSFER
// ============================================================================

#[test]
fn test_transfer() {
    let (mut ledger, deployer) = deploy();
    let other = Address::generate();

    ledger.transfer(&deployer, &other, Amount::new(10)).unwrap();

    assert_eq!(
        ledger.balance_of(&deployer),
        genesis_supply().checked_sub(Amount::new(10)).unwrap()
    );
    assert_eq!(ledger.balance_of(&other), Amount::new(10));
    assert_eq!(ledger.total_supply(), genesis_supply());
}

#[test]
fn test_transfer_insufficient_balance() {
    let (mut ledger, deployer) = deploy();
    let other = Address::generate();
    let before = ledger.snapshot();

    let result = ledger.transfer(&other, &deployer, Amount::new(20));

    assert_eq!(
        result,
        Err(LedgerError::InsufficientBalance {
            account: other,
            requested: Amount::new(20),
            available: Amount::ZERO,
        })
    );
    assert_eq!(ledger.snapshot(), before);
}

#[test]
fn test_transfer_entire_balance() {
    let (mut ledger, deployer) = deploy();
    let other = Address::generate();

    ledger.transfer(&deployer, &other, genesis_supply()).unwrap();

    assert_eq!(ledger.balance_of(&deployer), Amount::ZERO);
    assert_eq!(ledger.balance_of(&other), genesis_supply());
    assert_eq!(ledger.holders(), vec![(other, genesis_supply())]);
}

#[test]
fn test_self_transfer_is_noop_but_checked() {
    let (mut ledger, deployer) = deploy();

    ledger.transfer(&deployer, &deployer, Amount::new(100)).unwrap();
    assert_eq!(ledger.balance_of(&deployer), genesis_supply());

    let too_much = genesis_supply().checked_add(Amount::new(1)).unwrap();
    let result = ledger.transfer(&deployer, &deployer, too_much);
    assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
}

#[test]
fn test_zero_amount_transfer() {
    let (mut ledger, _) = deploy();
    let empty = Address::generate();
    let other = Address::generate();

    ledger.transfer(&empty, &other, Amount::ZERO).unwrap();

    assert_eq!(ledger.balance_of(&other), Amount::ZERO);
    assert_eq!(ledger.holders().len(), 1);
}

#[test]
fn test_transfer_to_zero_address_allowed() {
    let (mut ledger, deployer) = deploy();

    ledger.transfer(&deployer, &Address::ZERO, Amount::new(7)).unwrap();

    assert_eq!(ledger.balance_of(&Address::ZERO), Amount::new(7));
    assert_eq!(ledger.total_supply(), genesis_supply());
}

#[test]
fn test_transfer_emits_event() {
    let (mut ledger, deployer) = deploy();
    let other = Address::generate();

    ledger.transfer(&deployer, &other, Amount::new(3)).unwrap();

    assert_eq!(
        ledger.events(),
        &[LedgerEvent::Transfer {
            from: deployer,
            to: other,
            amount: Amount::new(3),
        }]
    );
}

#[test]
fn test_failed_transfer_emits_nothing() {
    let (mut ledger, _) = deploy();
    let _ = ledger.transfer(&Address::generate(), &Address::generate(), Amount::new(1));
    assert!(ledger.events().is_empty());
}

// ============================================================================
// APPROVE
// ============================================================================

#[test]
fn test_approve() {
    let (mut ledger, deployer) = deploy();
    let exchange = Address::generate();

    ledger.approve(&deployer, &exchange, Amount::new(1)).unwrap();

    assert_eq!(ledger.allowance(&deployer, &exchange), Amount::new(1));
    assert_eq!(ledger.allowance(&exchange, &deployer), Amount::ZERO);
}

#[test]
fn test_approve_overwrites() {
    let (mut ledger, deployer) = deploy();
    let exchange = Address::generate();

    ledger.approve(&deployer, &exchange, Amount::new(100)).unwrap();
    ledger.approve(&deployer, &exchange, Amount::new(30)).unwrap();
    assert_eq!(ledger.allowance(&deployer, &exchange), Amount::new(30));

    ledger.approve(&deployer, &exchange, Amount::ZERO).unwrap();
    assert_eq!(ledger.allowance(&deployer, &exchange), Amount::ZERO);
}

#[test]
fn test_approve_more_than_balance() {
    let (mut ledger, _) = deploy();
    let owner = Address::generate();
    let spender = Address::generate();

    ledger.approve(&owner, &spender, Amount::new(1_000)).unwrap();

    assert_eq!(ledger.allowance(&owner, &spender), Amount::new(1_000));
}

#[test]
fn test_approve_zero_spender_rejected() {
    let (mut ledger, deployer) = deploy();

    let result = ledger.approve(&deployer, &Address::ZERO, Amount::new(5));

    assert_eq!(result, Err(LedgerError::InvalidSpender { spender: Address::ZERO }));
    assert!(ledger.events().is_empty());
}

#[test]
fn test_approve_emits_event() {
    let (mut ledger, deployer) = deploy();
    let spender = Address::generate();

    ledger.approve(&deployer, &spender, Amount::new(9)).unwrap();

    assert_eq!(
        ledger.events().last(),
        Some(&LedgerEvent::Approval {
            owner: deployer,
            spender,
            amount: Amount::new(9),
        })
    );
}

// ============================================================================
// TRANSFER FROM
// ============================================================================

#[test]
fn test_transfer_from() {
    let (mut ledger, deployer) = deploy();
    let exchange = Address::generate();
    let third = Address::generate();

    ledger.approve(&deployer, &exchange, Amount::new(10)).unwrap();
    ledger
        .transfer_from(&exchange, &deployer, &third, Amount::new(5))
        .unwrap();

    assert_eq!(ledger.allowance(&deployer, &exchange), Amount::new(5));
    assert_eq!(ledger.balance_of(&third), Amount::new(5));
    assert_eq!(ledger.balance_of(&exchange), Amount::ZERO);
    assert_eq!(
        ledger.balance_of(&deployer),
        genesis_supply().checked_sub(Amount::new(5)).unwrap()
    );
}

#[test]
fn test_transfer_from_without_approval() {
    let (mut ledger, deployer) = deploy();
    let exchange = Address::generate();
    let third = Address::generate();

    let result = ledger.transfer_from(&exchange, &deployer, &third, Amount::new(5));

    assert_eq!(
        result,
        Err(LedgerError::InsufficientAllowance {
            owner: deployer,
            spender: exchange,
            requested: Amount::new(5),
            available: Amount::ZERO,
        })
    );
}

#[test]
fn test_transfer_from_insufficient_balance() {
    let (mut ledger, deployer) = deploy();
    let exchange = Address::generate();
    let third = Address::generate();

    ledger.approve(&third, &exchange, Amount::new(10)).unwrap();
    let before = ledger.snapshot();

    let result = ledger.transfer_from(&exchange, &third, &deployer, Amount::new(5));

    assert_eq!(
        result,
        Err(LedgerError::InsufficientBalance {
            account: third,
            requested: Amount::new(5),
            available: Amount::ZERO,
        })
    );
    assert_eq!(ledger.snapshot(), before);
    assert_eq!(ledger.allowance(&third, &exchange), Amount::new(10));
}

#[test]
fn test_transfer_from_checks_allowance_first() {
    let (mut ledger, _) = deploy();
    let broke = Address::generate();
    let spender = Address::generate();

    ledger.approve(&broke, &spender, Amount::new(1)).unwrap();
    let result = ledger.transfer_from(&spender, &broke, &spender, Amount::new(5));

    assert!(matches!(result, Err(LedgerError::InsufficientAllowance { .. })));
}

#[test]
fn test_transfer_from_exhausts_allowance() {
    let (mut ledger, deployer) = deploy();
    let spender = Address::generate();

    ledger.approve(&deployer, &spender, Amount::new(10)).unwrap();
    ledger
        .transfer_from(&spender, &deployer, &spender, Amount::new(10))
        .unwrap();

    assert_eq!(ledger.allowance(&deployer, &spender), Amount::ZERO);
    let again = ledger.transfer_from(&spender, &deployer, &spender, Amount::new(1));
    assert!(matches!(again, Err(LedgerError::InsufficientAllowance { .. })));
}

#[test]
fn test_transfer_from_to_owner_still_spends_allowance() {
    let (mut ledger, deployer) = deploy();
    let spender = Address::generate();

    ledger.approve(&deployer, &spender, Amount::new(10)).unwrap();
    ledger
        .transfer_from(&spender, &deployer, &deployer, Amount::new(4))
        .unwrap();

    assert_eq!(ledger.balance_of(&deployer), genesis_supply());
    assert_eq!(ledger.allowance(&deployer, &spender), Amount::new(6));
}

#[test]
fn test_transfer_from_emits_transfer_event() {
    let (mut ledger, deployer) = deploy();
    let spender = Address::generate();
    let to = Address::generate();

    ledger.approve(&deployer, &spender, Amount::new(10)).unwrap();
    ledger
        .transfer_from(&spender, &deployer, &to, Amount::new(2))
        .unwrap();

    assert_eq!(ledger.events().len(), 2);
    assert_eq!(
        ledger.events()[1],
        LedgerEvent::Transfer {
            from: deployer,
            to,
            amount: Amount::new(2),
        }
    );
}

// ============================================================================
// INVARIANTS
// ============================================================================

#[test]
fn test_conservation_across_transfers() {
    let (mut ledger, deployer) = deploy();
    let accounts: Vec<Address> = (0..5).map(|_| Address::generate()).collect();

    for (i, account) in accounts.iter().enumerate() {
        ledger
            .transfer(&deployer, account, Amount::new(1_000 * (i as u128 + 1)))
            .unwrap();
    }
    for window in accounts.windows(2) {
        ledger.approve(&window[0], &window[1], Amount::new(500)).unwrap();
        ledger
            .transfer_from(&window[1], &window[0], &deployer, Amount::new(300))
            .unwrap();
        let _ = ledger.transfer(&window[1], &window[0], Amount::new(10_000_000));
        assert_eq!(sum_of_balances(&ledger), ledger.total_supply());
    }

    assert_eq!(ledger.total_supply(), genesis_supply());
}

#[test]
fn test_unauthorized_carries_role() {
    let (mut ledger, _) = deploy();
    let intruder = Address::generate();

    let result = ledger.set_mint_delay(&intruder, 1);

    assert_eq!(
        result,
        Err(LedgerError::Unauthorized {
            caller: intruder,
            required_role: Role::Admin,
        })
    );
}

// ============================================================================
// SNAPSHOTS
// ============================================================================

#[test]
fn test_restore_from_snapshot() {
    let (mut ledger, deployer) = deploy();
    let other = Address::generate();
    ledger.transfer(&deployer, &other, Amount::new(42)).unwrap();
    ledger.approve(&other, &deployer, Amount::new(2)).unwrap();

    let bytes = ledger.state().to_bytes().unwrap();
    let state = LedgerState::from_bytes(&bytes).unwrap();
    let restored = Ledger::from_state(state, Arc::new(ManualClock::new(0))).unwrap();

    assert_eq!(restored.balance_of(&other), Amount::new(42));
    assert_eq!(restored.allowance(&other, &deployer), Amount::new(2));
    assert_eq!(restored.admin(), &deployer);
    // events are handed to the host, never carried in the snapshot
    assert_eq!(ledger.events().len(), 2);
    assert!(restored.events().is_empty());
}

#[test]
fn test_snapshot_size_independent_of_history() {
    let (mut ledger, deployer) = deploy();
    let other = Address::generate();
    ledger.transfer(&deployer, &other, Amount::new(1)).unwrap();
    let before = ledger.state().to_bytes().unwrap().len();

    for _ in 0..100 {
        ledger.transfer(&deployer, &other, Amount::new(1)).unwrap();
        ledger.transfer(&other, &deployer, Amount::new(1)).unwrap();
    }

    assert_eq!(ledger.state().to_bytes().unwrap().len(), before);
    assert_eq!(ledger.drain_events().len(), 201);
}

/// Field-for-field copy of the snapshot layout, used to hand-craft encodings
/// the ledger itself would never produce
#[derive(Serialize)]
struct RawState {
    metadata: TokenMetadata,
    admin: Address,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    mint_amount: Amount,
    mint_delay: u64,
    last_mint: BTreeMap<Address, u64>,
}

impl RawState {
    fn new(admin: Address, total_supply: u128, balances: &[(Address, u128)]) -> Self {
        Self {
            metadata: TokenMetadata {
                name: "LoveCoin".to_string(),
                symbol: "LOVE".to_string(),
                decimals: 0,
            },
            admin,
            total_supply: Amount::new(total_supply),
            balances: balances.iter().map(|(a, v)| (*a, Amount::new(*v))).collect(),
            allowances: BTreeMap::new(),
            mint_amount: Amount::ZERO,
            mint_delay: 0,
            last_mint: BTreeMap::new(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap()
    }
}

#[test]
fn test_raw_state_layout_matches_snapshot() {
    let deployer = Address::generate();
    let config = GenesisConfig::new().with_decimals(0).with_initial_supply(1_000_000).with_mint_delay_secs(0);
    let ledger = Ledger::with_clock(&config, deployer, Arc::new(ManualClock::new(0))).unwrap();

    let raw = RawState::new(deployer, 1_000_000, &[(deployer, 1_000_000)]);
    assert_eq!(LedgerState::from_bytes(&raw.encode()).unwrap(), ledger.snapshot());
}

#[test]
fn test_from_bytes_rejects_supply_mismatch() {
    let deployer = Address::generate();
    let raw = RawState::new(deployer, 10, &[(deployer, 1_000_000)]);

    let result = LedgerState::from_bytes(&raw.encode());
    assert!(matches!(result, Err(LedgerError::CorruptState(_))));
}

#[test]
fn test_from_bytes_rejects_balance_sum_overflow() {
    let raw = RawState::new(
        Address::generate(),
        u128::MAX,
        &[(Address::generate(), u128::MAX), (Address::generate(), 1)],
    );

    let result = LedgerState::from_bytes(&raw.encode());
    assert!(matches!(result, Err(LedgerError::CorruptState(_))));
}

#[test]
fn test_from_bytes_rejects_zero_entries() {
    let deployer = Address::generate();
    let spender = Address::generate();

    let zero_balance = RawState::new(deployer, 5, &[(deployer, 5), (spender, 0)]);
    assert!(matches!(
        LedgerState::from_bytes(&zero_balance.encode()),
        Err(LedgerError::CorruptState(_))
    ));

    let mut zero_allowance = RawState::new(deployer, 5, &[(deployer, 5)]);
    zero_allowance.allowances.insert((deployer, spender), Amount::ZERO);
    assert!(matches!(
        LedgerState::from_bytes(&zero_allowance.encode()),
        Err(LedgerError::CorruptState(_))
    ));
}

#[test]
fn test_from_bytes_rejects_garbage() {
    let result = LedgerState::from_bytes(&[0xff, 0xff, 0xff]);
    assert_eq!(result, Err(LedgerError::DeserializationFailed));
}
