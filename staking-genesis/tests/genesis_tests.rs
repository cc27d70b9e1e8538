//! End-to-end assembly against the fixtures in `tests/fixtures`

use staking_genesis::{
    crypto::KeyPair,
    diagnostics::SkipReason,
    Address, AllocationReport, AssemblyEvent, EntitiesDirectory, EntityDescriptor, Error,
    GenesisAssembler,
    GenesisConfig, GenesisOptions, JsonFileParameters, Quantity, RecordingSink, StakingGenesis,
    StaticEntities,
};
use std::path::{Path, PathBuf};

const ENTITY_NAMES: [&str; 5] = ["test1", "test2", "test3", "test4", "test5"];

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn q(n: u64) -> Quantity {
    Quantity::from_u64(n)
}

/// Whole tokens at exponent 9
fn tokens(n: u64) -> Quantity {
    Quantity::from_u64(n).checked_mul(&q(1_000_000_000)).unwrap()
}

fn entity_key(index: usize) -> KeyPair {
    KeyPair::from_seed(&[index as u8 + 1; 32])
}

fn entity(name: &str) -> Address {
    let index = ENTITY_NAMES.iter().position(|n| *n == name).unwrap();
    Address::from_public_key(&entity_key(index).public_key())
}

fn seed(name: &str) -> Address {
    match name {
        "account1" => "oasis1qz2kz3zkgf6trclyajtyg4jecw7es7p5tutfqaz0".parse().unwrap(),
        "account2" => "oasis1qz6hdmtth24x5udlvmavufwvy5ac6pvh2cdlehnx".parse().unwrap(),
        _ => unreachable!(),
    }
}

fn static_entities() -> StaticEntities {
    let mut entities = StaticEntities::new();
    for name in ENTITY_NAMES {
        entities.insert(name, entity(name)).unwrap();
    }
    entities
}

fn build(is_test_genesis: bool) -> (StakingGenesis, RecordingSink) {
    let config = GenesisConfig::from_file(fixture("staking_ledger_config.yaml")).unwrap();
    let mut sink = RecordingSink::new();
    let report = AllocationReport::from_path(
        fixture("allocations.csv"),
        &config.csv_options,
        &config.accounts,
        &mut sink,
    )
    .unwrap();

    let genesis = GenesisAssembler::new(&config, GenesisOptions { is_test_genesis })
        .assemble(
            &report,
            &static_entities(),
            &JsonFileParameters(fixture("consensus_params.json")),
            &mut sink,
        )
        .unwrap();
    (genesis, sink)
}

fn assert_conserved(genesis: &StakingGenesis) {
    let allocated = genesis.ledger.values().fold(Quantity::zero(), |acc, account| {
        acc.checked_add(&account.general.balance)
            .and_then(|acc| acc.checked_add(&account.escrow.active.balance))
            .and_then(|acc| acc.checked_add(&account.escrow.debonding.balance))
            .unwrap()
    });
    assert_eq!(allocated.checked_add(&genesis.common_pool).unwrap(), genesis.total_supply);
}

#[test]
fn test_assemble_from_fixtures() {
    let (genesis, sink) = build(false);

    assert_eq!(genesis.token_symbol, "TEST");
    assert_eq!(genesis.token_value_exponent, 9);
    assert_eq!(genesis.total_supply, tokens(10_000_000_000));
    assert_eq!(genesis.common_pool, tokens(6_499_999_000));
    assert_eq!(genesis.params["debonding_interval"], 336);
    assert_conserved(&genesis);

    // Two seed accounts and four eligible entities
    assert_eq!(genesis.ledger.len(), 6);
    assert!(!genesis.ledger.contains_key(&entity("test5")));

    let test1 = &genesis.ledger[&entity("test1")];
    assert_eq!(test1.general.balance, tokens(100));
    assert_eq!(test1.escrow.active.balance, tokens(199_999_900));

    let test2 = &genesis.ledger[&entity("test2")];
    assert_eq!(test2.general.balance, tokens(100));
    assert_eq!(test2.escrow.active.balance, tokens(299_999_900));
    assert_eq!(test2.escrow.active.total_shares, tokens(299_999_900));

    let test3 = &genesis.ledger[&entity("test3")];
    assert_eq!(test3.general.balance, tokens(100));
    assert_eq!(test3.escrow.active.balance, tokens(200_000_900));
    assert_eq!(
        genesis.delegations[&entity("test3")][&entity("test3")].shares,
        tokens(100_000_900)
    );

    // No KYC: no funding, delegations still received
    let test4 = &genesis.ledger[&entity("test4")];
    assert!(test4.general.balance.is_zero());
    assert_eq!(test4.escrow.active.balance, tokens(1_000));
    assert!(genesis.delegations[&entity("test4")].get(&entity("test4")).is_none());

    assert_eq!(genesis.ledger[&seed("account1")].general.balance, tokens(899_999_000));
    assert_eq!(genesis.ledger[&seed("account2")].general.balance, tokens(1_900_000_000));
    assert!(genesis.ledger[&seed("account1")].escrow.commission_schedule.is_none());

    let schedule = test2.escrow.commission_schedule.as_ref().unwrap();
    assert_eq!(schedule.rates[0].rate, q(5_000));
    assert_eq!(schedule.bounds[0].rate_max, q(20_000));

    assert!(sink.events.contains(&AssemblyEvent::RowSkipped {
        row: 6,
        reason: SkipReason::NotEligible
    }));
    assert!(sink.events.contains(&AssemblyEvent::RowSkipped {
        row: 7,
        reason: SkipReason::BlankEntityName
    }));
    assert!(matches!(
        sink.events.last(),
        Some(AssemblyEvent::Finalized { accounts: 6, delegations: 6, .. })
    ));
}

#[test]
fn test_assemble_test_genesis() {
    let (genesis, _) = build(true);

    assert_eq!(genesis.common_pool, tokens(6_199_998_900));
    assert_conserved(&genesis);

    let test5 = &genesis.ledger[&entity("test5")];
    assert_eq!(test5.general.balance, tokens(100));
    assert_eq!(test5.escrow.active.balance, tokens(350_000_000));

    assert_eq!(
        genesis.ledger[&entity("test1")].escrow.active.balance,
        tokens(499_999_900)
    );
    assert_eq!(
        genesis.delegations[&entity("test1")][&seed("account2")].shares,
        tokens(300_000_000)
    );
    assert_eq!(genesis.ledger[&seed("account1")].general.balance, tokens(849_999_000));
    assert_eq!(genesis.ledger[&seed("account2")].general.balance, tokens(1_600_000_000));
}

#[test]
fn test_output_is_deterministic() {
    let (first, _) = build(true);
    let (second, _) = build(true);
    assert_eq!(
        serde_json::to_vec_pretty(&first).unwrap(),
        serde_json::to_vec_pretty(&second).unwrap()
    );
}

#[test]
fn test_output_json_shape() {
    let (genesis, _) = build(false);
    let json = serde_json::to_value(&genesis).unwrap();

    assert_eq!(json["total_supply"], "10000000000000000000");
    assert_eq!(json["common_pool"], "6499999000000000000");
    assert_eq!(json["params"]["min_delegation"], "100000000000");

    let account1 = seed("account1").to_string();
    assert_eq!(json["ledger"][&account1]["general"]["balance"], "899999000000000000");

    let test2 = entity("test2").to_string();
    assert_eq!(
        json["delegations"][&test2][&account1]["shares"],
        "100000000000000000"
    );

    // Ledger keys follow address byte order
    let mut addresses: Vec<Address> = genesis.ledger.keys().copied().collect();
    let keys: Vec<String> = addresses.iter().map(Address::to_string).collect();
    addresses.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    assert_eq!(keys, addresses.iter().map(Address::to_string).collect::<Vec<_>>());

    let parsed: StakingGenesis = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, genesis);
}

#[test]
fn test_entities_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    for (index, name) in ENTITY_NAMES.iter().enumerate() {
        let entity_dir = dir.path().join(name).join("entity");
        std::fs::create_dir_all(&entity_dir).unwrap();
        let key = entity_key(index);
        let envelope = EntityDescriptor::new(&key).sign(&key).unwrap();
        std::fs::write(
            entity_dir.join("entity_genesis.json"),
            serde_json::to_vec(&envelope).unwrap(),
        )
        .unwrap();
    }

    let entities = EntitiesDirectory::load(&[dir.path().to_path_buf()]).unwrap();
    let config = GenesisConfig::from_file(fixture("staking_ledger_config.yaml")).unwrap();
    let mut sink = RecordingSink::new();
    let report = AllocationReport::from_path(
        fixture("allocations.csv"),
        &config.csv_options,
        &config.accounts,
        &mut sink,
    )
    .unwrap();

    let genesis = GenesisAssembler::new(&config, GenesisOptions::default())
        .assemble(
            &report,
            &entities,
            &JsonFileParameters(fixture("consensus_params.json")),
            &mut sink,
        )
        .unwrap();

    let (expected, _) = build(false);
    assert_eq!(genesis, expected);
}

#[test]
fn test_missing_entity_aborts() {
    let config = GenesisConfig::from_file(fixture("staking_ledger_config.yaml")).unwrap();
    let mut sink = RecordingSink::new();
    let report = AllocationReport::from_path(
        fixture("allocations.csv"),
        &config.csv_options,
        &config.accounts,
        &mut sink,
    )
    .unwrap();

    let mut entities = StaticEntities::new();
    for name in ["test1", "test2", "test4"] {
        entities.insert(name, entity(name)).unwrap();
    }

    let err = GenesisAssembler::new(&config, GenesisOptions::default())
        .assemble(&report, &entities, &serde_json::json!({}), &mut sink)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownEntity(name) if name == "test3"));
}

#[test]
fn test_overdrawn_seed_account_aborts() {
    let mut config = GenesisConfig::from_file(fixture("staking_ledger_config.yaml")).unwrap();
    if let Some(account) = config.accounts.get_mut("account1") {
        account.amount = q(100_000_000);
    }
    let mut sink = RecordingSink::new();
    let report = AllocationReport::from_path(
        fixture("allocations.csv"),
        &config.csv_options,
        &config.accounts,
        &mut sink,
    )
    .unwrap();

    // test2 takes all of account1, test4's 1000 tokens no longer fit
    let err = GenesisAssembler::new(&config, GenesisOptions::default())
        .assemble(&report, &static_entities(), &serde_json::json!({}), &mut sink)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientBalance { address, .. } if address == seed("account1")
    ));
}

#[test]
fn test_duplicate_entity_in_report_aborts() {
    let config = GenesisConfig::from_file(fixture("staking_ledger_config.yaml")).unwrap();
    let csv = "KYC,Entity Package Submitted,Entity Package Name,Funding,\
               Account 1 Delegation,Account 2 Delegation\n\
               TRUE,TRUE,test1,10,0,0\n\
               TRUE,TRUE,Test1,20,0,0\n";
    let mut sink = RecordingSink::new();
    let err = AllocationReport::from_reader(
        csv.as_bytes(),
        &config.csv_options,
        &config.accounts,
        &mut sink,
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateEntity(name) if name == "test1"));
}
