//! Genesis assembly
//!
//! [`GenesisAssembler`] turns a configuration, a set of allocations and an
//! entity table into a [`StakingGenesis`]. It runs in two passes over the
//! allocations: every entity account is created (and self-staked) first, so
//! that delegations may name any entity regardless of order.

use crate::{
    accounting::LedgerAccountant,
    address::Address,
    allocation::{AllocationSource, EntityAllocations},
    config::GenesisConfig,
    diagnostics::{AssemblyEvent, DiagnosticsSink},
    entities::EntityResolver,
    quantity::Quantity,
    types::StakingGenesis,
    Error, Result,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Provides the consensus parameters attached to the document
pub trait ConsensusParametersSource {
    /// Parameters as an opaque JSON value
    fn load(&self) -> Result<serde_json::Value>;
}

impl ConsensusParametersSource for serde_json::Value {
    fn load(&self) -> Result<serde_json::Value> {
        Ok(self.clone())
    }
}

/// Consensus parameters stored in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileParameters(pub PathBuf);

impl ConsensusParametersSource for JsonFileParameters {
    fn load(&self) -> Result<serde_json::Value> {
        let content = std::fs::read(&self.0)?;
        Ok(serde_json::from_slice(&content)?)
    }
}

/// Run options
#[derive(Debug, Clone, Copy, Default)]
pub struct GenesisOptions {
    /// Include test-only entities and delegations
    pub is_test_genesis: bool,
}

/// Builds staking genesis documents
#[derive(Debug)]
pub struct GenesisAssembler<'a> {
    config: &'a GenesisConfig,
    options: GenesisOptions,
}

/// Per-run state
struct Run<'a, 's> {
    config: &'a GenesisConfig,
    accountant: LedgerAccountant,
    seeds: BTreeMap<String, Address>,
    entities: &'a BTreeMap<String, Address>,
    sink: &'s mut dyn DiagnosticsSink,
}

impl<'a> GenesisAssembler<'a> {
    /// Assembler for `config`
    pub fn new(config: &'a GenesisConfig, options: GenesisOptions) -> Self {
        Self { config, options }
    }

    /// Build the document
    ///
    /// Any error aborts the whole run; nothing is returned in part.
    pub fn assemble(
        &self,
        allocations: &dyn AllocationSource,
        entities: &dyn EntityResolver,
        params: &dyn ConsensusParametersSource,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<StakingGenesis> {
        let params = params.load()?;
        let config = self.config;

        let mut run = Run {
            config,
            accountant: LedgerAccountant::new(
                config.precision()?,
                config.total_supply,
                config.commission_terms(),
            ),
            seeds: BTreeMap::new(),
            entities: entities.all(),
            sink,
        };

        run.add_seed_accounts()?;
        run.map_entities()?;
        run.apply_allocations(allocations.allocations())?;

        if self.options.is_test_genesis {
            run.apply_allocations(&config.test_only_entities)?;
            run.apply_test_only_outbound_delegations()?;
        }

        let snapshot = run.accountant.snapshot()?;
        let delegations = snapshot.delegations.values().map(BTreeMap::len).sum();
        run.sink.record(AssemblyEvent::Finalized {
            accounts: snapshot.ledger.len(),
            delegations,
            common_pool: snapshot.common_pool,
        });

        Ok(StakingGenesis {
            params,
            token_symbol: config.token_symbol.clone(),
            token_value_exponent: config.token_value_exponent,
            total_supply: snapshot.total_supply,
            common_pool: snapshot.common_pool,
            ledger: snapshot.ledger,
            delegations: snapshot.delegations,
        })
    }
}

impl Run<'_, '_> {
    fn add_seed_accounts(&mut self) -> Result<()> {
        for (name, account) in &self.config.accounts {
            self.accountant.add_account(account.address, &account.amount)?;
            self.seeds.insert(name.clone(), account.address);
            self.sink.record(AssemblyEvent::SeedAccountAdded {
                name: name.clone(),
                address: account.address,
                amount: account.amount,
            });
        }
        Ok(())
    }

    fn map_entities(&mut self) -> Result<()> {
        for (name, address) in self.entities {
            if self.seeds.contains_key(name) {
                return Err(Error::DuplicateEntity(name.clone()));
            }
            self.sink.record(AssemblyEvent::EntityMapped {
                name: name.clone(),
                address: *address,
            });
        }
        Ok(())
    }

    fn resolve_entity(&self, name: &str) -> Result<Address> {
        let name = name.to_lowercase();
        self.entities
            .get(&name)
            .copied()
            .ok_or(Error::UnknownEntity(name))
    }

    /// Seed accounts take precedence over entities
    fn resolve_source(&self, name: &str) -> Result<Address> {
        match self.seeds.get(&name.to_lowercase()) {
            Some(address) => Ok(*address),
            None => self.resolve_entity(name),
        }
    }

    fn apply_allocations(&mut self, allocations: &EntityAllocations) -> Result<()> {
        let minimum_balance = self.config.minimum_balance;

        for (name, allocation) in allocations {
            let address = self.resolve_entity(name)?;
            self.accountant.add_account(address, &allocation.funds)?;
            self.sink.record(AssemblyEvent::EntityFunded {
                name: name.clone(),
                funds: allocation.funds,
            });

            if allocation.funds > minimum_balance {
                let escrow = allocation.funds.checked_sub(&minimum_balance)?;
                self.accountant.add_delegation(address, address, &escrow)?;
            } else {
                self.sink.record(AssemblyEvent::SelfEscrowSkipped {
                    name: name.clone(),
                    funds: allocation.funds,
                });
            }
        }

        for (name, allocation) in allocations {
            let to = self.resolve_entity(name)?;
            for (source, amount) in &allocation.delegations {
                self.delegate(source, name, to, amount)?;
            }
        }

        Ok(())
    }

    fn apply_test_only_outbound_delegations(&mut self) -> Result<()> {
        let config = self.config;
        for (source, account) in &config.accounts {
            for (target, amount) in &account.test_only_outbound_delegations {
                let to = self.resolve_entity(target)?;
                self.delegate(source, target, to, amount)?;
            }
        }
        Ok(())
    }

    /// Unknown sources are fatal even when the amount is zero
    fn delegate(
        &mut self,
        source: &str,
        target: &str,
        to: Address,
        amount: &Quantity,
    ) -> Result<()> {
        let from = self.resolve_source(source)?;

        if amount.is_zero() {
            self.sink.record(AssemblyEvent::ZeroDelegationSkipped {
                from: source.to_string(),
                to: target.to_string(),
            });
            return Ok(());
        }

        self.accountant.add_delegation(from, to, amount)?;
        self.sink.record(AssemblyEvent::DelegationAdded {
            from: source.to_string(),
            to: target.to_string(),
            amount: *amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::Allocation;
    use crate::config::SeedAccount;
    use crate::crypto::KeyPair;
    use crate::diagnostics::RecordingSink;
    use crate::entities::StaticEntities;
    use serde_json::json;

    fn q(n: u64) -> Quantity {
        Quantity::from_u64(n)
    }

    fn key(seed: u8) -> KeyPair {
        KeyPair::from_seed(&[seed; 32])
    }

    fn address(seed: u8) -> Address {
        Address::from_public_key(&key(seed).public_key())
    }

    fn config() -> GenesisConfig {
        GenesisConfig {
            minimum_balance: q(1),
            total_supply: q(10),
            commission_rate: q(5),
            commission_rate_max: q(10),
            ..Default::default()
        }
    }

    fn allocation(funds: u64, delegations: &[(&str, u64)]) -> Allocation {
        Allocation {
            funds: q(funds),
            delegations: delegations
                .iter()
                .map(|(name, amount)| (name.to_string(), q(*amount)))
                .collect(),
        }
    }

    fn assemble(
        config: &GenesisConfig,
        allocations: &EntityAllocations,
        entities: &StaticEntities,
        is_test_genesis: bool,
    ) -> Result<StakingGenesis> {
        let mut sink = RecordingSink::new();
        GenesisAssembler::new(config, GenesisOptions { is_test_genesis }).assemble(
            allocations,
            entities,
            &json!({"max_allowances": 16}),
            &mut sink,
        )
    }

    #[test]
    fn test_single_entity_self_escrow() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("e1", &k1)]).unwrap();
        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(3, &[]));

        let genesis = assemble(&config(), &allocations, &entities, false).unwrap();

        let account = &genesis.ledger[&address(1)];
        assert_eq!(account.general.balance, q(1_000_000_000));
        assert_eq!(account.escrow.active.balance, q(2_000_000_000));
        assert_eq!(genesis.delegations[&address(1)][&address(1)].shares, q(2_000_000_000));
        assert_eq!(genesis.common_pool, q(7_000_000_000));
        assert_eq!(genesis.params["max_allowances"], 16);
        assert_eq!(genesis.token_symbol, "TEST");
    }

    #[test]
    fn test_funds_at_minimum_not_staked() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("e1", &k1)]).unwrap();
        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(1, &[]));

        let genesis = assemble(&config(), &allocations, &entities, false).unwrap();
        let account = &genesis.ledger[&address(1)];
        assert_eq!(account.general.balance, q(1_000_000_000));
        assert!(account.escrow.active.balance.is_zero());
        assert!(account.escrow.commission_schedule.is_none());
        assert!(genesis.delegations.is_empty());
    }

    #[test]
    fn test_delegation_between_entities_in_any_order() {
        let (k1, k2) = (key(1), key(2));
        let entities = StaticEntities::from_key_pairs([("a", &k1), ("b", &k2)]).unwrap();
        let mut allocations = EntityAllocations::new();
        // "a" receives from "b", which is created after "a" by name order
        allocations.insert("a".to_string(), allocation(0, &[("b", 2)]));
        allocations.insert("b".to_string(), allocation(2, &[]));

        let mut config = config();
        config.minimum_balance = q(5);
        let genesis = assemble(&config, &allocations, &entities, false).unwrap();

        assert!(genesis.ledger[&address(2)].general.balance.is_zero());
        assert_eq!(genesis.ledger[&address(1)].escrow.active.balance, q(2_000_000_000));
        assert!(genesis.ledger[&address(1)].escrow.commission_schedule.is_some());
    }

    #[test]
    fn test_seed_account_delegates_before_entity_lookup() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("e1", &k1)]).unwrap();
        let mut config = config();
        config.accounts.insert(
            "treasury".to_string(),
            SeedAccount {
                amount: q(4),
                address: address(9),
                csv_label: None,
                test_only_outbound_delegations: BTreeMap::new(),
            },
        );
        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(0, &[("Treasury", 3), ("e1", 0)]));

        let mut sink = RecordingSink::new();
        let genesis = GenesisAssembler::new(&config, GenesisOptions::default())
            .assemble(&allocations, &entities, &json!({}), &mut sink)
            .unwrap();

        assert_eq!(genesis.ledger[&address(9)].general.balance, q(1_000_000_000));
        assert_eq!(genesis.delegations[&address(1)][&address(9)].shares, q(3_000_000_000));
        assert!(sink.events.contains(&AssemblyEvent::ZeroDelegationSkipped {
            from: "e1".to_string(),
            to: "e1".to_string(),
        }));
        assert!(matches!(
            sink.events.last(),
            Some(AssemblyEvent::Finalized { accounts: 2, delegations: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_names_are_fatal() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("e1", &k1)]).unwrap();

        let mut allocations = EntityAllocations::new();
        allocations.insert("ghost".to_string(), allocation(1, &[]));
        let err = assemble(&config(), &allocations, &entities, false).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(name) if name == "ghost"));

        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(1, &[("nobody", 1)]));
        let err = assemble(&config(), &allocations, &entities, false).unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(name) if name == "nobody"));
    }

    #[test]
    fn test_zero_delegation_from_unknown_source_is_fatal() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("e1", &k1)]).unwrap();
        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(1, &[("no_such_account", 0)]));

        let mut sink = RecordingSink::new();
        let err = GenesisAssembler::new(&config(), GenesisOptions::default())
            .assemble(&allocations, &entities, &json!({}), &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(name) if name == "no_such_account"));
        assert!(!sink
            .events
            .iter()
            .any(|e| matches!(e, AssemblyEvent::ZeroDelegationSkipped { .. })));
    }

    #[test]
    fn test_rejected_delegation_not_recorded() {
        let (k1, k2) = (key(1), key(2));
        let entities = StaticEntities::from_key_pairs([("a", &k1), ("b", &k2)]).unwrap();
        let mut allocations = EntityAllocations::new();
        allocations.insert("a".to_string(), allocation(0, &[("b", 5)]));
        allocations.insert("b".to_string(), allocation(1, &[]));

        let mut sink = RecordingSink::new();
        let err = GenesisAssembler::new(&config(), GenesisOptions::default())
            .assemble(&allocations, &entities, &json!({}), &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert!(!sink
            .events
            .iter()
            .any(|e| matches!(e, AssemblyEvent::DelegationAdded { .. })));
        assert_eq!(
            sink.events.last(),
            Some(&AssemblyEvent::SelfEscrowSkipped {
                name: "b".to_string(),
                funds: q(1),
            })
        );
    }

    #[test]
    fn test_entity_named_like_seed_account_rejected() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("treasury", &k1)]).unwrap();
        let mut config = config();
        config.accounts.insert(
            "treasury".to_string(),
            SeedAccount {
                amount: q(1),
                address: address(9),
                csv_label: None,
                test_only_outbound_delegations: BTreeMap::new(),
            },
        );

        let err = assemble(&config, &EntityAllocations::new(), &entities, false).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity(name) if name == "treasury"));
    }

    #[test]
    fn test_over_allocation_fails() {
        let k1 = key(1);
        let entities = StaticEntities::from_key_pairs([("e1", &k1)]).unwrap();
        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(11, &[]));

        let err = assemble(&config(), &allocations, &entities, false).unwrap_err();
        assert!(matches!(err, Error::InsufficientSupply { .. }));
    }

    #[test]
    fn test_test_only_allocations_need_test_mode() {
        let (k1, k2) = (key(1), key(2));
        let entities = StaticEntities::from_key_pairs([("e1", &k1), ("e2", &k2)]).unwrap();
        let mut config = config();
        config.test_only_entities.insert("e2".to_string(), allocation(2, &[]));
        let mut outbound = BTreeMap::new();
        outbound.insert("e1".to_string(), q(1));
        config.accounts.insert(
            "faucet".to_string(),
            SeedAccount {
                amount: q(3),
                address: address(9),
                csv_label: None,
                test_only_outbound_delegations: outbound,
            },
        );
        let mut allocations = EntityAllocations::new();
        allocations.insert("e1".to_string(), allocation(0, &[]));

        let genesis = assemble(&config, &allocations, &entities, false).unwrap();
        assert!(!genesis.ledger.contains_key(&address(2)));
        assert!(genesis.delegations.is_empty());

        let genesis = assemble(&config, &allocations, &entities, true).unwrap();
        assert_eq!(genesis.ledger[&address(2)].escrow.active.balance, q(1_000_000_000));
        assert_eq!(genesis.delegations[&address(1)][&address(9)].shares, q(1_000_000_000));
        assert_eq!(genesis.ledger[&address(9)].general.balance, q(2_000_000_000));
        assert_eq!(genesis.common_pool, q(5_000_000_000));
    }

    #[test]
    fn test_parameters_loaded_before_anything_else() {
        let entities = StaticEntities::new();
        let missing = JsonFileParameters(PathBuf::from("/nonexistent/params.json"));
        let mut sink = RecordingSink::new();

        let config = config();
        let err = GenesisAssembler::new(&config, GenesisOptions::default())
            .assemble(&EntityAllocations::new(), &entities, &missing, &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(sink.events.is_empty());
    }
}
