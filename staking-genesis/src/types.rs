//! Core types for the staking ledger
//!
//! All maps are `BTreeMap`s keyed by [`Address`], so serialization order is
//! the byte order of the addresses and does not depend on insertion order.

use crate::{address::Address, quantity::Quantity, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-address account records
pub type Ledger = BTreeMap<Address, Account>;

/// Delegations keyed by receiving address, then by delegating address
pub type Delegations = BTreeMap<Address, BTreeMap<Address, Delegation>>;

/// Staking account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Spendable balance
    pub general: GeneralAccount,
    /// Staked balances
    pub escrow: EscrowAccount,
}

/// Spendable part of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralAccount {
    /// Balance in base units
    pub balance: Quantity,
    /// Transaction nonce, always zero at genesis
    #[serde(default)]
    pub nonce: u64,
}

/// Staked part of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowAccount {
    /// Active escrow pool
    pub active: SharePool,
    /// Debonding escrow pool, always empty at genesis
    pub debonding: SharePool,
    /// Commission schedule, present once the account has received a delegation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_schedule: Option<CommissionSchedule>,
}

impl EscrowAccount {
    /// Install a single-step schedule if none is present
    ///
    /// Returns `true` when this call installed it. An existing schedule is
    /// never replaced.
    pub fn ensure_commission_schedule(&mut self, terms: &CommissionTerms) -> bool {
        if self.commission_schedule.is_some() {
            return false;
        }
        self.commission_schedule = Some(CommissionSchedule::single_step(terms));
        true
    }
}

/// Pool of staked tokens and the shares issued against it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePool {
    /// Tokens in the pool
    pub balance: Quantity,
    /// Shares issued
    pub total_shares: Quantity,
}

impl SharePool {
    /// Pool after depositing `amount`, issuing shares 1:1
    ///
    /// Only valid before any slashing or reward has changed the share price,
    /// which always holds at genesis.
    pub fn deposit_one_to_one(&self, amount: &Quantity) -> Result<SharePool> {
        Ok(SharePool {
            balance: self.balance.checked_add(amount)?,
            total_shares: self.total_shares.checked_add(amount)?,
        })
    }
}

/// Commission rate and its bounds, in the network's rate denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionTerms {
    /// Starting rate
    pub rate: Quantity,
    /// Lower bound
    pub rate_min: Quantity,
    /// Upper bound
    pub rate_max: Quantity,
}

/// Commission schedule of an account receiving delegations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSchedule {
    /// Rate steps
    pub rates: Vec<CommissionRateStep>,
    /// Bound steps
    pub bounds: Vec<CommissionRateBoundStep>,
}

impl CommissionSchedule {
    /// Schedule with one rate step and one bound step, both starting at 0
    pub fn single_step(terms: &CommissionTerms) -> Self {
        Self {
            rates: vec![CommissionRateStep {
                start: 0,
                rate: terms.rate,
            }],
            bounds: vec![CommissionRateBoundStep {
                start: 0,
                rate_min: terms.rate_min,
                rate_max: terms.rate_max,
            }],
        }
    }
}

/// Commission rate effective from an epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRateStep {
    /// First epoch
    pub start: u64,
    /// Rate
    pub rate: Quantity,
}

/// Commission bounds effective from an epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRateBoundStep {
    /// First epoch
    pub start: u64,
    /// Lowest permitted rate
    pub rate_min: Quantity,
    /// Highest permitted rate
    pub rate_max: Quantity,
}

/// Shares held by one account in another account's active pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Shares
    pub shares: Quantity,
}

/// Finished accounting state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Accounts
    pub ledger: Ledger,
    /// Delegations (to → from)
    pub delegations: Delegations,
    /// Total supply in base units
    pub total_supply: Quantity,
    /// Unallocated remainder in base units
    pub common_pool: Quantity,
}

impl LedgerSnapshot {
    /// Sum of general, active and debonding balances over all accounts
    pub fn allocated(&self) -> Result<Quantity> {
        self.ledger.values().try_fold(Quantity::zero(), |acc, account| {
            acc.checked_add(&account.general.balance)?
                .checked_add(&account.escrow.active.balance)?
                .checked_add(&account.escrow.debonding.balance)
        })
    }
}

/// Staking genesis document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingGenesis {
    /// Consensus parameters, attached verbatim
    pub params: serde_json::Value,
    /// Token ticker
    pub token_symbol: String,
    /// Base-10 exponent of the token's base unit
    pub token_value_exponent: u8,
    /// Total supply in base units
    pub total_supply: Quantity,
    /// Unallocated remainder in base units
    pub common_pool: Quantity,
    /// Accounts
    pub ledger: Ledger,
    /// Delegations (to → from)
    pub delegations: Delegations,
}
