//! Genesis bookkeeping
//!
//! [`LedgerAccountant`] owns the ledger while it is being built. It is the
//! only place where whole-token amounts are scaled into base units, and it
//! enforces the ledger invariants on every call:
//!
//! - One account per address
//! - One delegation per ordered `(from, to)` pair
//! - No balance ever goes below zero
//! - Σ(account balances) + common pool == total supply
//!
//! # Example
//!
//! ```
//! use staking_genesis::{
//!     accounting::LedgerAccountant, crypto::KeyPair, quantity::Precision,
//!     types::CommissionTerms, Address, Quantity,
//! };
//!
//! # fn main() -> staking_genesis::Result<()> {
//! let terms = CommissionTerms {
//!     rate: Quantity::from_u64(5_000),
//!     rate_min: Quantity::zero(),
//!     rate_max: Quantity::from_u64(20_000),
//! };
//! let mut accountant =
//!     LedgerAccountant::new(Precision::from_exponent(9)?, Quantity::from_u64(10), terms);
//!
//! let entity = Address::from_public_key(&KeyPair::from_seed(&[1; 32]).public_key());
//! accountant.add_account(entity, &Quantity::from_u64(3))?;
//! accountant.add_delegation(entity, entity, &Quantity::from_u64(2))?;
//!
//! let snapshot = accountant.snapshot()?;
//! assert_eq!(snapshot.common_pool, Quantity::from_u64(7_000_000_000));
//! # Ok(())
//! # }
//! ```

use crate::{
    address::Address,
    quantity::{Precision, Quantity},
    types::{Account, CommissionTerms, Delegation, Delegations, Ledger, LedgerSnapshot},
    Error, Result,
};

/// Mutable ledger under construction
#[derive(Debug, Clone)]
pub struct LedgerAccountant {
    /// Base units per whole token
    precision: Precision,

    /// Total supply in whole tokens
    total_supply: Quantity,

    /// Schedule terms installed on first incoming delegation
    commission: CommissionTerms,

    ledger: Ledger,
    delegations: Delegations,

    /// Running sum of every balance handed out, in base units
    total_allocated: Quantity,
}

impl LedgerAccountant {
    /// Create an empty ledger
    pub fn new(precision: Precision, total_supply: Quantity, commission: CommissionTerms) -> Self {
        Self {
            precision,
            total_supply,
            commission,
            ledger: Ledger::new(),
            delegations: Delegations::new(),
            total_allocated: Quantity::zero(),
        }
    }

    /// Precision used for scaling
    pub fn precision(&self) -> &Precision {
        &self.precision
    }

    /// Create an account funded with `tokens` whole tokens
    pub fn add_account(&mut self, address: Address, tokens: &Quantity) -> Result<()> {
        if self.ledger.contains_key(&address) {
            return Err(Error::DuplicateAccount(address));
        }

        let balance = tokens.scale_by(&self.precision)?;
        let total_allocated = self.total_allocated.checked_add(&balance)?;

        let mut account = Account::default();
        account.general.balance = balance;

        self.ledger.insert(address, account);
        self.total_allocated = total_allocated;
        Ok(())
    }

    /// Move `tokens` whole tokens from `from`'s general balance into `to`'s
    /// active escrow pool
    ///
    /// Every check and every sum is computed before the first write, so an
    /// error leaves the ledger exactly as it was.
    pub fn add_delegation(&mut self, from: Address, to: Address, tokens: &Quantity) -> Result<()> {
        let amount = tokens.scale_by(&self.precision)?;

        let from_account = self.ledger.get(&from).ok_or(Error::UnknownAccount(from))?;
        let to_account = self.ledger.get(&to).ok_or(Error::UnknownAccount(to))?;

        if self
            .delegations
            .get(&to)
            .is_some_and(|incoming| incoming.contains_key(&from))
        {
            return Err(Error::DuplicateDelegation { from, to });
        }

        let from_balance = from_account
            .general
            .balance
            .checked_sub(&amount)
            .map_err(|_| Error::InsufficientBalance {
                address: from,
                balance: from_account.general.balance,
                requested: amount,
            })?;
        let to_active = to_account.escrow.active.deposit_one_to_one(&amount)?;

        // Commit. `from` and `to` may be the same account.
        if let Some(account) = self.ledger.get_mut(&from) {
            account.general.balance = from_balance;
        }
        if let Some(account) = self.ledger.get_mut(&to) {
            account.escrow.active = to_active;
            account.escrow.ensure_commission_schedule(&self.commission);
        }
        self.delegations
            .entry(to)
            .or_default()
            .insert(from, Delegation { shares: amount });

        Ok(())
    }

    /// Account at `address`, if created
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.ledger.get(address)
    }

    /// Delegation from `from` to `to`, if created
    pub fn delegation(&self, from: &Address, to: &Address) -> Option<&Delegation> {
        self.delegations.get(to).and_then(|incoming| incoming.get(from))
    }

    /// Finish the ledger and compute the common pool
    ///
    /// Fails if the accounts' balances disagree with the running total, or if
    /// more tokens were allocated than the total supply holds.
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let total_supply = self.total_supply.scale_by(&self.precision)?;

        let mut snapshot = LedgerSnapshot {
            ledger: self.ledger.clone(),
            delegations: self.delegations.clone(),
            total_supply,
            common_pool: Quantity::zero(),
        };

        let allocated = snapshot.allocated()?;
        if allocated != self.total_allocated {
            return Err(Error::InvariantViolation(format!(
                "account balances sum to {} but {} were allocated",
                allocated, self.total_allocated
            )));
        }

        snapshot.common_pool = total_supply
            .checked_sub(&allocated)
            .map_err(|_| Error::InsufficientSupply {
                total_supply,
                allocated,
            })?;

        Ok(snapshot)
    }
}
