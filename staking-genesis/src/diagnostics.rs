//! Diagnostics emitted while assembling a genesis
//!
//! Parsing and assembly never log directly. They report [`AssemblyEvent`]s
//! to a [`DiagnosticsSink`] handed to them by the caller. [`TracingSink`]
//! forwards events to `tracing`; [`RecordingSink`] keeps them for
//! inspection.

use crate::{address::Address, quantity::Quantity};
use tracing::{debug, info, warn};

/// Why a report row was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Eligibility flag not set
    NotEligible,
    /// Entity name cell empty
    BlankEntityName,
}

/// Something worth knowing about a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyEvent {
    /// Report row dropped
    RowSkipped {
        /// 1-based line number in the report
        row: u64,
        /// Why
        reason: SkipReason,
    },
    /// Seed account created
    SeedAccountAdded {
        /// Configured name
        name: String,
        /// Address
        address: Address,
        /// Whole tokens
        amount: Quantity,
    },
    /// Entity name resolved
    EntityMapped {
        /// Lower-cased name
        name: String,
        /// Address
        address: Address,
    },
    /// Entity account created
    EntityFunded {
        /// Lower-cased name
        name: String,
        /// Whole tokens
        funds: Quantity,
    },
    /// Funding did not exceed the minimum balance, nothing staked
    SelfEscrowSkipped {
        /// Lower-cased name
        name: String,
        /// Whole tokens
        funds: Quantity,
    },
    /// Delegation recorded
    DelegationAdded {
        /// Source name
        from: String,
        /// Destination name
        to: String,
        /// Whole tokens
        amount: Quantity,
    },
    /// Zero-amount delegation entry ignored
    ZeroDelegationSkipped {
        /// Source name
        from: String,
        /// Destination name
        to: String,
    },
    /// Ledger finalized
    Finalized {
        /// Number of accounts
        accounts: usize,
        /// Number of delegation edges
        delegations: usize,
        /// Common pool in base units
        common_pool: Quantity,
    },
}

/// Receiver of [`AssemblyEvent`]s
pub trait DiagnosticsSink {
    /// Handle one event
    fn record(&mut self, event: AssemblyEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&mut self, event: AssemblyEvent) {
        match event {
            AssemblyEvent::RowSkipped { row, reason: SkipReason::BlankEntityName } => {
                warn!(row, "skipping row due to blank entity name");
            }
            AssemblyEvent::RowSkipped { row, reason: SkipReason::NotEligible } => {
                debug!(row, "skipping row without a submitted entity package");
            }
            AssemblyEvent::SeedAccountAdded { name, address, amount } => {
                info!(account = %name, %address, %amount, "adding seed account");
            }
            AssemblyEvent::EntityMapped { name, address } => {
                info!(entity_name = %name, %address, "adding entity name and address mapping");
            }
            AssemblyEvent::EntityFunded { name, funds } => {
                debug!(entity_name = %name, %funds, "funding entity");
            }
            AssemblyEvent::SelfEscrowSkipped { name, funds } => {
                debug!(
                    entity_name = %name,
                    %funds,
                    "funds do not exceed minimum balance, not staking"
                );
            }
            AssemblyEvent::DelegationAdded { from, to, amount } => {
                debug!(%from, %to, %amount, "delegating");
            }
            AssemblyEvent::ZeroDelegationSkipped { from, to } => {
                debug!(%from, %to, "skipping zero delegation");
            }
            AssemblyEvent::Finalized { accounts, delegations, common_pool } => {
                info!(accounts, delegations, %common_pool, "staking ledger finalized");
            }
        }
    }
}

/// Keeps every event in order
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// Recorded events
    pub events: Vec<AssemblyEvent>,
}

impl RecordingSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn record(&mut self, event: AssemblyEvent) {
        self.events.push(event);
    }
}
