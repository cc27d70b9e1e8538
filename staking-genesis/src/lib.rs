//! Staking Genesis
//!
//! Builds the initial staking ledger of a proof-of-stake network from a
//! declarative configuration, an allocation report and a table of entities.
//!
//! # Architecture
//!
//! - **Config**: constants, seed accounts and report column labels
//! - **Allocations**: per-entity funding and incoming delegations
//! - **Entities**: name → address resolution, from memory or signed descriptors
//! - **Accountant**: the only writer of the ledger under construction
//! - **Assembler**: drives the above into a [`StakingGenesis`] document
//!
//! # Invariants
//!
//! - Token conservation: Σ(account balances) + common pool == total supply
//! - No balance ever goes below zero
//! - One account per address, one delegation per ordered pair
//! - Deterministic output: every map is ordered by address bytes

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod accounting;
pub mod address;
pub mod allocation;
pub mod assembler;
pub mod config;
pub mod crypto;
pub mod diagnostics;
pub mod entities;
pub mod error;
pub mod quantity;
pub mod types;

// Re-exports
pub use accounting::LedgerAccountant;
pub use address::Address;
pub use allocation::{Allocation, AllocationReport, AllocationSource, EntityAllocations};
pub use assembler::{
    ConsensusParametersSource, GenesisAssembler, GenesisOptions, JsonFileParameters,
};
pub use config::{CsvOptions, GenesisConfig, SeedAccount};
pub use diagnostics::{AssemblyEvent, DiagnosticsSink, RecordingSink, TracingSink};
pub use entities::{EntitiesDirectory, EntityDescriptor, EntityResolver, StaticEntities};
pub use error::{Error, Result};
pub use quantity::{Precision, Quantity};
pub use types::StakingGenesis;
