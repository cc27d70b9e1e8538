//! Entity allocations
//!
//! An allocation is an entity's direct funding plus the delegations it
//! receives from named accounts. Allocations come either from the
//! eligibility report (CSV) or, for test networks, straight from the
//! configuration.
//!
//! # Report format
//!
//! The first row holds column labels; which column means what is decided by
//! [`CsvOptions`]. Each seed account with a `csv_label` owns one column of
//! delegation amounts. Numeric cells may use `,` digit-group separators; a
//! blank numeric cell is zero.

use crate::{
    config::{deserialize_names, normalize_names, CsvOptions, SeedAccounts},
    diagnostics::{AssemblyEvent, DiagnosticsSink, SkipReason},
    quantity::Quantity,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Allocations keyed by lower-cased entity name
pub type EntityAllocations = BTreeMap<String, Allocation>;

/// One entity's funding and incoming delegations, in whole tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Direct funding
    #[serde(default)]
    pub funds: Quantity,

    /// Incoming delegations keyed by lower-cased source name
    #[serde(default, deserialize_with = "deserialize_names")]
    pub delegations: BTreeMap<String, Quantity>,
}

/// Anything that can hand over a table of allocations
pub trait AllocationSource {
    /// All allocations, keyed by lower-cased entity name
    fn allocations(&self) -> &EntityAllocations;
}

impl AllocationSource for EntityAllocations {
    fn allocations(&self) -> &EntityAllocations {
        self
    }
}

/// Allocations decoded from the eligibility report
#[derive(Debug, Clone, Default)]
pub struct AllocationReport {
    allocations: EntityAllocations,
}

impl AllocationSource for AllocationReport {
    fn allocations(&self) -> &EntityAllocations {
        &self.allocations
    }
}

/// Resolved column positions
#[derive(Debug)]
struct ColumnIndices {
    kyc: usize,
    submitted: usize,
    name: usize,
    funding: usize,
    /// (seed account name, column label, column)
    delegations: Vec<(String, String, usize)>,
}

impl ColumnIndices {
    fn resolve(
        headers: &csv::StringRecord,
        options: &CsvOptions,
        accounts: &SeedAccounts,
    ) -> Result<Self> {
        let find = |label: &str| -> Result<usize> {
            headers.iter().position(|h| h == label).ok_or_else(|| {
                Error::Schema(format!("allocation report is missing column {:?}", label))
            })
        };

        let mut delegations = Vec::new();
        for (name, account) in accounts {
            if let Some(label) = &account.csv_label {
                delegations.push((name.clone(), label.clone(), find(label.as_str())?));
            }
        }

        Ok(Self {
            kyc: find(options.kyc_label.as_str())?,
            submitted: find(options.entity_package_submitted_label.as_str())?,
            name: find(options.entity_package_name_label.as_str())?,
            funding: find(options.funding_label.as_str())?,
            delegations,
        })
    }
}

impl AllocationReport {
    /// Load a report file
    pub fn from_path(
        path: impl AsRef<Path>,
        options: &CsvOptions,
        accounts: &SeedAccounts,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, options, accounts, sink)
    }

    /// Decode a report
    ///
    /// Column resolution happens before any row is read, so a missing column
    /// is reported even for an empty report.
    pub fn from_reader<R: Read>(
        reader: R,
        options: &CsvOptions,
        accounts: &SeedAccounts,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = ColumnIndices::resolve(reader.headers()?, options, accounts)?;
        let mut allocations = EntityAllocations::new();

        for record in reader.records() {
            let record = record?;
            let row = record.position().map(|p| p.line()).unwrap_or_default();
            // Flags and names are compared as written; only amounts are trimmed
            let cell = |index: usize| record.get(index).unwrap_or("");

            if cell(columns.submitted) != options.true_marker {
                sink.record(AssemblyEvent::RowSkipped {
                    row,
                    reason: SkipReason::NotEligible,
                });
                continue;
            }

            let name = cell(columns.name).to_lowercase();
            if name.is_empty() {
                sink.record(AssemblyEvent::RowSkipped {
                    row,
                    reason: SkipReason::BlankEntityName,
                });
                continue;
            }

            // Entities without KYC cannot receive funds
            let funds = if cell(columns.kyc) == options.true_marker {
                parse_amount(cell(columns.funding), row, &options.funding_label)?
            } else {
                Quantity::zero()
            };

            let mut delegations = BTreeMap::new();
            for (account, label, index) in &columns.delegations {
                let amount = parse_amount(cell(*index), row, label)?;
                delegations.insert(account.clone(), amount);
            }

            if allocations
                .insert(name.clone(), Allocation { funds, delegations })
                .is_some()
            {
                return Err(Error::DuplicateEntity(name));
            }
        }

        Ok(Self { allocations })
    }

    /// Allocations from in-memory data, lower-casing names
    pub fn from_allocations(allocations: EntityAllocations) -> Result<Self> {
        let mut normalized = normalize_names(allocations)?;
        for allocation in normalized.values_mut() {
            allocation.delegations = normalize_names(std::mem::take(&mut allocation.delegations))?;
        }
        Ok(Self {
            allocations: normalized,
        })
    }

    /// Number of eligible entities
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// No eligible entities
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

fn parse_amount(cell: &str, row: u64, column: &str) -> Result<Quantity> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(Quantity::zero());
    }
    Quantity::from_human_readable(cell).map_err(|_| Error::ParseCell {
        row,
        column: column.to_string(),
        value: cell.to_string(),
    })
}
