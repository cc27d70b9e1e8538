//! Error types for genesis assembly

use crate::{address::Address, quantity::Quantity};
use thiserror::Error;

/// Result type for genesis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Genesis assembly errors
///
/// Every variant aborts the whole run. Nothing in this crate retries or
/// recovers locally.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing configuration or report columns
    #[error("Schema error: {0}")]
    Schema(String),

    /// Malformed numeric, key or address text
    #[error("Parse error in {field}: {reason} (value: {value:?})")]
    Parse {
        /// Where the value came from
        field: String,
        /// Offending text
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// Malformed numeric cell in the allocation report
    #[error("Parse error at row {row}, column {column:?}: invalid amount {value:?}")]
    ParseCell {
        /// 1-based line number in the report
        row: u64,
        /// Column label
        column: String,
        /// Offending cell text
        value: String,
    },

    /// Account created twice for the same address
    #[error("Duplicate account found for {0}")]
    DuplicateAccount(Address),

    /// Second delegation for the same ordered pair
    #[error("Duplicate delegation from {from} to {to}")]
    DuplicateDelegation {
        /// Delegating account
        from: Address,
        /// Receiving account
        to: Address,
    },

    /// Entity or account name defined more than once
    #[error("Duplicate definitions of entity or account named {0:?}")]
    DuplicateEntity(String),

    /// Delegation references an address without an account
    #[error("Cannot delegate: account {0} does not exist")]
    UnknownAccount(Address),

    /// Name that resolves to no entity or seed account
    #[error("Unknown entity or account name {0:?}")]
    UnknownEntity(String),

    /// Delegation larger than the source's general balance
    #[error("Insufficient balance in {address}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// Delegating account
        address: Address,
        /// General balance at the time of the request
        balance: Quantity,
        /// Requested amount in base units
        requested: Quantity,
    },

    /// Subtraction below zero
    #[error("Quantity underflow: {lhs} - {rhs}")]
    Underflow {
        /// Minuend
        lhs: Quantity,
        /// Subtrahend
        rhs: Quantity,
    },

    /// Result exceeds the representable range
    #[error("Quantity overflow")]
    Overflow,

    /// Allocated tokens exceed the total supply
    #[error("Insufficient supply: total supply {total_supply}, allocated {allocated}")]
    InsufficientSupply {
        /// Total supply in base units
        total_supply: Quantity,
        /// Sum of all account balances in base units
        allocated: Quantity,
    },

    /// Ledger bookkeeping disagrees with itself
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Entity descriptor missing, malformed or badly signed
    #[error("Invalid entity {name:?}: {reason}")]
    InvalidEntity {
        /// Entity name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Error::Parse {
            field: field.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
