//! Declarative genesis configuration
//!
//! Loaded from YAML, or from TOML when the file name ends in `.toml`.
//! Account and entity names are lower-cased on load; two names that only
//! differ by case are rejected.

use crate::{
    address::Address,
    allocation::EntityAllocations,
    quantity::{Precision, Quantity},
    types::CommissionTerms,
    Error, Result,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Seed accounts keyed by lower-cased name
pub type SeedAccounts = BTreeMap<String, SeedAccount>;

/// Genesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Whole tokens an entity keeps spendable before the rest is staked
    pub minimum_balance: Quantity,

    /// Total supply in whole tokens
    pub total_supply: Quantity,

    /// Token ticker
    pub token_symbol: String,

    /// Base-10 exponent of the base unit
    pub token_value_exponent: u8,

    /// Starting commission rate
    pub commission_rate: Quantity,

    /// Lowest permitted commission rate
    pub commission_rate_min: Quantity,

    /// Highest permitted commission rate
    pub commission_rate_max: Quantity,

    /// Pre-funded infrastructure accounts
    #[serde(default, deserialize_with = "deserialize_names")]
    pub accounts: SeedAccounts,

    /// Extra entities used only for test networks
    #[serde(default, deserialize_with = "deserialize_names")]
    pub test_only_entities: EntityAllocations,

    /// Allocation report column labels
    #[serde(default)]
    pub csv_options: CsvOptions,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            minimum_balance: Quantity::zero(),
            total_supply: Quantity::from_u64(10_000_000_000),
            token_symbol: "TEST".to_string(),
            token_value_exponent: 9,
            commission_rate: Quantity::zero(),
            commission_rate_min: Quantity::zero(),
            commission_rate_max: Quantity::zero(),
            accounts: SeedAccounts::new(),
            test_only_entities: EntityAllocations::new(),
            csv_options: CsvOptions::default(),
        }
    }
}

/// Pre-funded account declared in the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    /// Whole tokens
    pub amount: Quantity,

    /// Account address
    pub address: Address,

    /// Report column holding delegations from this account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_label: Option<String>,

    /// Delegations from this account applied only to test networks
    #[serde(default, deserialize_with = "deserialize_names")]
    pub test_only_outbound_delegations: BTreeMap<String, Quantity>,
}

/// Allocation report column labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Compliance flag; entities without it get no direct funding
    pub kyc_label: String,

    /// Eligibility flag; rows without it are dropped
    pub entity_package_submitted_label: String,

    /// Entity name
    pub entity_package_name_label: String,

    /// Funding amount in whole tokens
    pub funding_label: String,

    /// Cell text that counts as a set flag
    #[serde(default = "default_true_marker")]
    pub true_marker: String,
}

fn default_true_marker() -> String {
    "TRUE".to_string()
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            kyc_label: "KYC".to_string(),
            entity_package_submitted_label: "Entity Package Submitted".to_string(),
            entity_package_name_label: "Entity Package Name".to_string(),
            funding_label: "Funding".to_string(),
            true_marker: default_true_marker(),
        }
    }
}

impl GenesisConfig {
    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: GenesisConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GenesisConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Base units per whole token
    pub fn precision(&self) -> Result<Precision> {
        Precision::from_exponent(self.token_value_exponent).map_err(|_| {
            Error::Config(format!(
                "token_value_exponent {} is too large",
                self.token_value_exponent
            ))
        })
    }

    /// Commission terms for accounts receiving delegations
    pub fn commission_terms(&self) -> CommissionTerms {
        CommissionTerms {
            rate: self.commission_rate,
            rate_min: self.commission_rate_min,
            rate_max: self.commission_rate_max,
        }
    }

    /// Check constants and labels for consistency
    pub fn validate(&self) -> Result<()> {
        let precision = self.precision()?;
        if self.total_supply.scale_by(&precision).is_err() {
            return Err(Error::Config(format!(
                "total_supply {} overflows at exponent {}",
                self.total_supply, self.token_value_exponent
            )));
        }

        if !(self.commission_rate_min <= self.commission_rate
            && self.commission_rate <= self.commission_rate_max)
        {
            return Err(Error::Config(format!(
                "commission rate {} outside bounds [{}, {}]",
                self.commission_rate, self.commission_rate_min, self.commission_rate_max
            )));
        }

        if self.token_symbol.trim().is_empty() {
            return Err(Error::Config("token_symbol must not be empty".to_string()));
        }

        let mut labels = vec![
            &self.csv_options.kyc_label,
            &self.csv_options.entity_package_submitted_label,
            &self.csv_options.entity_package_name_label,
            &self.csv_options.funding_label,
        ];
        labels.extend(self.accounts.values().filter_map(|a| a.csv_label.as_ref()));
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(Error::Config("CSV column labels must not be empty".to_string()));
            }
            if labels[..i].contains(label) {
                return Err(Error::Config(format!("CSV column label {:?} used twice", label)));
            }
        }

        Ok(())
    }
}

/// Lower-case every key, rejecting keys that collide
pub(crate) fn normalize_names<T>(raw: BTreeMap<String, T>) -> Result<BTreeMap<String, T>> {
    let mut normalized = BTreeMap::new();
    for (name, value) in raw {
        let key = name.to_lowercase();
        if normalized.insert(key.clone(), value).is_some() {
            return Err(Error::DuplicateEntity(key));
        }
    }
    Ok(normalized)
}

pub(crate) fn deserialize_names<'de, D, T>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = BTreeMap::<String, T>::deserialize(deserializer)?;
    normalize_names(raw).map_err(serde::de::Error::custom)
}
