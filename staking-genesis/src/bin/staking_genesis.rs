//! Staking genesis CLI
//!
//! Usage:
//! ```bash
//! staking-genesis --config staking_ledger_config.yaml \
//!     --allocations allocations.csv \
//!     --entities-dir entities/ \
//!     --consensus-params consensus_params.json \
//!     --output staking_genesis.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use staking_genesis::{
    AllocationReport, EntitiesDirectory, GenesisAssembler, GenesisConfig, GenesisOptions,
    JsonFileParameters, TracingSink,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Build the staking section of a network genesis document
#[derive(Parser, Debug)]
#[command(name = "staking-genesis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Genesis configuration (YAML, or TOML for *.toml)
    #[arg(long)]
    config: PathBuf,

    /// Allocation report (CSV)
    #[arg(long)]
    allocations: PathBuf,

    /// Directory of entity descriptors; may be repeated
    #[arg(long = "entities-dir", required = true)]
    entities_dirs: Vec<PathBuf>,

    /// Consensus parameters (JSON)
    #[arg(long)]
    consensus_params: PathBuf,

    /// Output file
    #[arg(long)]
    output: PathBuf,

    /// Include test-only entities and delegations
    #[arg(long)]
    test_genesis: bool,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "failed to build staking genesis");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut sink = TracingSink;

    let config = GenesisConfig::from_file(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    let report = AllocationReport::from_path(
        &cli.allocations,
        &config.csv_options,
        &config.accounts,
        &mut sink,
    )
    .with_context(|| format!("reading allocations {}", cli.allocations.display()))?;
    let entities = EntitiesDirectory::load(&cli.entities_dirs).context("loading entities")?;
    tracing::info!(entities = entities.len(), allocations = report.len(), "inputs loaded");

    let options = GenesisOptions {
        is_test_genesis: cli.test_genesis,
    };
    let genesis = GenesisAssembler::new(&config, options).assemble(
        &report,
        &entities,
        &JsonFileParameters(cli.consensus_params.clone()),
        &mut sink,
    )?;

    let json = serde_json::to_vec_pretty(&genesis)?;
    std::fs::write(&cli.output, json)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    tracing::info!(output = %cli.output.display(), "staking genesis written");
    Ok(())
}
