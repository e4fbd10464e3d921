//! Rebalance Engine Binary
//!
//! Runs one rebalance or proposal simulation from a JSON request file and
//! prints the JSON result on stdout.
//!
//! # Usage
//!
//! ```bash
//! rebalance-engine --config config.yaml rebalance request.json
//! rebalance-engine propose proposal.json --pretty
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: `rebalance_engine=<observability.logging.level>`)
//! - Any `${VAR}` referenced from the config file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;

use rebalance_engine::config::{Config, load_config};
use rebalance_engine::telemetry::init_tracing;
use rebalance_engine::{
    EngineError, ProposalRequest, RebalanceEngine, RebalanceRequest, RunRebalanceUseCase,
    SimulateProposalUseCase,
};

#[derive(Parser)]
#[command(name = "rebalance-engine")]
#[command(about = "Deterministic rebalance and advisory decision engine", long_about = None)]
struct Cli {
    /// YAML config file. Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON result.
    #[arg(long, global = true, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a model-driven rebalance
    Rebalance {
        /// Path to the rebalance request JSON
        request: PathBuf,
    },

    /// Simulate proposed cash flows and trades
    Propose {
        /// Path to the proposal request JSON
        request: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Configuration
    let config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy().into_owned();
            load_config(Some(path.as_str())).with_context(|| format!("loading config {path}"))?
        }
        None => Config::default(),
    };

    // 2. Tracing (stderr)
    init_tracing(&config.observability.logging);

    // 3. Composition root
    let engine = Arc::new(RebalanceEngine::new(
        config.policy.to_policy(),
        config.solver.to_settings(),
    ));

    // 4. Execute
    let outcome = match &cli.cmd {
        Commands::Rebalance { request } => {
            let request: RebalanceRequest = read_request(request)?;
            RunRebalanceUseCase::new(engine, config.options.clone(), config.idempotency.capacity)
                .execute(&request)
        }
        Commands::Propose { request } => {
            let request: ProposalRequest = read_request(request)?;
            SimulateProposalUseCase::new(
                engine,
                config.options.clone(),
                config.idempotency.capacity,
            )
            .execute(&request)
        }
    };

    // 5. Output
    match outcome {
        Ok(result) => print_json(&result, cli.pretty),
        Err(err) => {
            print_json(&err.to_response(), cli.pretty)?;
            Err(rejected(err))
        }
    }
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading request {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing request {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let body = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{body}");
    Ok(())
}

fn rejected(err: EngineError) -> anyhow::Error {
    anyhow::Error::new(err).context("request rejected")
}
