//! sales-rollup: maintenance entry point for the derived sales tables.
//!
//! ## Commands
//! - `recompute`: rebuild `menu_summary` and `monthly_summary` from facts
//! - `catch-up`: refresh keys recorded in the change log since the last run
//! - `verify`: report derived rows that disagree with the facts
//!
//! Results are printed as JSON on stdout; logs go to stderr.
//!
//! ## Configuration
//! - `--config PATH` or SALES_ROLLUP_CONFIG: YAML config file
//! - SALES_ROLLUP__*: per-field overrides (e.g. SALES_ROLLUP__STORAGE__SQLITE__PATH)
//! - SALES_ROLLUP_LOG: log filter (default: info)

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use sales_rollup::config::Config;
use sales_rollup::rollup::{RollupEngine, RollupError};
use sales_rollup::storage::init_storage;
use sales_rollup::utils::bootstrap::init_tracing;

#[derive(Parser)]
#[command(name = "sales-rollup")]
#[command(about = "Maintain menu and monthly sales rollups")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild every derived row from the fact tables.
    Recompute,
    /// Refresh keys changed since the last checkpoint.
    CatchUp,
    /// Compare derived rows with the facts without writing.
    Verify,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "sales-rollup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load(cli.config.as_deref())?;
    let storage = init_storage(&config.storage).await?;
    let engine = RollupEngine::from_storage(&storage, config.rollup);

    match cli.command {
        Command::Recompute => report(engine.recompute_all().await),
        Command::CatchUp => report(engine.catch_up().await),
        Command::Verify => {
            let drift = engine.verify().await?;
            println!("{}", serde_json::to_string_pretty(&drift)?);
            if drift.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// Print the result, or the partial result and failed keys.
fn report(
    outcome: Result<sales_rollup::rollup::RollupResult, RollupError>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match outcome {
        Ok(result) => {
            info!(rows_changed = result.rows_changed(), "Rollup complete");
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(RollupError::PartialRecomputeFailure { failed, partial }) => {
            let body = serde_json::json!({ "partial": partial, "failed": failed });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}
