use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use borrowflow_math::parse_units;
use borrowflow_types::NATIVE_DECIMALS;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use borrowflow_runner::{create_example_config, BorrowflowConfig, PositionWorkflow, SimulatedLedger};

#[derive(Parser, Debug)]
#[command(name = "borrowflow")]
#[command(about = "Wrap native currency, deposit it as collateral, borrow against it and repay")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "borrowflow.toml")]
    config: String,

    /// Native amount to wrap, in whole units (e.g. 0.1)
    #[arg(short, long)]
    amount: Option<String>,

    /// Stop after borrowing instead of repaying
    #[arg(long)]
    no_repay: bool,

    /// Run against the in-memory ledger seeded from the config
    #[arg(long)]
    simulate: bool,

    /// Write an example configuration to the config path and exit
    #[arg(long)]
    init_config: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    if args.init_config {
        create_example_config(&args.config)
            .with_context(|| format!("Failed to write example config to {}", args.config))?;
        info!("Wrote example configuration to {}", args.config);
        return Ok(());
    }

    // Load configuration
    let mut config = if Path::new(&args.config).exists() {
        BorrowflowConfig::load(&args.config)?
    } else {
        warn!("Config file {} not found, using defaults", args.config);
        BorrowflowConfig::default()
    };

    if let Some(amount) = &args.amount {
        let amount = parse_units(amount, NATIVE_DECIMALS)
            .with_context(|| format!("Invalid wrap amount {}", amount))?;
        config.wrap_amount = amount.value().to_string();
    }
    if args.no_repay {
        config.repay = false;
    }

    let workflow_config = config.workflow_config()?;
    workflow_config.validate()?;

    let network = config.network()?;
    info!("Starting borrowflow on {} (chain {})", network.name, config.chain_id);

    if !args.simulate {
        bail!("no ledger transport is configured; rerun with --simulate to use the in-memory ledger");
    }
    warn!("Running against the simulated ledger, no real transactions are sent");

    let ledger = SimulatedLedger::seeded(&workflow_config, &config.simulation)?;
    let mut workflow = PositionWorkflow::new(Arc::new(ledger), workflow_config);

    let report = match workflow.run().await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    info!("Workflow finished in state {}", report.final_state);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("borrowflow_runner={},borrowflow={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
