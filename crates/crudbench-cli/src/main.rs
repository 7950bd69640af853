//! Crudbench - command-line benchmark runner.
//!
//! Connects to the configured backend, runs the benchmark, prints a report
//! per stage and appends every result to the CSV ledger.

mod args;
mod summary;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crudbench_core::{ConsoleReporter, CsvLedger, Error, Orchestrator};

use crate::args::Args;

fn main() {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crudbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(Args::parse()) {
        tracing::error!(error = %e, "benchmark failed");
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let config = args.into_config()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.backend,
        mode = ?config.mode,
        data_dir = %config.connection.data_dir.display(),
        results_dir = %config.results_dir.display(),
        "configuration loaded"
    );

    let store = config.backend.connect(&config.connection)?;
    let reports = Orchestrator::new(config.clone(), store.as_ref())?
        .with_sink(ConsoleReporter::stdout(config.output_detail))
        .with_sink(CsvLedger::new(&config.results_dir))
        .run()?;

    println!("{}", summary::render(&config, &reports));
    Ok(())
}
