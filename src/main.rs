use clap::Parser;
use colored::*;
use std::process;
use taxagg::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Initialize logging with TAXAGG_LOG environment variable support
    let default_level = if cli.verbose > 0 { "debug" } else { "info" };
    let log_level = std::env::var("TAXAGG_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<taxagg::TaxaggError>() {
            Some(taxagg::TaxaggError::Config(_)) => 2,
            Some(taxagg::TaxaggError::Io(_)) => 3,
            Some(taxagg::TaxaggError::Parse(_))
            | Some(taxagg::TaxaggError::UnknownTaxon(_))
            | Some(taxagg::TaxaggError::MissingAlignment(_)) => 4,
            Some(taxagg::TaxaggError::Database(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Aggregate(mut args) => {
            args.threads = cli.threads;
            taxagg::cli::commands::aggregate::run(args)
        }
        Commands::AggregateWeights(mut args) => {
            args.threads = cli.threads;
            taxagg::cli::commands::aggregate::run_weights(args)
        }
    }
}
