pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taxagg",
    version,
    about = "Consensus taxonomy for sets of classified sequences",
    long_about = "taxagg assigns one taxon to each set of sequences (for example the genes of a contig) \
                  by weighting every member's own taxonomic assignment and voting along the lineages \
                  of the NCBI taxonomy."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate member taxonomy into one taxon per set
    Aggregate(commands::aggregate::AggregateArgs),

    /// Aggregate member taxonomy using alignment e-values as vote weights
    AggregateWeights(commands::aggregate::AggregateWeightsArgs),
}
