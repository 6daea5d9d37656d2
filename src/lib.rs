pub mod bio;
pub mod cli;
pub mod core;
pub mod report;
pub mod storage;
pub mod utils;

pub use crate::bio::taxonomy::{TaxonId, TaxonomyAccessor, TaxonomyDB, TaxonomyNode};
pub use crate::core::{
    aggregator::{AggregationSummary, Aggregator},
    config::{AggregationConfig, LineageMode, VoteMode},
    consensus::{select_taxon_for_set, ConsensusResult},
    weights::TaxHit,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxaggError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Format error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("taxon {0} does not match a legal taxonomy node")]
    UnknownTaxon(TaxonId),

    #[error("vote mode is evalue-based but taxon {0} has no alignment info")]
    MissingAlignment(TaxonId),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TaxaggError>;
