pub mod aggregator;
pub mod config;
pub mod consensus;
pub mod weights;

pub use aggregator::Aggregator;
pub use config::AggregationConfig;
pub use consensus::{select_taxon_for_set, ConsensusResult};
