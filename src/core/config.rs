use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bio::taxonomy::{parse_ranks, rank_index};
use crate::TaxaggError;

/// How each member's vote is weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VoteMode {
    /// Every assigned member weighs 1.0
    #[default]
    Uniform,
    /// Weight is -ln(evalue) of the member's alignment
    Evalue,
}

impl std::str::FromStr for VoteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "uniform" => Ok(VoteMode::Uniform),
            "1" | "evalue" | "minus-log-evalue" => Ok(VoteMode::Evalue),
            _ => Err(format!("Unknown vote mode: {} (expected uniform or evalue)", s)),
        }
    }
}

/// Lineage column appended to each result record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineageMode {
    #[default]
    Off,
    /// `d_Bacteria;p_Proteobacteria;...`
    Full,
    /// `2;1224;...`
    Ids,
}

impl LineageMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, LineageMode::Off)
    }
}

impl std::str::FromStr for LineageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "off" | "none" => Ok(LineageMode::Off),
            "1" | "full" | "names" => Ok(LineageMode::Full),
            "2" | "ids" | "taxids" => Ok(LineageMode::Ids),
            _ => Err(format!("Unknown lineage mode: {} (expected off, full or ids)", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default)]
    pub vote_mode: VoteMode,
    /// Minimum fraction of the assigned weight a taxon needs to be selected
    #[serde(default = "default_majority")]
    pub majority: f64,
    /// Comma-separated ranks to report for the selected taxon
    #[serde(default)]
    pub lca_ranks: String,
    #[serde(default)]
    pub tax_lineage: LineageMode,
    /// Worker threads (0 = all available)
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_progress")]
    pub progress: bool,
}

fn default_majority() -> f64 {
    0.5
}

fn default_progress() -> bool {
    true
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            vote_mode: VoteMode::default(),
            majority: default_majority(),
            lca_ranks: String::new(),
            tax_lineage: LineageMode::default(),
            threads: 0,
            progress: default_progress(),
        }
    }
}

impl AggregationConfig {
    pub fn ranks(&self) -> Vec<String> {
        parse_ranks(&self.lca_ranks)
    }

    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self, use_alignment: bool) -> Result<(), TaxaggError> {
        if !(self.majority > 0.0 && self.majority <= 1.0) {
            return Err(TaxaggError::Config(format!(
                "majority cutoff must be in (0, 1], got {}",
                self.majority
            )));
        }
        if self.vote_mode == VoteMode::Evalue && !use_alignment {
            return Err(TaxaggError::Config(
                "vote mode is evalue-based but no alignment database was provided; \
                 use aggregate-weights"
                    .to_string(),
            ));
        }
        let ranks = self.ranks();
        if let Some(rank) = ranks.iter().find(|r| rank_index(r).is_none()) {
            return Err(TaxaggError::Config(format!("unknown rank in lca ranks: {}", rank)));
        }
        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AggregationConfig, TaxaggError> {
    let contents = std::fs::read_to_string(path)?;
    let config: AggregationConfig = toml::from_str(&contents)
        .map_err(|e| TaxaggError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}
