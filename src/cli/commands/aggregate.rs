use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::{Path, PathBuf};

use crate::bio::taxonomy::ncbi;
use crate::core::aggregator::{AggregationSummary, Aggregator};
use crate::core::config::{load_config, AggregationConfig, LineageMode, VoteMode};
use crate::storage::{DbReader, DbWriter, RecordSource};
use crate::utils::parallel::{configure_thread_pool, resolve_threads};

/// Options shared by both aggregation commands
#[derive(Args, Debug, Clone, Default)]
pub struct AggregateOptions {
    /// TOML configuration file; command-line options override it
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Vote weighting: uniform (0) or evalue (1, -ln(evalue))
    #[arg(long, value_name = "MODE")]
    pub vote_mode: Option<VoteMode>,

    /// Fraction of the assigned weight a taxon needs to be selected
    #[arg(long, value_name = "FRACTION")]
    pub majority: Option<f64>,

    /// Ranks to report for the selected taxon, e.g. "superkingdom,phylum,genus"
    #[arg(long, value_name = "RANKS")]
    pub lca_ranks: Option<String>,

    /// Append the lineage: off (0), full (1, names) or ids (2)
    #[arg(long, value_name = "MODE")]
    pub tax_lineage: Option<LineageMode>,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl AggregateOptions {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn resolve(&self, threads: usize) -> Result<AggregationConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AggregationConfig::default(),
        };

        if let Some(mode) = self.vote_mode {
            config.vote_mode = mode;
        }
        if let Some(majority) = self.majority {
            config.majority = majority;
        }
        if let Some(ranks) = &self.lca_ranks {
            config.lca_ranks = ranks.clone();
        }
        if let Some(lineage) = self.tax_lineage {
            config.tax_lineage = lineage;
        }
        if self.no_progress {
            config.progress = false;
        }
        if threads > 0 {
            config.threads = threads;
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Directory holding NCBI names.dmp and nodes.dmp
    #[arg(value_name = "TAXONOMY")]
    pub taxonomy: PathBuf,

    /// Set-to-member database
    #[arg(value_name = "SETS")]
    pub sets: PathBuf,

    /// Member-to-taxon database
    #[arg(value_name = "TAXA")]
    pub taxa: PathBuf,

    /// Output database
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: AggregateOptions,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,
}

#[derive(Args, Debug)]
pub struct AggregateWeightsArgs {
    /// Directory holding NCBI names.dmp and nodes.dmp
    #[arg(value_name = "TAXONOMY")]
    pub taxonomy: PathBuf,

    /// Set-to-member database
    #[arg(value_name = "SETS")]
    pub sets: PathBuf,

    /// Member-to-taxon database
    #[arg(value_name = "TAXA")]
    pub taxa: PathBuf,

    /// Member-to-alignment database (best hit first)
    #[arg(value_name = "ALIGNMENTS")]
    pub alignments: PathBuf,

    /// Output database
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: AggregateOptions,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,
}

fn init_thread_pool(config: &AggregationConfig) -> Result<()> {
    configure_thread_pool(config.threads)
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;
    tracing::debug!("Using {} threads", resolve_threads(config.threads));
    Ok(())
}

pub fn run(args: AggregateArgs) -> Result<()> {
    let config = args.options.resolve(args.threads)?;
    init_thread_pool(&config)?;
    execute(&args.taxonomy, &args.sets, &args.taxa, None, &args.output, &config)?;
    Ok(())
}

pub fn run_weights(args: AggregateWeightsArgs) -> Result<()> {
    let config = args.options.resolve(args.threads)?;
    init_thread_pool(&config)?;
    execute(
        &args.taxonomy,
        &args.sets,
        &args.taxa,
        Some(&args.alignments),
        &args.output,
        &config,
    )?;
    Ok(())
}

/// Open the inputs, run the aggregation and persist the output database
pub fn execute(
    taxonomy_dir: &Path,
    sets_path: &Path,
    taxa_path: &Path,
    alignments_path: Option<&Path>,
    output: &Path,
    config: &AggregationConfig,
) -> Result<AggregationSummary> {
    config.validate(alignments_path.is_some())?;

    let taxonomy = ncbi::load_taxonomy_dir(taxonomy_dir)
        .with_context(|| format!("Failed to load taxonomy from {}", taxonomy_dir.display()))?;
    let sets = DbReader::open(sets_path)?;
    let taxa = DbReader::open(taxa_path)?;
    let alignments = alignments_path.map(DbReader::open).transpose()?;

    tracing::debug!(
        "taxonomy nodes: {}, sets: {}, members: {}",
        taxonomy.taxa_count(),
        sets.len(),
        taxa.len()
    );

    let writer = DbWriter::create(output);
    let summary = Aggregator::new(&taxonomy, config).run(
        &sets,
        &taxa,
        alignments.as_ref().map(|a| a as &dyn RecordSource),
        &writer,
    )?;
    writer.close()?;

    if config.progress {
        eprintln!(
            "{} Classified {} of {} sets -> {}",
            "✓".green().bold(),
            summary.classified_sets,
            summary.sets,
            output.display()
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxagg.toml");
        std::fs::write(&path, "majority = 0.9\ntax_lineage = \"ids\"\nlca_ranks = \"genus\"\n").unwrap();

        let options = AggregateOptions {
            config: Some(path),
            majority: Some(0.6),
            no_progress: true,
            ..Default::default()
        };
        let config = options.resolve(8).unwrap();
        assert_eq!(config.majority, 0.6);
        assert_eq!(config.tax_lineage, LineageMode::Ids);
        assert_eq!(config.lca_ranks, "genus");
        assert_eq!(config.threads, 8);
        assert!(!config.progress);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let options = AggregateOptions {
            config: Some(PathBuf::from("/nonexistent/taxagg.toml")),
            ..Default::default()
        };
        assert!(options.resolve(0).is_err());
    }
}
