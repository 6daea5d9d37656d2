//! Tab-separated result records, one line per set
use std::fmt::Write;

use crate::bio::taxonomy::{TaxonomyAccessor, NO_RANK};
use crate::core::config::LineageMode;
use crate::core::consensus::ConsensusResult;
use crate::{Result, TaxaggError};

/// Round a share to two decimals, e.g. `0.6667` to `0.67`
pub fn round_percent(percent: f64) -> f64 {
    (percent * 100.0).round() / 100.0
}

/// Append the record for `result` to `out`.
///
/// Columns: taxon, rank, name, total, assigned, agreeing, percent, then the
/// requested ranks joined by `;` and the lineage when those are enabled.
/// Unclassified sets keep the same column layout with empty extra columns.
pub fn format_record<T: TaxonomyAccessor + ?Sized>(
    out: &mut String,
    result: &ConsensusResult,
    taxonomy: &T,
    ranks: &[String],
    lineage: LineageMode,
) -> Result<()> {
    let node = if result.is_classified() {
        Some(
            taxonomy
                .node(result.selected_taxon)
                .ok_or(TaxaggError::UnknownTaxon(result.selected_taxon))?,
        )
    } else {
        None
    };

    let (taxon, rank, name) = match node {
        Some(node) => (node.id, node.rank.as_str(), node.name.as_str()),
        None => (0, NO_RANK, "unclassified"),
    };

    write!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        taxon,
        rank,
        name,
        result.total_members,
        result.assigned_members,
        result.agreeing_members,
        round_percent(result.selected_percent)
    )?;

    if !ranks.is_empty() {
        out.push('\t');
        if let Some(node) = node {
            out.push_str(&taxonomy.at_ranks(node, ranks).join(";"));
        }
    }

    if lineage.is_enabled() {
        out.push('\t');
        if let Some(node) = node {
            out.push_str(&taxonomy.lineage(node, lineage == LineageMode::Full));
        }
    }

    out.push('\n');
    Ok(())
}
