//! Consensus taxon selection for a set of weighted member hits
//!
//! Every assigned hit adds its weight to its own taxon and to each ancestor
//! up to and including the root. The consensus is the most specific taxon
//! with a standard rank whose share of the total assigned weight reaches the
//! majority cutoff.

use std::collections::HashMap;

use crate::bio::taxonomy::{TaxonId, TaxonomyAccessor, TaxonomyNode};
use crate::core::weights::TaxHit;
use crate::{Result, TaxaggError};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConsensusResult {
    /// Selected taxon, 0 when no taxon reached the cutoff
    pub selected_taxon: TaxonId,
    pub total_members: usize,
    pub assigned_members: usize,
    /// Assigned members whose lineage contains the selected taxon
    pub agreeing_members: usize,
    /// Share of the assigned weight supporting the selected taxon
    pub selected_percent: f64,
}

impl ConsensusResult {
    pub fn unassigned_members(&self) -> usize {
        self.total_members - self.assigned_members
    }

    pub fn is_classified(&self) -> bool {
        self.selected_taxon != 0
    }
}

fn lookup<T: TaxonomyAccessor + ?Sized>(taxonomy: &T, taxon: TaxonId) -> Result<&TaxonomyNode> {
    taxonomy.node(taxon).ok_or(TaxaggError::UnknownTaxon(taxon))
}

/// Sum hit weights over every node on each hit's lineage, root included.
///
/// Returns the per-node totals and the summed weight of all assigned hits.
pub fn accumulate_weights<T: TaxonomyAccessor + ?Sized>(
    hits: &[TaxHit],
    taxonomy: &T,
) -> Result<(HashMap<TaxonId, f64>, f64)> {
    let mut totals: HashMap<TaxonId, f64> = HashMap::new();
    let mut denominator = 0.0;

    for hit in hits.iter().filter(|h| h.is_assigned()) {
        let mut node = lookup(taxonomy, hit.taxon)?;
        denominator += hit.weight;

        loop {
            *totals.entry(node.id).or_insert(0.0) += hit.weight;
            if node.is_root() {
                break;
            }
            node = lookup(taxonomy, node.parent_id)?;
        }
    }

    Ok((totals, denominator))
}

/// Select the consensus taxon for one set.
///
/// Among nodes whose accumulated share is at least `majority_cutoff` and
/// whose rank has a rank-index, the smallest rank-index wins, then the larger
/// share. Candidates equal on both keys are resolved by hash map iteration
/// order, which is unspecified.
pub fn select_taxon_for_set<T: TaxonomyAccessor + ?Sized>(
    hits: &[TaxHit],
    taxonomy: &T,
    majority_cutoff: f64,
) -> Result<ConsensusResult> {
    let (totals, denominator) = accumulate_weights(hits, taxonomy)?;

    let mut result = ConsensusResult {
        total_members: hits.len(),
        assigned_members: hits.iter().filter(|h| h.is_assigned()).count(),
        ..Default::default()
    };

    if denominator <= 0.0 {
        return Ok(result);
    }

    let mut best: Option<(u32, f64, &TaxonomyNode)> = None;
    for (&taxon, &weight) in &totals {
        let percent = weight / denominator;
        if percent < majority_cutoff {
            continue;
        }
        let node = lookup(taxonomy, taxon)?;
        let Some(rank) = taxonomy.rank_index(&node.rank).filter(|&r| r > 0) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((best_rank, best_percent, _)) => {
                rank < best_rank || (rank == best_rank && percent > best_percent)
            }
        };
        if better {
            best = Some((rank, percent, node));
        }
    }

    let Some((_, percent, selected)) = best else {
        return Ok(result);
    };
    result.selected_taxon = selected.id;
    result.selected_percent = percent;

    if selected.is_root() {
        result.agreeing_members = result.assigned_members;
        return Ok(result);
    }

    for hit in hits.iter().filter(|h| h.is_assigned()) {
        let mut node = lookup(taxonomy, hit.taxon)?;
        while !node.is_root() {
            if node.id == selected.id {
                result.agreeing_members += 1;
                break;
            }
            node = lookup(taxonomy, node.parent_id)?;
        }
    }

    Ok(result)
}
