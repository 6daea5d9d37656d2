//! Per-set consensus classification over a rayon worker pool
//!
//! Each set key is an independent unit of work: its members are looked up,
//! turned into weighted hits, reduced to a consensus and written to the sink
//! under the set's own key. The first error aborts the whole batch.

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::bio::taxonomy::{TaxonId, TaxonomyAccessor};
use crate::core::config::AggregationConfig;
use crate::core::consensus::{select_taxon_for_set, ConsensusResult};
use crate::core::weights::TaxHit;
use crate::report::format_record;
use crate::storage::{RecordSink, RecordSource};
use crate::utils::parallel::MIN_SETS_PER_TASK;
use crate::utils::progress::create_progress_bar;
use crate::{Result, TaxaggError};

/// Counts reported after a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationSummary {
    pub sets: usize,
    pub members: usize,
    pub classified_sets: usize,
}

fn as_text<'r>(record: &'r [u8], what: &str, key: u32) -> Result<&'r str> {
    std::str::from_utf8(record)
        .map_err(|e| TaxaggError::Parse(format!("{} {} is not valid UTF-8: {}", what, key, e)))
}

pub struct Aggregator<'a, T: TaxonomyAccessor + ?Sized> {
    taxonomy: &'a T,
    config: &'a AggregationConfig,
    ranks: Vec<String>,
}

impl<'a, T: TaxonomyAccessor + ?Sized> Aggregator<'a, T> {
    pub fn new(taxonomy: &'a T, config: &'a AggregationConfig) -> Self {
        Self {
            taxonomy,
            config,
            ranks: config.ranks(),
        }
    }

    /// Classify every set in `sets` and write one record per set to `sink`.
    ///
    /// `alignments` switches on alignment statistics; it is required when
    /// voting by e-value.
    pub fn run(
        &self,
        sets: &dyn RecordSource,
        taxa: &dyn RecordSource,
        alignments: Option<&dyn RecordSource>,
        sink: &dyn RecordSink,
    ) -> Result<AggregationSummary> {
        self.config.validate(alignments.is_some())?;

        let keys = sets.keys();
        tracing::info!(
            "Aggregating {} sets (vote mode {:?}, majority {})",
            keys.len(),
            self.config.vote_mode,
            self.config.majority
        );

        let pb = create_progress_bar(keys.len() as u64, "Aggregating taxonomy", self.config.progress);
        let processed = AtomicUsize::new(0);
        let members = AtomicUsize::new(0);
        let classified = AtomicUsize::new(0);

        let outcome = keys.par_iter().with_min_len(MIN_SETS_PER_TASK).try_for_each_init(
            || (Vec::<TaxHit>::new(), String::with_capacity(4096)),
            |(hits, buffer): &mut (Vec<TaxHit>, String), &key: &u32| -> Result<()> {
                hits.clear();
                buffer.clear();

                let result = self.aggregate_set(key, sets, taxa, alignments, hits)?;
                format_record(buffer, &result, self.taxonomy, &self.ranks, self.config.tax_lineage)?;
                sink.write(key, buffer.as_bytes())?;

                members.fetch_add(result.total_members, Ordering::Relaxed);
                if result.is_classified() {
                    classified.fetch_add(1, Ordering::Relaxed);
                }
                let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 100 == 0 {
                    pb.set_position(count as u64);
                }
                Ok(())
            },
        );

        if let Err(e) = outcome {
            pb.abandon_with_message("Aggregation aborted");
            return Err(e);
        }

        let summary = AggregationSummary {
            sets: processed.into_inner(),
            members: members.into_inner(),
            classified_sets: classified.into_inner(),
        };
        pb.set_position(summary.sets as u64);
        pb.finish_with_message(format!("Aggregated {} sets", summary.sets));

        tracing::info!(
            "Classified {} of {} sets ({} members)",
            summary.classified_sets,
            summary.sets,
            summary.members
        );
        Ok(summary)
    }

    /// Build the hits of one set into `hits` and select its consensus
    pub fn aggregate_set(
        &self,
        set_key: u32,
        sets: &dyn RecordSource,
        taxa: &dyn RecordSource,
        alignments: Option<&dyn RecordSource>,
        hits: &mut Vec<TaxHit>,
    ) -> Result<ConsensusResult> {
        let entry = sets
            .get(set_key)
            .ok_or_else(|| TaxaggError::Database(format!("set {} not found", set_key)))?;

        for line in as_text(entry, "set", set_key)?.lines() {
            let Some(first) = line.split_whitespace().next() else {
                continue;
            };
            let member: u32 = first.parse().map_err(|_| {
                TaxaggError::Parse(format!("set {}: invalid member id '{}'", set_key, first))
            })?;
            hits.push(self.member_hit(member, taxa, alignments)?);
        }

        select_taxon_for_set(hits, self.taxonomy, self.config.majority)
    }

    fn member_hit(
        &self,
        member: u32,
        taxa: &dyn RecordSource,
        alignments: Option<&dyn RecordSource>,
    ) -> Result<TaxHit> {
        let record = taxa.get(member).ok_or_else(|| {
            TaxaggError::Database(format!("no taxonomy assignment for member {}", member))
        })?;
        let field = as_text(record, "taxonomy record", member)?
            .lines()
            .next()
            .and_then(|l| l.split_whitespace().next())
            .ok_or_else(|| {
                TaxaggError::Parse(format!("empty taxonomy record for member {}", member))
            })?;
        let taxon: TaxonId = field.parse().map_err(|_| {
            TaxaggError::Parse(format!("member {}: invalid taxon id '{}'", member, field))
        })?;

        let mut columns = Vec::new();
        if let Some(record) = alignments.and_then(|db| db.get(member)) {
            if let Some(line) = as_text(record, "alignment record", member)?.lines().next() {
                columns.extend(line.split_whitespace());
            }
        }

        TaxHit::from_entry(taxon, alignments.is_some(), &columns, self.config.vote_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::taxonomy::{TaxonomyDB, TaxonomyNode};
    use crate::core::config::VoteMode;
    use crate::storage::{MemoryDb, MemorySink};

    fn tree() -> TaxonomyDB {
        TaxonomyDB::from_nodes(vec![
            TaxonomyNode::new(1, 1, "no rank", "root"),
            TaxonomyNode::new(2, 1, "superkingdom", "Bacteria"),
            TaxonomyNode::new(10, 2, "genus", "G"),
            TaxonomyNode::new(11, 10, "species", "A"),
            TaxonomyNode::new(12, 10, "species", "B"),
        ])
        .unwrap()
    }

    fn quiet() -> AggregationConfig {
        AggregationConfig {
            progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_aggregate_set_collects_members() {
        let db = tree();
        let config = quiet();
        let aggregator = Aggregator::new(&db, &config);

        let sets: MemoryDb = vec![(7, "100\n101\t+\n\n102\n103\n")].into_iter().collect();
        let taxa: MemoryDb = vec![
            (100, "11\tspecies\tA\n"),
            (101, "12\tspecies\tB\n"),
            (102, "10\tgenus\tG\n"),
            (103, "0\tno rank\tunclassified\n"),
        ]
        .into_iter()
        .collect();

        let mut hits = Vec::new();
        let result = aggregator.aggregate_set(7, &sets, &taxa, None, &mut hits).unwrap();
        assert_eq!(hits.len(), 4);
        assert_eq!(result.selected_taxon, 10);
        assert_eq!(result.agreeing_members, 3);
        assert_eq!(result.unassigned_members(), 1);
    }

    #[test]
    fn test_missing_member_is_fatal() {
        let db = tree();
        let config = quiet();
        let aggregator = Aggregator::new(&db, &config);

        let sets: MemoryDb = vec![(1, "5\n")].into_iter().collect();
        let taxa = MemoryDb::new();
        let mut hits = Vec::new();
        let result = aggregator.aggregate_set(1, &sets, &taxa, None, &mut hits);
        assert!(matches!(result, Err(TaxaggError::Database(_))));
    }

    #[test]
    fn test_malformed_member_line_is_fatal() {
        let db = tree();
        let config = quiet();
        let aggregator = Aggregator::new(&db, &config);

        let sets: MemoryDb = vec![(1, "abc\n")].into_iter().collect();
        let taxa = MemoryDb::new();
        let mut hits = Vec::new();
        let result = aggregator.aggregate_set(1, &sets, &taxa, None, &mut hits);
        assert!(matches!(result, Err(TaxaggError::Parse(_))));
    }

    #[test]
    fn test_evalue_mode_without_alignments_rejected_before_work() {
        let db = tree();
        let config = AggregationConfig {
            vote_mode: VoteMode::Evalue,
            progress: false,
            ..Default::default()
        };
        let sets: MemoryDb = vec![(1, "5\n")].into_iter().collect();
        let sink = MemorySink::new();

        let result = Aggregator::new(&db, &config).run(&sets, &MemoryDb::new(), None, &sink);
        assert!(matches!(result, Err(TaxaggError::Config(_))));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_run_writes_one_record_per_set() {
        let db = tree();
        let config = quiet();

        let sets: MemoryDb = (0..250u32).map(|k| (k, format!("{}\n", k % 3))).collect();
        let taxa: MemoryDb = vec![(0, "11\n"), (1, "12\n"), (2, "0\n")].into_iter().collect();
        let sink = MemorySink::new();

        let summary = Aggregator::new(&db, &config)
            .run(&sets, &taxa, None, &sink)
            .unwrap();
        assert_eq!(summary.sets, 250);
        assert_eq!(summary.members, 250);
        assert_eq!(sink.len(), 250);

        assert_eq!(sink.get_string(0).unwrap(), "11\tspecies\tA\t1\t1\t1\t1\n");
        assert_eq!(sink.get_string(2).unwrap(), "0\tno rank\tunclassified\t1\t0\t0\t0\n");
    }
}
