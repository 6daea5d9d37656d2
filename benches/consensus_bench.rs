use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use taxagg::core::config::AggregationConfig;
use taxagg::storage::{MemoryDb, MemorySink};
use taxagg::{select_taxon_for_set, Aggregator, TaxHit, TaxonomyDB, TaxonomyNode};

/// Balanced tree: root -> superkingdom -> 10 phyla -> 10 genera each -> 10 species each
fn generate_taxonomy() -> (TaxonomyDB, Vec<u32>) {
    let mut nodes = vec![
        TaxonomyNode::new(1, 1, "no rank", "root"),
        TaxonomyNode::new(2, 1, "superkingdom", "Bacteria"),
    ];
    let mut species = Vec::new();
    let mut next_id = 10;
    for p in 0..10 {
        let phylum = next_id;
        next_id += 1;
        nodes.push(TaxonomyNode::new(phylum, 2, "phylum", &format!("phylum_{}", p)));
        for g in 0..10 {
            let genus = next_id;
            next_id += 1;
            nodes.push(TaxonomyNode::new(genus, phylum, "genus", &format!("genus_{}_{}", p, g)));
            for s in 0..10 {
                let id = next_id;
                next_id += 1;
                nodes.push(TaxonomyNode::new(id, genus, "species", &format!("species_{}_{}_{}", p, g, s)));
                species.push(id);
            }
        }
    }
    (TaxonomyDB::from_nodes(nodes).unwrap(), species)
}

fn generate_hits(species: &[u32], size: usize) -> Vec<TaxHit> {
    (0..size)
        .map(|i| TaxHit {
            taxon: if i % 9 == 0 { 0 } else { species[(i * 37) % 50] },
            evalue: 1e-10,
            weight: if i % 9 == 0 { 0.0 } else { 1.0 },
        })
        .collect()
}

fn bench_select_taxon(c: &mut Criterion) {
    let (taxonomy, species) = generate_taxonomy();
    let mut group = c.benchmark_group("consensus/select");

    for size in [10, 100, 1000].iter() {
        let hits = generate_hits(&species, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let result = select_taxon_for_set(&hits, &taxonomy, 0.5).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

fn bench_aggregate_sets(c: &mut Criterion) {
    let (taxonomy, species) = generate_taxonomy();
    let config = AggregationConfig {
        progress: false,
        ..Default::default()
    };

    let taxa: MemoryDb = species
        .iter()
        .enumerate()
        .map(|(member, taxon)| (member as u32, format!("{}\n", taxon)))
        .collect();
    let sets: MemoryDb = (0..10_000u32)
        .map(|set| {
            let members: String = (0..(set % 40 + 1))
                .map(|i| format!("{}\n", (set * 13 + i) % species.len() as u32))
                .collect();
            (set, members)
        })
        .collect();

    c.bench_function("consensus/aggregate_10k_sets", |b| {
        b.iter(|| {
            let sink = MemorySink::new();
            let summary = Aggregator::new(&taxonomy, &config)
                .run(&sets, &taxa, None, &sink)
                .unwrap();
            black_box(summary);
        });
    });
}

criterion_group!(benches, bench_select_taxon, bench_aggregate_sets);
criterion_main!(benches);
