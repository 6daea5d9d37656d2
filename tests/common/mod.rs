/// Shared fixtures for taxagg integration tests
///
/// Builds a small NCBI-style taxonomy dump and keyed databases inside a
/// temporary directory that is removed when the fixture is dropped.
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use taxagg::storage::{DbWriter, RecordSink};

/// (id, parent, rank, name)
pub const NODES: &[(u32, u32, &str, &str)] = &[
    (1, 1, "no rank", "root"),
    (131567, 1, "no rank", "cellular organisms"),
    (2, 131567, "superkingdom", "Bacteria"),
    (1224, 2, "phylum", "Proteobacteria"),
    (1236, 1224, "class", "Gammaproteobacteria"),
    (543, 1236, "family", "Enterobacteriaceae"),
    (561, 543, "genus", "Escherichia"),
    (562, 561, "species", "Escherichia coli"),
    (564, 561, "species", "Escherichia fergusonii"),
    (590, 543, "genus", "Salmonella"),
    (28901, 590, "species", "Salmonella enterica"),
    (2157, 131567, "superkingdom", "Archaea"),
];

pub struct Fixture {
    temp_dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Fixture {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        };
        fixture.write_taxonomy();
        fixture
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    pub fn taxonomy_dir(&self) -> PathBuf {
        self.path("taxonomy")
    }

    fn write_taxonomy(&self) {
        let dir = self.taxonomy_dir();
        std::fs::create_dir_all(&dir).expect("Failed to create taxonomy dir");

        let mut nodes = String::new();
        let mut names = String::new();
        for (id, parent, rank, name) in NODES {
            nodes.push_str(&format!("{}\t|\t{}\t|\t{}\t|\t\t|\n", id, parent, rank));
            names.push_str(&format!("{}\t|\t{}\t|\t\t|\tscientific name\t|\n", id, name));
        }
        std::fs::write(dir.join("nodes.dmp"), nodes).expect("Failed to write nodes.dmp");
        std::fs::write(dir.join("names.dmp"), names).expect("Failed to write names.dmp");
    }

    /// Write a keyed database with the given records
    pub fn write_db(&self, name: &str, records: &[(u32, String)]) -> PathBuf {
        let path = self.path(name);
        let writer = DbWriter::create(&path);
        for (key, data) in records {
            writer.write(*key, data.as_bytes()).expect("Failed to write record");
        }
        writer.close().expect("Failed to close database");
        path
    }
}

/// Set records listing member ids one per line
#[allow(dead_code)]
pub fn set_records(sets: &[(u32, Vec<u32>)]) -> Vec<(u32, String)> {
    sets.iter()
        .map(|(key, members)| {
            let body: String = members.iter().map(|m| format!("{}\n", m)).collect();
            (*key, body)
        })
        .collect()
}

/// Taxonomy result records (`taxid\trank\tname`)
#[allow(dead_code)]
pub fn taxon_records(members: &[(u32, u32)]) -> Vec<(u32, String)> {
    members
        .iter()
        .map(|(member, taxon)| (*member, format!("{}\tspecies\tx\n", taxon)))
        .collect()
}

/// Alignment result records with the given e-value in column 4
#[allow(dead_code)]
pub fn alignment_records(members: &[(u32, &str)]) -> Vec<(u32, String)> {
    members
        .iter()
        .map(|(member, evalue)| {
            (
                *member,
                format!("1000\t250\t0.910\t{}\t0\t299\t300\t0\t299\t320\n", evalue),
            )
        })
        .collect()
}

#[allow(dead_code)]
pub fn read_output(path: &Path) -> Vec<(u32, String)> {
    use taxagg::storage::{DbReader, RecordSource};

    let reader = DbReader::open(path).expect("Failed to open output");
    reader
        .keys()
        .into_iter()
        .map(|k| {
            let record = reader.get(k).expect("key listed but missing");
            (k, String::from_utf8(record.to_vec()).expect("output is UTF-8"))
        })
        .collect()
}
