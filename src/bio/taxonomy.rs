/// Taxonomy tree access for consensus classification
use std::collections::{HashMap, HashSet};
use std::collections::hash_map::Entry;

use crate::{Result, TaxaggError};

/// NCBI taxonomy identifier. `0` marks an unassigned member.
pub type TaxonId = u32;

/// Rank string used for nodes outside the standard vocabulary
pub const NO_RANK: &str = "no rank";

/// Position of a rank in the standard ordering (lower = more specific).
///
/// Ranks outside the vocabulary, such as "no rank" or "clade", have no index
/// and can never be chosen as a consensus.
pub fn rank_index(rank: &str) -> Option<u32> {
    let index = match rank {
        "forma" => 1,
        "varietas" => 2,
        "subspecies" => 3,
        "species" => 4,
        "species subgroup" => 5,
        "species group" => 6,
        "subgenus" => 7,
        "genus" => 8,
        "subtribe" => 9,
        "tribe" => 10,
        "subfamily" => 11,
        "family" => 12,
        "superfamily" => 13,
        "parvorder" => 14,
        "infraorder" => 15,
        "suborder" => 16,
        "order" => 17,
        "superorder" => 18,
        "infraclass" => 19,
        "subclass" => 20,
        "class" => 21,
        "superclass" => 22,
        "subphylum" => 23,
        "phylum" => 24,
        "superphylum" => 25,
        "subkingdom" => 26,
        "kingdom" => 27,
        "superkingdom" => 28,
        _ => return None,
    };
    Some(index)
}

/// One-letter rank code used in named lineages
pub fn short_rank(rank: &str) -> &'static str {
    match rank {
        "superkingdom" => "d",
        "kingdom" => "k",
        "phylum" => "p",
        "class" => "c",
        "order" => "o",
        "family" => "f",
        "genus" => "g",
        "species" => "s",
        _ => "-",
    }
}

/// Split a comma-separated rank list such as `"superkingdom,phylum,genus"`
pub fn parse_ranks(ranks: &str) -> Vec<String> {
    ranks
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyNode {
    pub id: TaxonId,
    pub parent_id: TaxonId,
    pub rank: String,
    pub name: String,
}

impl TaxonomyNode {
    pub fn new(id: TaxonId, parent_id: TaxonId, rank: &str, name: &str) -> Self {
        Self {
            id,
            parent_id,
            rank: rank.to_string(),
            name: name.to_string(),
        }
    }

    /// The root is the only node that is its own parent
    pub fn is_root(&self) -> bool {
        self.parent_id == self.id
    }
}

/// Read-only view of a classification tree.
///
/// Implementations must be shareable across worker threads without locking.
pub trait TaxonomyAccessor: Send + Sync {
    /// Look up a node by id
    fn node(&self, taxon_id: TaxonId) -> Option<&TaxonomyNode>;

    /// Rank-index of a rank string, `None` when unindexed
    fn rank_index(&self, rank: &str) -> Option<u32> {
        rank_index(rank)
    }

    /// Render the lineage of `node` from the top of the tree down to `node`.
    ///
    /// The root itself is left out unless `node` is the root. With
    /// `as_names` each entry is `<short rank>_<name>`, otherwise the taxon id.
    fn lineage(&self, node: &TaxonomyNode, as_names: bool) -> String {
        let mut path = vec![node];
        let mut current = node;
        while !current.is_root() {
            match self.node(current.parent_id) {
                Some(parent) if !parent.is_root() => {
                    path.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }

        path.iter()
            .rev()
            .map(|n| {
                if as_names {
                    format!("{}_{}", short_rank(&n.rank), n.name)
                } else {
                    n.id.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Names of the ancestors of `node` at each requested rank.
    ///
    /// A requested rank more specific than the node's own rank yields
    /// `uc_<name>`; a rank missing from the lineage yields `unknown`.
    fn at_ranks(&self, node: &TaxonomyNode, ranks: &[String]) -> Vec<String> {
        let mut by_rank: HashMap<&str, &str> = HashMap::new();
        let mut current = node;
        loop {
            if current.rank != NO_RANK {
                by_rank.entry(current.rank.as_str()).or_insert(current.name.as_str());
            }
            if current.is_root() {
                break;
            }
            match self.node(current.parent_id) {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let base_index = self.rank_index(&node.rank);
        ranks
            .iter()
            .map(|rank| {
                if let Some(name) = by_rank.get(rank.as_str()) {
                    return name.to_string();
                }
                match (self.rank_index(rank), base_index) {
                    (Some(requested), Some(base)) if requested < base => {
                        format!("uc_{}", node.name)
                    }
                    _ => "unknown".to_string(),
                }
            })
            .collect()
    }
}

/// Classification tree stored as an arena of nodes addressed by taxon id
#[derive(Debug, Default)]
pub struct TaxonomyDB {
    nodes: Vec<TaxonomyNode>,
    index: HashMap<TaxonId, usize>,
}

impl TaxonomyDB {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from nodes and check that every parent resolves
    pub fn from_nodes<I>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = TaxonomyNode>,
    {
        let mut db = Self::new();
        for node in nodes {
            db.add_taxon(node)?;
        }
        db.validate()?;
        Ok(db)
    }

    pub fn add_taxon(&mut self, node: TaxonomyNode) -> Result<()> {
        match self.index.entry(node.id) {
            Entry::Occupied(_) => Err(TaxaggError::Database(format!(
                "duplicate taxonomy node {}",
                node.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(self.nodes.len());
                self.nodes.push(node);
                Ok(())
            }
        }
    }

    /// Every parent must exist and exactly one node may be its own parent
    pub fn validate(&self) -> Result<()> {
        let mut roots = 0;
        for node in &self.nodes {
            if node.id == 0 {
                return Err(TaxaggError::Database(
                    "taxon id 0 is reserved for unassigned members".to_string(),
                ));
            }
            if node.is_root() {
                roots += 1;
            } else if !self.index.contains_key(&node.parent_id) {
                return Err(TaxaggError::Database(format!(
                    "taxon {} has unknown parent {}",
                    node.id, node.parent_id
                )));
            }
        }
        if roots != 1 {
            return Err(TaxaggError::Database(format!(
                "taxonomy must have exactly one root, found {}",
                roots
            )));
        }

        // Every parent chain must reach the root
        let mut connected: HashSet<TaxonId> = HashSet::with_capacity(self.nodes.len());
        let mut chain = Vec::new();
        for node in &self.nodes {
            chain.clear();
            let mut current = node;
            while !current.is_root() && !connected.contains(&current.id) {
                if chain.len() >= self.nodes.len() {
                    return Err(TaxaggError::Database(format!(
                        "taxon {} is not connected to the root",
                        node.id
                    )));
                }
                chain.push(current.id);
                current = self.get_taxon(current.parent_id).ok_or_else(|| {
                    TaxaggError::Database(format!(
                        "taxon {} has unknown parent {}",
                        current.id, current.parent_id
                    ))
                })?;
            }
            connected.extend(chain.iter().copied());
        }
        Ok(())
    }

    pub fn get_taxon(&self, taxon_id: TaxonId) -> Option<&TaxonomyNode> {
        self.index.get(&taxon_id).map(|&i| &self.nodes[i])
    }

    #[cfg(test)]
    pub fn root(&self) -> Option<&TaxonomyNode> {
        self.nodes.iter().find(|n| n.is_root())
    }

    /// Ids from the root down to `taxon_id`, empty for an unknown taxon
    #[cfg(test)]
    pub fn get_lineage(&self, taxon_id: TaxonId) -> Vec<TaxonId> {
        let mut lineage = Vec::new();
        let mut current = self.get_taxon(taxon_id);

        while let Some(node) = current {
            lineage.push(node.id);
            if node.is_root() {
                break;
            }
            current = self.get_taxon(node.parent_id);
        }

        lineage.reverse();
        lineage
    }

    pub fn taxa_count(&self) -> usize {
        self.nodes.len()
    }
}

impl TaxonomyAccessor for TaxonomyDB {
    fn node(&self, taxon_id: TaxonId) -> Option<&TaxonomyNode> {
        self.get_taxon(taxon_id)
    }
}

/// Parse NCBI taxonomy dump files
pub mod ncbi {
    use super::*;
    use std::fs::File;
    use std::io::{BufRead, BufReader};
    use std::path::Path;

    fn fields(line: &str) -> Vec<&str> {
        line.trim_end_matches("\t|")
            .split("\t|\t")
            .map(str::trim)
            .collect()
    }

    pub fn load_names<P: AsRef<Path>>(path: P) -> Result<HashMap<TaxonId, String>> {
        let reader = BufReader::new(File::open(path)?);
        let mut names = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            let parts = fields(&line);

            if parts.len() >= 4 && parts[3] == "scientific name" {
                let taxon_id = parts[0]
                    .parse::<TaxonId>()
                    .map_err(|e| TaxaggError::Parse(format!("names.dmp: {}: {}", parts[0], e)))?;
                names.insert(taxon_id, parts[1].to_string());
            }
        }

        Ok(names)
    }

    pub fn load_nodes<P: AsRef<Path>>(path: P) -> Result<HashMap<TaxonId, (TaxonId, String)>> {
        let reader = BufReader::new(File::open(path)?);
        let mut nodes = HashMap::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parts = fields(&line);
            if parts.len() < 3 {
                return Err(TaxaggError::Parse(format!(
                    "nodes.dmp: expected at least 3 columns in line '{}'",
                    line
                )));
            }
            let taxon_id = parts[0]
                .parse::<TaxonId>()
                .map_err(|e| TaxaggError::Parse(format!("nodes.dmp: {}: {}", parts[0], e)))?;
            let parent_id = parts[1]
                .parse::<TaxonId>()
                .map_err(|e| TaxaggError::Parse(format!("nodes.dmp: {}: {}", parts[1], e)))?;
            nodes.insert(taxon_id, (parent_id, parts[2].to_string()));
        }

        Ok(nodes)
    }

    /// Build the tree from `names.dmp` and `nodes.dmp`.
    ///
    /// Nodes without a scientific name keep an empty name; a dangling parent
    /// or a missing root is an error.
    pub fn build_taxonomy_db<P: AsRef<Path>>(names_path: P, nodes_path: P) -> Result<TaxonomyDB> {
        let mut names = load_names(names_path)?;
        let nodes = load_nodes(nodes_path)?;

        let mut ids: Vec<_> = nodes.keys().copied().collect();
        ids.sort_unstable();

        let mut db = TaxonomyDB::new();
        for taxon_id in ids {
            let (parent_id, rank) = &nodes[&taxon_id];
            db.add_taxon(TaxonomyNode {
                id: taxon_id,
                parent_id: *parent_id,
                rank: rank.clone(),
                name: names.remove(&taxon_id).unwrap_or_default(),
            })?;
        }
        db.validate()?;

        tracing::debug!("Loaded {} taxonomy nodes", db.taxa_count());
        Ok(db)
    }

    /// Load `names.dmp` and `nodes.dmp` from one directory
    pub fn load_taxonomy_dir<P: AsRef<Path>>(dir: P) -> Result<TaxonomyDB> {
        let dir = dir.as_ref();
        build_taxonomy_db(dir.join("names.dmp"), dir.join("nodes.dmp"))
    }
}
