/// In-memory record stores
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeMap;

use crate::storage::traits::{RecordSink, RecordSource};
use crate::{Result, TaxaggError};

/// Read-only keyed records held in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryDb {
    records: BTreeMap<u32, Vec<u8>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: u32, data: impl Into<Vec<u8>>) {
        self.records.insert(key, data.into());
    }
}

impl<D: Into<Vec<u8>>> FromIterator<(u32, D)> for MemoryDb {
    fn from_iter<I: IntoIterator<Item = (u32, D)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|(k, d)| (k, d.into())).collect(),
        }
    }
}

impl RecordSource for MemoryDb {
    fn keys(&self) -> Vec<u32> {
        self.records.keys().copied().collect()
    }

    fn get(&self, key: u32) -> Option<&[u8]> {
        self.records.get(&key).map(Vec::as_slice)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Concurrent sink collecting one record per key
#[derive(Debug, Default)]
pub struct MemorySink {
    records: DashMap<u32, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record under `key` as text
    pub fn get_string(&self, key: u32) -> Option<String> {
        self.records
            .get(&key)
            .map(|r| String::from_utf8_lossy(r.value()).into_owned())
    }

    /// Drain all records ordered by key
    pub fn into_sorted(self) -> Vec<(u32, Vec<u8>)> {
        let mut records: Vec<_> = self.records.into_iter().collect();
        records.sort_unstable_by_key(|(key, _)| *key);
        records
    }
}

impl RecordSink for MemorySink {
    fn write(&self, key: u32, data: &[u8]) -> Result<()> {
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(TaxaggError::Database(format!(
                "record {} written more than once",
                key
            ))),
            Entry::Vacant(slot) => {
                slot.insert(data.to_vec());
                Ok(())
            }
        }
    }
}
