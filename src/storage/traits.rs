/// Keyed record access used by the aggregation pipeline
///
/// Sources are read concurrently by every worker; sinks receive exactly one
/// record per key from whichever worker produced it.
use crate::Result;

/// Read side of a keyed record store
pub trait RecordSource: Send + Sync {
    /// All keys, in ascending order
    fn keys(&self) -> Vec<u32>;

    /// Record stored under `key`, without its terminator
    fn get(&self, key: u32) -> Option<&[u8]>;

    /// Number of records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write side of a keyed record store
pub trait RecordSink: Send + Sync {
    /// Store `data` under `key`. Writing the same key twice is an error.
    fn write(&self, key: u32, data: &[u8]) -> Result<()>;
}
