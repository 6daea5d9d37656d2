/// Indexed record databases on disk
///
/// A database is a data file holding `\0`-terminated records plus an index
/// file with one `key\toffset\tlength` line per record, where `length`
/// includes the terminator.
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::storage::memory::MemorySink;
use crate::storage::traits::{RecordSink, RecordSource};
use crate::{Result, TaxaggError};

/// `<data>.index`
pub fn index_path_for<P: AsRef<Path>>(data_path: P) -> PathBuf {
    let mut path = data_path.as_ref().as_os_str().to_owned();
    path.push(".index");
    PathBuf::from(path)
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    key: u32,
    offset: usize,
    length: usize,
}

/// Memory-mapped reader over a data/index pair
pub struct DbReader {
    data: Option<Mmap>,
    index: Vec<IndexEntry>,
}

impl DbReader {
    /// Open `path` together with `path.index`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let index_path = index_path_for(&path);
        Self::open_with_index(path, index_path)
    }

    pub fn open_with_index<P: AsRef<Path>, Q: AsRef<Path>>(path: P, index_path: Q) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let data_len = file.metadata()?.len() as usize;
        let data = if data_len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };

        let mut index = Vec::new();
        let reader = BufReader::new(File::open(index_path.as_ref())?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry = parse_index_line(&line).ok_or_else(|| {
                TaxaggError::Database(format!(
                    "{}: malformed index line {}: '{}'",
                    index_path.as_ref().display(),
                    line_no + 1,
                    line
                ))
            })?;
            if entry.offset + entry.length > data_len {
                return Err(TaxaggError::Database(format!(
                    "{}: record {} points past the end of the data file",
                    path.display(),
                    entry.key
                )));
            }
            index.push(entry);
        }

        index.sort_unstable_by_key(|e| e.key);
        if let Some(pair) = index.windows(2).find(|w| w[0].key == w[1].key) {
            return Err(TaxaggError::Database(format!(
                "{}: duplicate key {}",
                path.display(),
                pair[0].key
            )));
        }

        tracing::debug!("Opened {} with {} records", path.display(), index.len());
        Ok(Self { data, index })
    }
}

fn parse_index_line(line: &str) -> Option<IndexEntry> {
    let mut fields = line.split('\t');
    let key = fields.next()?.parse().ok()?;
    let offset = fields.next()?.parse().ok()?;
    let length = fields.next()?.parse().ok()?;
    Some(IndexEntry {
        key,
        offset,
        length,
    })
}

impl RecordSource for DbReader {
    fn keys(&self) -> Vec<u32> {
        self.index.iter().map(|e| e.key).collect()
    }

    fn get(&self, key: u32) -> Option<&[u8]> {
        let pos = self.index.binary_search_by_key(&key, |e| e.key).ok()?;
        let entry = self.index[pos];
        let data = self.data.as_deref().unwrap_or(&[]);
        let record = &data[entry.offset..entry.offset + entry.length];
        Some(record.strip_suffix(&[0u8]).unwrap_or(record))
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Collects records from concurrent writers and persists them on `close`
///
/// Every record stays in memory until `close`, so memory grows with the
/// number of keys written. In exchange an aborted run leaves no output files.
pub struct DbWriter {
    path: PathBuf,
    index_path: PathBuf,
    records: MemorySink,
}

impl DbWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let index_path = index_path_for(&path);
        Self {
            path,
            index_path,
            records: MemorySink::new(),
        }
    }

    /// Write data and index files sorted by key
    pub fn close(self) -> Result<usize> {
        let mut data = BufWriter::new(File::create(&self.path)?);
        let mut index = BufWriter::new(File::create(&self.index_path)?);

        let records = self.records.into_sorted();
        let mut offset = 0usize;
        for (key, record) in &records {
            data.write_all(record)?;
            data.write_all(&[0])?;
            let length = record.len() + 1;
            writeln!(index, "{}\t{}\t{}", key, offset, length)?;
            offset += length;
        }

        data.flush()?;
        index.flush()?;
        tracing::debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(records.len())
    }
}

impl RecordSink for DbWriter {
    fn write(&self, key: u32, data: &[u8]) -> Result<()> {
        self.records.write(key, data)
    }
}
