pub mod index;
pub mod memory;
pub mod traits;

pub use index::{index_path_for, DbReader, DbWriter};
pub use memory::{MemoryDb, MemorySink};
pub use traits::{RecordSink, RecordSource};
