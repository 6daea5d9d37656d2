pub mod taxonomy;

pub use taxonomy::{TaxonId, TaxonomyAccessor, TaxonomyDB, TaxonomyNode};
