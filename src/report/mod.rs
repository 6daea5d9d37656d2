pub mod record;

pub use record::{format_record, round_percent};
