//! Record storage and name lookup
//!
//! - [`record`] - the stored entity
//! - [`matcher`] - prefix/substring and case policy
//! - [`index`] - the sorted, atomically replaced index
//! - [`ingest`] - reading record files from disk
//! - [`stats`] - content summaries

pub mod index;
pub mod ingest;
pub mod matcher;
pub mod record;
pub mod stats;

pub use index::{
    DEFAULT_CACHE_SIZE, DEFAULT_MAX_TERM_LEN, DEFAULT_RESULT_LIMIT, LoadReport, StoreOptions,
    TextIndexStore,
};
pub use ingest::{load_path, read_records};
pub use matcher::{CaseMatching, MatchMode, Matcher};
pub use record::Record;
pub use stats::StoreStats;
