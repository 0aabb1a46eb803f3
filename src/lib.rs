//! # typeahead - debounced search-as-you-type
//!
//! Turns a stream of search-term edits into a small number of queries
//! against an in-memory name index, and publishes only results that match
//! the term the user is looking at.
//!
//! ## Architecture
//!
//! - [`store`] - Record ingestion and the name-sorted [`store::TextIndexStore`]
//! - [`coordinator`] - Debouncing, single-flight query cycles, staleness checks
//! - [`output`] - Terminal and JSON result formatting
//! - [`tui`] - Interactive terminal UI (feature `interactive`)
//! - [`utils`] - Configuration and progress display
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use typeahead::coordinator::{CoordinatorOptions, ResultFeed, SearchCoordinator};
//! use typeahead::store::{Record, TextIndexStore};
//!
//! # async fn demo() -> Result<(), typeahead::error::CoordinatorError> {
//! let store = Arc::new(TextIndexStore::default());
//! store.load(["Melbourne", "Miami", "Munich"].into_iter().map(Record::new));
//!
//! let feed = Arc::new(ResultFeed::new());
//! let coordinator = SearchCoordinator::new(store, feed.clone(), CoordinatorOptions::default())?;
//!
//! coordinator.set_search_term("M");
//! coordinator.set_search_term("Mi");
//! coordinator.settle().await;
//!
//! assert_eq!(feed.snapshot().names(), ["Miami"]);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod error;
pub mod output;
pub mod store;
#[cfg(feature = "interactive")]
pub mod tui;
pub mod utils;

pub use coordinator::{
    CoordinatorOptions, CoordinatorStats, FeedState, Phase, ResultBatch, ResultFeed, ResultSink,
    SearchBackend, SearchCoordinator,
};
pub use error::{CoordinatorError, IngestError, QueryError, StoreError};
pub use store::{LoadReport, Record, StoreOptions, TextIndexStore};
