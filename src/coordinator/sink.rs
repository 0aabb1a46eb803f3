//! Result destinations
//!
//! A sink receives whole replacement batches; it never sees diffs. The stock
//! [`ResultFeed`] republishes them on a watch channel so any number of
//! observers can follow the latest state without polling.

use crate::error::QueryError;
use crate::store::Record;
use std::sync::Arc;
use tokio::sync::watch;

/// Ordered records computed for one term
#[derive(Debug, Clone)]
pub struct ResultBatch {
    pub term: Arc<String>,
    pub records: Vec<Arc<Record>>,
}

impl ResultBatch {
    pub fn new(term: Arc<String>, records: Vec<Arc<Record>>) -> Self {
        Self { term, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.name.as_str())
    }
}

/// Receives result updates from a coordinator
///
/// Calls arrive from the coordinator's task, one at a time, in the order the
/// coordinator decides: an optional `clear` when a query starts, then
/// `replace` or `fail` once its result is accepted.
pub trait ResultSink: Send + Sync {
    /// Drop the visible results (a query is about to run)
    fn clear(&self);

    /// Replace the visible results wholesale
    fn replace(&self, batch: ResultBatch);

    /// The query for `term` failed; show an empty, failed state
    fn fail(&self, term: &str, error: &QueryError);
}

/// Latest state published through a [`ResultFeed`]
#[derive(Debug, Clone, Default)]
pub enum FeedState {
    #[default]
    Cleared,
    Ready(ResultBatch),
    Failed { term: String, message: String },
}

impl FeedState {
    /// Visible records; empty unless `Ready`
    pub fn records(&self) -> &[Arc<Record>] {
        match self {
            FeedState::Ready(batch) => &batch.records,
            FeedState::Cleared | FeedState::Failed { .. } => &[],
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.records().iter().map(|r| r.name.as_str()).collect()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FeedState::Failed { .. })
    }
}

/// Observable sink backed by a watch channel
pub struct ResultFeed {
    tx: watch::Sender<FeedState>,
}

impl Default for ResultFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(FeedState::Cleared);
        Self { tx }
    }

    /// Push-based view of the feed
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> FeedState {
        self.tx.borrow().clone()
    }
}

impl ResultSink for ResultFeed {
    fn clear(&self) {
        self.tx.send_replace(FeedState::Cleared);
    }

    fn replace(&self, batch: ResultBatch) {
        self.tx.send_replace(FeedState::Ready(batch));
    }

    fn fail(&self, term: &str, error: &QueryError) {
        self.tx.send_replace(FeedState::Failed {
            term: term.to_string(),
            message: error.to_string(),
        });
    }
}
