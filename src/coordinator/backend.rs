use crate::error::QueryError;
use crate::store::{Record, TextIndexStore};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// What the coordinator queries
///
/// The call may suspend; the coordinator bounds it with its query timeout
/// and never runs two calls at once.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Arc<Record>>, QueryError>;
}

#[async_trait]
impl SearchBackend for TextIndexStore {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Arc<Record>>, QueryError> {
        TextIndexStore::search(self, term, limit)
    }
}

/// Wraps a backend and delays every call, to mimic a remote index
pub struct LatencyBackend {
    inner: Arc<dyn SearchBackend>,
    latency: Duration,
}

impl LatencyBackend {
    pub fn new(inner: Arc<dyn SearchBackend>, latency: Duration) -> Self {
        Self { inner, latency }
    }
}

#[async_trait]
impl SearchBackend for LatencyBackend {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Arc<Record>>, QueryError> {
        tokio::time::sleep(self.latency).await;
        self.inner.search(term, limit).await
    }
}
