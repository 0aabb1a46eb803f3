// Shared helpers for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use typeahead::coordinator::{ResultBatch, ResultSink, SearchBackend};
use typeahead::error::QueryError;
use typeahead::store::{Record, TextIndexStore};

pub const AIRPORTS: &[(&str, &str)] = &[
    ("Melbourne Airport", "MEL"),
    ("Miami International Airport", "MIA"),
    ("Munich Airport", "MUC"),
    ("Sydney Kingsford Smith Airport", "SYD"),
    ("Adelaide Airport", "ADL"),
    ("Manchester Airport", "MAN"),
];

pub fn airport_records() -> Vec<Record> {
    AIRPORTS
        .iter()
        .map(|(name, iata)| Record::new(*name).with_field("iata_code", *iata))
        .collect()
}

pub fn airports() -> Arc<TextIndexStore> {
    let store = Arc::new(TextIndexStore::default());
    store.load(airport_records());
    store
}

/// Store holding `names` as bare records
pub fn store_of(names: &[&str]) -> Arc<TextIndexStore> {
    let store = Arc::new(TextIndexStore::default());
    store.load(names.iter().map(|n| Record::new(*n)));
    store
}

/// One backend call as seen by a [`RecordingBackend`]
#[derive(Debug, Clone)]
pub struct Call {
    pub term: String,
    pub started: Instant,
    pub finished: Option<Instant>,
}

/// Delegates to a store after a per-term delay and records every call
pub struct RecordingBackend {
    store: Arc<TextIndexStore>,
    default_delay: Duration,
    delays: Vec<(String, Duration)>,
    calls: Mutex<Vec<Call>>,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl RecordingBackend {
    pub fn new(store: Arc<TextIndexStore>, default_delay: Duration) -> Self {
        Self {
            store,
            default_delay,
            delays: Vec::new(),
            calls: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    /// Use `delay` for queries of exactly `term`
    pub fn with_delay(mut self, term: &str, delay: Duration) -> Self {
        self.delays.push((term.to_string(), delay));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn terms(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.term.clone()).collect()
    }

    /// Highest number of calls that were running at the same time
    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    fn delay_for(&self, term: &str) -> Duration {
        self.delays
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, d)| *d)
            .unwrap_or(self.default_delay)
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Arc<Record>>, QueryError> {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(Call {
                term: term.to_string(),
                started: Instant::now(),
                finished: None,
            });
            calls.len() - 1
        };
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);

        tokio::time::sleep(self.delay_for(term)).await;
        let result = self.store.search(term, limit);

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock()[index].finished = Some(Instant::now());
        result
    }
}

/// Fails every query
pub struct FailingBackend {
    pub delay: Duration,
}

#[async_trait]
impl SearchBackend for FailingBackend {
    async fn search(&self, _term: &str, _limit: usize) -> Result<Vec<Arc<Record>>, QueryError> {
        tokio::time::sleep(self.delay).await;
        Err(QueryError::Backend("index unavailable".to_string()))
    }
}

/// Event observed by a [`RecordingSink`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Clear,
    Replace { term: String, names: Vec<String> },
    Fail { term: String },
}

/// Keeps every sink call in order
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Instant, SinkEvent)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, SinkEvent)> {
        self.events.lock().clone()
    }

    /// Replace events only
    pub fn published(&self) -> Vec<(String, Vec<String>)> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, e)| match e {
                SinkEvent::Replace { term, names } => Some((term.clone(), names.clone())),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push((Instant::now(), event));
    }
}

impl ResultSink for RecordingSink {
    fn clear(&self) {
        self.push(SinkEvent::Clear);
    }

    fn replace(&self, batch: ResultBatch) {
        self.push(SinkEvent::Replace {
            term: batch.term.to_string(),
            names: batch.names().map(String::from).collect(),
        });
    }

    fn fail(&self, term: &str, _error: &QueryError) {
        self.push(SinkEvent::Fail {
            term: term.to_string(),
        });
    }
}
