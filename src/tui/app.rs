use crate::coordinator::{
    CoordinatorOptions, FeedState, Phase, ResultFeed, SearchCoordinator,
};
use crate::store::{Matcher, Record, TextIndexStore, load_path};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Help,
}

/// Rows moved by PageUp/PageDown
const PAGE: usize = 10;

/// Application state
pub struct App {
    /// Record file the store was loaded from (F5 reloads it)
    pub source: PathBuf,
    store: Arc<TextIndexStore>,
    coordinator: SearchCoordinator,
    feed: watch::Receiver<FeedState>,
    pub query: String,
    pub results: Vec<Arc<Record>>,
    /// Term the visible results were computed for
    pub results_term: String,
    pub selected: usize,
    pub mode: Mode,
    pub status_message: String,
    /// Message of the last failed query, until the next batch arrives
    pub failure: Option<String>,
}

impl App {
    /// Must be called inside a tokio runtime context
    pub fn new(
        source: PathBuf,
        store: Arc<TextIndexStore>,
        options: CoordinatorOptions,
    ) -> Result<Self> {
        let feed = Arc::new(ResultFeed::new());
        let rx = feed.subscribe();
        let coordinator = SearchCoordinator::new(store.clone(), feed, options)?;

        let status_message = format!("{} records loaded", store.len());
        Ok(Self {
            source,
            store,
            coordinator,
            feed: rx,
            query: String::new(),
            results: Vec::new(),
            results_term: String::new(),
            selected: 0,
            mode: Mode::Search,
            status_message,
            failure: None,
        })
    }

    /// Pick up the latest published state, if it changed
    pub fn poll_feed(&mut self) {
        if !self.feed.has_changed().unwrap_or(false) {
            return;
        }

        let state = self.feed.borrow_and_update().clone();
        match state {
            FeedState::Cleared => {
                self.results.clear();
            }
            FeedState::Ready(batch) => {
                self.results_term = batch.term.to_string();
                self.results = batch.records;
                self.failure = None;
                let stats = self.coordinator.stats();
                self.status_message = format!(
                    "{} results for '{}' ({} queries, {} stale)",
                    self.results.len(),
                    self.results_term,
                    stats.queries,
                    stats.stale_discarded
                );
            }
            FeedState::Failed { term, message } => {
                self.results.clear();
                self.results_term = term;
                self.status_message = format!("Search failed: {}", message);
                self.failure = Some(message);
            }
        }
        self.selected = self.selected.min(self.results.len().saturating_sub(1));
    }

    /// Hand the edited query to the coordinator
    fn query_changed(&mut self) {
        self.selected = 0;
        self.coordinator.set_search_term(self.query.clone());
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.query_changed();
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
        self.query_changed();
    }

    pub fn backspace(&mut self) {
        if self.query.pop().is_some() {
            self.query_changed();
        }
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.query_changed();
    }

    /// Delete word backward from query (Ctrl+w)
    pub fn delete_word(&mut self) {
        let before = self.query.len();
        // Remove trailing whitespace first
        while self.query.ends_with(' ') {
            self.query.pop();
        }
        while !self.query.is_empty() && !self.query.ends_with(' ') {
            self.query.pop();
        }
        if self.query.len() != before {
            self.query_changed();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    pub fn phase(&self) -> Phase {
        self.coordinator.phase()
    }

    pub fn matcher(&self) -> Matcher {
        self.store.matcher()
    }

    /// Reload the record file and search the current term again
    pub fn reload(&mut self) {
        match load_path(&self.store, &self.source, true) {
            Ok(report) => {
                self.status_message = format!(
                    "Reloaded: {} records ({} skipped)",
                    report.loaded,
                    report.skipped()
                );
                self.coordinator.refresh();
            }
            Err(e) => {
                self.status_message = format!("Reload failed: {}", e);
            }
        }
    }

    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }

    pub fn selected_record(&self) -> Option<&Arc<Record>> {
        self.results.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 1).min(self.results.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_page_down(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + PAGE).min(self.results.len() - 1);
        }
    }

    pub fn select_page_up(&mut self) {
        self.selected = self.selected.saturating_sub(PAGE);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.results.len().saturating_sub(1);
    }

    pub fn show_help(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn hide_help(&mut self) {
        self.mode = Mode::Search;
    }
}
