//! In-memory name index
//!
//! Contents are an immutable, name-sorted snapshot behind an [`ArcSwap`], so a
//! load replaces everything at once and searches never see a half-built
//! index. Prefix queries binary-search into the sorted keys; substring queries
//! scan in order and stop once the limit is reached.
//!
//! A store may also name a payload field (an airport code, say) that is
//! matched as a substring alongside the name. Such a store always scans.

use crate::error::{IngestError, QueryError};
use crate::store::matcher::{CaseMatching, MatchMode, Matcher};
use crate::store::record::Record;
use crate::store::stats::StoreStats;
use arc_swap::ArcSwap;
use lru::LruCache;
use memchr::memmem;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Result cap used by the interactive search surfaces
pub const DEFAULT_RESULT_LIMIT: usize = 200;

/// Longest term (in bytes) a store accepts
pub const DEFAULT_MAX_TERM_LEN: usize = 256;

/// Number of recent (term, limit) results kept per store
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// Skipped rows beyond this many are counted but not kept in the report
const MAX_REPORTED_ISSUES: usize = 20;

/// Store construction options
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub match_mode: MatchMode,
    pub case_matching: CaseMatching,
    pub max_term_len: usize,
    /// 0 disables result caching
    pub cache_size: usize,
    /// String payload field matched as a substring next to the name
    pub code_field: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            case_matching: CaseMatching::default(),
            max_term_len: DEFAULT_MAX_TERM_LEN,
            cache_size: DEFAULT_CACHE_SIZE,
            code_field: None,
        }
    }
}

/// Outcome of a [`TextIndexStore::load`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub malformed: usize,
    pub duplicates: usize,
    /// First few skipped rows, for diagnostics
    #[serde(skip)]
    pub issues: Vec<IngestError>,
}

impl LoadReport {
    pub fn skipped(&self) -> usize {
        self.malformed + self.duplicates
    }

    /// Record a skipped row
    pub fn note(&mut self, issue: IngestError) {
        match issue {
            IngestError::Duplicate { .. } => self.duplicates += 1,
            IngestError::EmptyName { .. } | IngestError::Invalid { .. } => self.malformed += 1,
        }
        if self.issues.len() < MAX_REPORTED_ISSUES {
            self.issues.push(issue);
        }
    }
}

struct Entry {
    /// Folded name; `None` when the raw name is the key
    key: Option<String>,
    /// Folded value of the code field, when the store has one
    code: Option<String>,
    record: Arc<Record>,
}

impl Entry {
    fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.record.name)
    }
}

struct Snapshot {
    generation: u64,
    entries: Vec<Entry>,
}

type CacheKey = (u64, String, usize);

/// Name-ordered record store with prefix or substring lookup
pub struct TextIndexStore {
    matcher: Matcher,
    max_term_len: usize,
    code_field: Option<String>,
    snapshot: ArcSwap<Snapshot>,
    next_generation: AtomicU64,
    cache: Option<Mutex<LruCache<CacheKey, Arc<[Arc<Record>]>>>>,
}

impl Default for TextIndexStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

impl TextIndexStore {
    pub fn new(options: StoreOptions) -> Self {
        let cache = NonZeroUsize::new(options.cache_size).map(|n| Mutex::new(LruCache::new(n)));

        Self {
            matcher: Matcher::new(options.match_mode, options.case_matching),
            max_term_len: options.max_term_len,
            code_field: options.code_field,
            snapshot: ArcSwap::from_pointee(Snapshot {
                generation: 0,
                entries: Vec::new(),
            }),
            next_generation: AtomicU64::new(1),
            cache,
        }
    }

    /// Replace the entire contents with `records`
    ///
    /// Rows with an empty name and rows identical to an earlier row are
    /// skipped and counted; they never fail the load. Loading the same input
    /// twice leaves the store exactly as a single load would.
    pub fn load<I>(&self, records: I) -> LoadReport
    where
        I: IntoIterator<Item = Record>,
    {
        self.load_rows(records.into_iter().enumerate())
    }

    /// [`load`](Self::load) for records tagged with their row in a source
    ///
    /// Skipped rows are reported under the given row instead of their
    /// position in the iterator.
    pub fn load_rows<I>(&self, rows: I) -> LoadReport
    where
        I: IntoIterator<Item = (usize, Record)>,
    {
        let mut report = LoadReport::default();
        let mut accepted: Vec<Record> = Vec::new();
        let mut by_name: FxHashMap<String, Vec<usize>> = FxHashMap::default();

        for (index, record) in rows {
            if !record.is_well_formed() {
                debug!(index, "skipping row with empty name");
                report.note(IngestError::EmptyName { index });
                continue;
            }

            let same_name = by_name.entry(record.name.clone()).or_default();
            if same_name.iter().any(|&i| accepted[i] == record) {
                debug!(index, name = %record.name, "skipping duplicate row");
                report.note(IngestError::Duplicate { index });
                continue;
            }

            same_name.push(accepted.len());
            accepted.push(record);
        }

        let matcher = self.matcher;
        let code_field = self.code_field.as_deref();
        let mut entries: Vec<Entry> = accepted
            .into_par_iter()
            .map(|record| Entry {
                key: matcher.fold(&record.name),
                code: code_field
                    .and_then(|field| record.field_str(field))
                    .map(|code| matcher.fold(code).unwrap_or_else(|| code.to_string())),
                record: Arc::new(record),
            })
            .collect();
        entries.par_sort_by(|a, b| {
            a.key()
                .cmp(b.key())
                .then_with(|| a.record.name.cmp(&b.record.name))
        });

        report.loaded = entries.len();
        let generation = self.next_generation.fetch_add(1, Ordering::AcqRel);
        self.snapshot.store(Arc::new(Snapshot {
            generation,
            entries,
        }));
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }

        info!(
            generation,
            loaded = report.loaded,
            malformed = report.malformed,
            duplicates = report.duplicates,
            "store loaded"
        );
        report
    }

    /// Records matching `term`, ordered by name, at most `limit` of them
    ///
    /// An empty term matches everything.
    pub fn search(&self, term: &str, limit: usize) -> Result<Vec<Arc<Record>>, QueryError> {
        if term.len() > self.max_term_len {
            return Err(QueryError::TermTooLong {
                len: term.len(),
                max: self.max_term_len,
            });
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot.load();
        let cache_key = (snapshot.generation, term.to_string(), limit);

        if let Some(cache) = &self.cache
            && let Some(hit) = cache.lock().get(&cache_key)
        {
            debug!(term, hits = hit.len(), "search cache hit");
            return Ok(hit.to_vec());
        }

        let results = self.scan(&snapshot, term, limit);

        if let Some(cache) = &self.cache {
            cache.lock().put(cache_key, Arc::from(results.clone()));
        }
        Ok(results)
    }

    fn scan(&self, snapshot: &Snapshot, term: &str, limit: usize) -> Vec<Arc<Record>> {
        let folded = self.matcher.fold(term);
        let needle = folded.as_deref().unwrap_or(term);
        let entries = &snapshot.entries;

        if needle.is_empty() {
            return entries
                .iter()
                .take(limit)
                .map(|e| Arc::clone(&e.record))
                .collect();
        }

        if self.code_field.is_some() {
            let finder = memmem::Finder::new(needle.as_bytes());
            return entries
                .iter()
                .filter(|e| {
                    self.matcher.is_match(e.key(), needle)
                        || e.code
                            .as_deref()
                            .is_some_and(|code| finder.find(code.as_bytes()).is_some())
                })
                .take(limit)
                .map(|e| Arc::clone(&e.record))
                .collect();
        }

        match self.matcher.mode {
            MatchMode::Prefix => {
                // Keys sharing a prefix are contiguous, starting at the first key >= prefix
                let start = entries.partition_point(|e| e.key() < needle);
                entries[start..]
                    .iter()
                    .take_while(|e| e.key().starts_with(needle))
                    .take(limit)
                    .map(|e| Arc::clone(&e.record))
                    .collect()
            }
            MatchMode::Substring => {
                let finder = memmem::Finder::new(needle.as_bytes());
                entries
                    .iter()
                    .filter(|e| finder.find(e.key().as_bytes()).is_some())
                    .take(limit)
                    .map(|e| Arc::clone(&e.record))
                    .collect()
            }
        }
    }

    /// Byte range of `term` inside `name` under this store's policy
    pub fn match_range(&self, name: &str, term: &str) -> Option<Range<usize>> {
        self.matcher.match_range(name, term)
    }

    pub fn matcher(&self) -> Matcher {
        self.matcher
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped by every load; 0 before the first one
    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }

    pub fn stats(&self) -> StoreStats {
        let snapshot = self.snapshot.load();
        StoreStats::from_names(
            snapshot.generation,
            snapshot.entries.iter().map(|e| e.record.name.as_str()),
        )
    }
}
