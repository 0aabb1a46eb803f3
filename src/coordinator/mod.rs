//! Debounced, single-flight search coordination
//!
//! Terms arrive through [`SearchCoordinator::set_search_term`] at any rate.
//! The coordinator runs at most one debounce-and-query cycle at a time:
//!
//! 1. A request stores the term (last write wins) and pushes the debounce
//!    deadline to `now + debounce`.
//! 2. If no cycle holds the in-flight slot, one is spawned; otherwise the
//!    running cycle picks the new term up on its own.
//! 3. The cycle polls until the deadline passes, snapshots the current term,
//!    and queries the backend under a timeout.
//! 4. If the term changed while the query ran, the result is discarded and
//!    the cycle goes back to step 3. Otherwise the result (or failure) is
//!    published to the sink and the slot is released.
//!
//! A query already running is never interrupted by new input; only
//! [`SearchCoordinator::shutdown`] cancels a cycle.

mod backend;
mod debouncer;
mod sink;
mod state;

pub use backend::{LatencyBackend, SearchBackend};
pub use sink::{FeedState, ResultBatch, ResultFeed, ResultSink};
pub use state::Phase;

use crate::error::{CoordinatorError, QueryError};
use crate::store::DEFAULT_RESULT_LIMIT;
use arc_swap::ArcSwap;
use debouncer::Debouncer;
use parking_lot::Mutex;
use serde::Serialize;
use state::{CycleState, InFlightGuard};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Timing and output policy of a coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Delay from the most recent request before a query is dispatched
    pub debounce: Duration,
    /// How often the cycle re-checks the debounce deadline
    pub poll_interval: Duration,
    pub result_limit: usize,
    /// A backend call running longer than this is treated as failed
    pub query_timeout: Duration,
    /// Clear the sink when a query starts instead of showing stale rows
    pub clear_before_query: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            poll_interval: Duration::from_millis(50),
            result_limit: DEFAULT_RESULT_LIMIT,
            query_timeout: Duration::from_secs(5),
            clear_before_query: true,
        }
    }
}

/// Counters since the coordinator was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Cycles spawned (each holds the in-flight slot once)
    pub cycles: u64,
    /// Backend calls dispatched
    pub queries: u64,
    /// Batches handed to the sink
    pub published: u64,
    /// Results dropped because the term moved on during the query
    pub stale_discarded: u64,
    /// Failed or timed-out queries reported to the sink
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    cycles: AtomicU64,
    queries: AtomicU64,
    published: AtomicU64,
    stale_discarded: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    term: ArcSwap<String>,
    debouncer: Mutex<Debouncer>,
    cycle: Arc<CycleState>,
    backend: Arc<dyn SearchBackend>,
    sink: Arc<dyn ResultSink>,
    options: CoordinatorOptions,
    shutdown: CancellationToken,
    counters: Counters,
}

/// Debounced, single-flight, staleness-checked search driver
pub struct SearchCoordinator {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl SearchCoordinator {
    /// Create a coordinator on the current tokio runtime
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        sink: Arc<dyn ResultSink>,
        options: CoordinatorOptions,
    ) -> Result<Self, CoordinatorError> {
        let runtime = Handle::try_current().map_err(|_| CoordinatorError::NoRuntime)?;
        Ok(Self::with_handle(runtime, backend, sink, options))
    }

    /// Create a coordinator whose cycles run on `runtime`
    pub fn with_handle(
        runtime: Handle,
        backend: Arc<dyn SearchBackend>,
        sink: Arc<dyn ResultSink>,
        options: CoordinatorOptions,
    ) -> Self {
        let shared = Shared {
            term: ArcSwap::from_pointee(String::new()),
            debouncer: Mutex::new(Debouncer::new(options.debounce)),
            cycle: Arc::new(CycleState::new()),
            backend,
            sink,
            options,
            shutdown: CancellationToken::new(),
            counters: Counters::default(),
        };

        Self {
            shared: Arc::new(shared),
            runtime,
        }
    }

    /// Request a search for `term`
    ///
    /// Never blocks and never fails: the term replaces any pending one, and a
    /// cycle is started only if none is running.
    pub fn set_search_term(&self, term: impl Into<String>) {
        let term = Arc::new(term.into());
        trace!(term = %term, "search term requested");

        self.shared.debouncer.lock().record_request();
        self.shared.term.store(term);
        self.kick();
    }

    /// Request a search for the current term again (e.g. after a reload)
    pub fn refresh(&self) {
        self.shared.debouncer.lock().record_request();
        self.kick();
    }

    fn kick(&self) {
        if self.shared.shutdown.is_cancelled() {
            return;
        }
        if let Some(guard) = InFlightGuard::try_acquire(&self.shared.cycle) {
            Counters::bump(&self.shared.counters.cycles);
            self.runtime.spawn(drive(Arc::clone(&self.shared), guard));
        }
    }

    /// The latest requested term
    pub fn search_term(&self) -> Arc<String> {
        self.shared.term.load_full()
    }

    pub fn phase(&self) -> Phase {
        self.shared.cycle.phase(&self.shared.term.load())
    }

    /// True from the first request of a cycle until it publishes
    pub fn is_busy(&self) -> bool {
        self.shared.cycle.is_busy()
    }

    pub fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.shared.cycle.subscribe_busy()
    }

    /// Wait until no cycle is running
    pub async fn settle(&self) {
        let mut busy = self.shared.cycle.subscribe_busy();
        let _ = busy.wait_for(|busy| !*busy).await;
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.shared.counters.snapshot()
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.shared.options
    }

    /// Cancel any running cycle; later requests are ignored
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

/// Body of the spawned cycle task
///
/// Busy stays set from the first acquire until the task returns; dropping
/// the guard clears it unless another cycle holds the slot by then.
async fn drive(shared: Arc<Shared>, mut guard: InFlightGuard) {
    loop {
        let settled = shared.run_cycle().await;
        guard.release_slot();

        let Some(settled) = settled else {
            return;
        };
        // A request that landed between the last staleness check and the
        // release found the slot taken and did not spawn a cycle.
        if *shared.term.load_full() == *settled {
            return;
        }
        if !guard.reacquire() {
            return;
        }
        debug!("term changed during release, continuing");
        Counters::bump(&shared.counters.cycles);
    }
}

impl Shared {
    /// Debounce, query and re-check until a result is accepted
    ///
    /// Returns the term that was published, or `None` when cancelled.
    async fn run_cycle(&self) -> Option<Arc<String>> {
        loop {
            self.cycle.set_phase(Phase::Debouncing);
            if !self.debounce().await {
                debug!("cycle cancelled while debouncing");
                return None;
            }

            let active = self.term.load_full();
            self.cycle.begin_query(Arc::clone(&active));
            if self.options.clear_before_query {
                self.sink.clear();
            }

            Counters::bump(&self.counters.queries);
            debug!(term = %active, "dispatching query");
            let query = timeout(
                self.options.query_timeout,
                self.backend.search(&active, self.options.result_limit),
            );
            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!(term = %active, "cycle cancelled while querying");
                    return None;
                }
                result = query => result.unwrap_or(Err(QueryError::Timeout(self.options.query_timeout))),
            };

            let current = self.term.load_full();
            if *current != *active {
                Counters::bump(&self.counters.stale_discarded);
                debug!(term = %active, current = %current, "stale result discarded");
                continue;
            }

            match outcome {
                Ok(records) => {
                    Counters::bump(&self.counters.published);
                    debug!(term = %active, hits = records.len(), "publishing results");
                    self.sink.replace(ResultBatch::new(Arc::clone(&active), records));
                }
                Err(error) => {
                    Counters::bump(&self.counters.failures);
                    warn!(term = %active, %error, "search failed");
                    self.sink.fail(&active, &error);
                }
            }
            return Some(active);
        }
    }

    /// Poll until the debounce deadline has passed; false if cancelled
    async fn debounce(&self) -> bool {
        loop {
            if self.debouncer.lock().is_ready() {
                return true;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return false,
                _ = sleep(self.options.poll_interval) => {}
            }
        }
    }
}
