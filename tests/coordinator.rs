//! Behavior of the search coordinator under tokio's paused clock.
//!
//! With `start_paused = true` the clock only moves when every task is idle,
//! so backend delays and debounce polls play out deterministically.

#[path = "fixtures/utils.rs"]
mod utils;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use typeahead::coordinator::{
    CoordinatorOptions, FeedState, Phase, ResultFeed, SearchCoordinator,
};
use typeahead::store::{Record, TextIndexStore};
use utils::{FailingBackend, RecordingBackend, RecordingSink, SinkEvent, airports, store_of};

const DEBOUNCE: Duration = Duration::from_millis(250);
const POLL: Duration = Duration::from_millis(50);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn coordinator(
    backend: Arc<RecordingBackend>,
    sink: Arc<RecordingSink>,
    options: CoordinatorOptions,
) -> SearchCoordinator {
    SearchCoordinator::new(backend, sink, options).unwrap()
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_burst_collapses_into_one_query() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::ZERO));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    for term in ["M", "Mi", "Mia"] {
        coordinator.set_search_term(term);
        sleep(ms(10)).await;
    }
    coordinator.settle().await;

    assert_eq!(backend.terms(), ["Mia"]);
    assert_eq!(
        sink.published(),
        [("Mia".to_string(), names(&["Miami International Airport"]))]
    );
    let stats = coordinator.stats();
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.published, 1);
}

#[tokio::test(start_paused = true)]
async fn test_query_waits_for_debounce_after_last_request() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::ZERO));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    let start = Instant::now();
    coordinator.set_search_term("M");
    coordinator.settle().await;

    let waited = backend.calls()[0].started - start;
    assert!(waited >= DEBOUNCE, "dispatched after {:?}", waited);
    assert!(waited < DEBOUNCE + POLL, "dispatched after {:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn test_new_request_restarts_the_delay() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::ZERO));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    let start = Instant::now();
    coordinator.set_search_term("M");
    sleep(ms(200)).await;
    let last = Instant::now();
    coordinator.set_search_term("Mu");
    coordinator.settle().await;

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].term, "Mu");
    let waited = calls[0].started - last;
    assert!(waited >= DEBOUNCE && waited < DEBOUNCE + POLL, "{:?}", waited);
    assert!(calls[0].started - start >= ms(450));
}

#[tokio::test(start_paused = true)]
async fn test_stale_result_is_never_published() {
    let store = store_of(&["Melbourne", "Miami", "Munich"]);
    let backend =
        Arc::new(RecordingBackend::new(store, Duration::ZERO).with_delay("M", ms(500)));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    coordinator.set_search_term("M");
    // "M" is dispatched at 250ms and runs until 750ms
    sleep(ms(400)).await;
    assert_eq!(coordinator.phase(), Phase::Querying);

    coordinator.set_search_term("Mi");
    assert_eq!(coordinator.phase(), Phase::QueryingStale);
    assert!(coordinator.is_busy());

    coordinator.settle().await;

    assert_eq!(backend.terms(), ["M", "Mi"]);
    assert_eq!(sink.published(), [("Mi".to_string(), names(&["Miami"]))]);
    assert_eq!(
        sink.events(),
        [
            SinkEvent::Clear,
            SinkEvent::Clear,
            SinkEvent::Replace {
                term: "Mi".to_string(),
                names: names(&["Miami"]),
            },
        ]
    );

    let stats = coordinator.stats();
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.queries, 2);
    assert_eq!(stats.stale_discarded, 1);
    assert_eq!(stats.published, 1);
    assert_eq!(coordinator.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_requery_after_stale_skips_elapsed_delay() {
    let store = store_of(&["Melbourne", "Miami"]);
    let backend =
        Arc::new(RecordingBackend::new(store, Duration::ZERO).with_delay("M", ms(500)));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    coordinator.set_search_term("M");
    sleep(ms(400)).await;
    coordinator.set_search_term("Mi");
    coordinator.settle().await;

    // "Mi" was requested at 400ms; its delay ran out while "M" was in flight
    let calls = backend.calls();
    let first_done = calls[0].finished.unwrap();
    assert_eq!(calls[1].started, first_done);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_one_query_in_flight() {
    let backend = Arc::new(RecordingBackend::new(airports(), ms(400)));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    for term in ["A", "Ad", "Ade", "Adel"] {
        coordinator.set_search_term(term);
        sleep(ms(300)).await;
    }
    coordinator.settle().await;

    assert_eq!(backend.max_concurrent(), 1);
    assert_eq!(backend.terms(), ["A", "Ade", "Adel"]);
    assert_eq!(
        sink.published(),
        [("Adel".to_string(), names(&["Adelaide Airport"]))]
    );

    let calls = backend.calls();
    for pair in calls.windows(2) {
        assert!(pair[1].started >= pair[0].finished.unwrap());
    }
}

#[tokio::test(start_paused = true)]
async fn test_published_batch_matches_current_term() {
    let backend = Arc::new(RecordingBackend::new(airports(), ms(120)));
    let feed = Arc::new(ResultFeed::new());
    let coordinator =
        SearchCoordinator::new(backend.clone(), feed.clone(), CoordinatorOptions::default())
            .unwrap();
    let mut rx = feed.subscribe();

    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while rx.changed().await.is_ok() {
            if let FeedState::Ready(batch) = &*rx.borrow_and_update() {
                seen.push(batch.term.to_string());
            }
        }
        seen
    });

    for (i, term) in ["S", "Sy", "Syd", "M", "Ma"].into_iter().enumerate() {
        coordinator.set_search_term(term);
        sleep(ms(100 + 70 * i as u64)).await;
    }
    coordinator.settle().await;

    let current = coordinator.search_term();
    let snapshot = feed.snapshot();
    match &snapshot {
        FeedState::Ready(batch) => assert_eq!(batch.term, current),
        other => panic!("expected results, got {:?}", other),
    }
    assert_eq!(snapshot.names(), ["Manchester Airport"]);

    drop(coordinator);
    drop(feed);
    let seen = watcher.await.unwrap();
    assert_eq!(seen.last().map(String::as_str), Some("Ma"));
}

#[tokio::test(start_paused = true)]
async fn test_failure_is_published_and_releases_busy() {
    let backend = Arc::new(FailingBackend { delay: ms(20) });
    let sink = Arc::new(RecordingSink::default());
    let coordinator =
        SearchCoordinator::new(backend, sink.clone(), CoordinatorOptions::default()).unwrap();

    coordinator.set_search_term("M");
    coordinator.settle().await;

    assert!(!coordinator.is_busy());
    assert_eq!(
        sink.events(),
        [
            SinkEvent::Clear,
            SinkEvent::Fail {
                term: "M".to_string()
            }
        ]
    );
    assert_eq!(coordinator.stats().failures, 1);

    // A failed cycle does not block the next one
    coordinator.set_search_term("Mi");
    coordinator.settle().await;
    assert_eq!(coordinator.stats().cycles, 2);
    assert_eq!(coordinator.stats().failures, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_query_times_out() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::from_secs(30)));
    let sink = Arc::new(RecordingSink::default());
    let options = CoordinatorOptions {
        query_timeout: Duration::from_secs(1),
        ..Default::default()
    };
    let coordinator = coordinator(backend.clone(), sink.clone(), options);

    let start = Instant::now();
    coordinator.set_search_term("M");
    coordinator.settle().await;

    let elapsed = start.elapsed();
    assert!(elapsed >= DEBOUNCE + Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(
        sink.events().last(),
        Some(&SinkEvent::Fail {
            term: "M".to_string()
        })
    );
    assert_eq!(coordinator.stats().failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_busy_indicator_follows_cycle() {
    let backend = Arc::new(RecordingBackend::new(airports(), ms(100)));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());
    let mut busy = coordinator.subscribe_busy();

    assert!(!*busy.borrow_and_update());
    coordinator.set_search_term("M");
    assert!(*busy.borrow_and_update());

    sleep(ms(100)).await;
    assert_eq!(coordinator.phase(), Phase::Debouncing);
    assert!(coordinator.is_busy());

    busy.wait_for(|b| !*b).await.unwrap();
    assert_eq!(sink.published().len(), 1);
    assert_eq!(coordinator.phase(), Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_running_query() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::from_secs(3)));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    coordinator.set_search_term("M");
    sleep(ms(300)).await;
    assert_eq!(coordinator.phase(), Phase::Querying);

    coordinator.shutdown();
    coordinator.settle().await;

    assert!(!coordinator.is_busy());
    assert!(sink.published().is_empty());

    // Requests after shutdown are ignored
    coordinator.set_search_term("Mi");
    assert!(!coordinator.is_busy());
    assert_eq!(backend.terms(), ["M"]);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_debouncing_cycle() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::ZERO));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());
    let mut busy = coordinator.subscribe_busy();

    coordinator.set_search_term("M");
    sleep(ms(100)).await;
    drop(coordinator);

    busy.wait_for(|b| !*b).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert!(backend.terms().is_empty());
    assert!(sink.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_results_stay_visible_without_clear() {
    let backend = Arc::new(RecordingBackend::new(airports(), ms(50)));
    let sink = Arc::new(RecordingSink::default());
    let options = CoordinatorOptions {
        clear_before_query: false,
        ..Default::default()
    };
    let coordinator = coordinator(backend.clone(), sink.clone(), options);

    coordinator.set_search_term("Mu");
    coordinator.settle().await;
    coordinator.set_search_term("Sy");
    coordinator.settle().await;

    assert!(!sink.events().contains(&SinkEvent::Clear));
    assert_eq!(sink.published().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_precedes_each_query() {
    let backend = Arc::new(RecordingBackend::new(airports(), ms(50)));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    coordinator.set_search_term("Mu");
    coordinator.settle().await;

    let events = sink.timed_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].1, SinkEvent::Clear);
    assert_eq!(events[0].0, backend.calls()[0].started);
    assert_eq!(events[1].0, backend.calls()[0].finished.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_empty_term_lists_first_records() {
    let store = Arc::new(TextIndexStore::default());
    store.load((0..250).rev().map(|i| Record::new(format!("Airport {:03}", i))));
    let backend = Arc::new(RecordingBackend::new(store, Duration::ZERO));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    coordinator.set_search_term("");
    coordinator.settle().await;

    let published = sink.published();
    assert_eq!(published.len(), 1);
    let (term, names) = &published[0];
    assert_eq!(term, "");
    assert_eq!(names.len(), 200);
    assert_eq!(names[0], "Airport 000");
    assert_eq!(names[199], "Airport 199");
}

#[tokio::test(start_paused = true)]
async fn test_repeated_term_is_a_new_request() {
    let backend = Arc::new(RecordingBackend::new(airports(), Duration::ZERO));
    let sink = Arc::new(RecordingSink::default());
    let coordinator = coordinator(backend.clone(), sink.clone(), CoordinatorOptions::default());

    coordinator.set_search_term("Syd");
    coordinator.settle().await;
    coordinator.set_search_term("Syd");
    coordinator.settle().await;

    assert_eq!(backend.terms(), ["Syd", "Syd"]);
    assert_eq!(sink.published().len(), 2);
}
