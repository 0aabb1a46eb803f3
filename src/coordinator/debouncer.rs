//! Request debouncer for the search cycle
//!
//! The window runs from the most recent request: every new request pushes the
//! ready time forward to `last_request + window`, and the cycle proceeds with
//! whatever term is current once that time has passed. Intermediate terms are
//! never queued.

use std::time::Duration;
use tokio::time::Instant;

/// Tracks the time of the latest search request
#[derive(Debug)]
pub(crate) struct Debouncer {
    window: Duration,
    /// Time of the last request (any term)
    last_request: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_request: None,
        }
    }

    /// Note a request at the current time
    pub(crate) fn record_request(&mut self) {
        self.last_request = Some(Instant::now());
    }

    /// Check if the window has elapsed since the last request
    ///
    /// With no request recorded there is nothing to wait for.
    pub(crate) fn is_ready(&self) -> bool {
        self.last_request
            .is_none_or(|last| last.elapsed() >= self.window)
    }
}
