//! Cycle phase and the single-flight guard

use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::watch;

/// Where the coordinator is in its debounce/query cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Debouncing = 1,
    Querying = 2,
    /// Querying, and a newer term has arrived since the query started
    QueryingStale = 3,
}

impl Phase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Phase::Debouncing,
            2 => Phase::Querying,
            3 => Phase::QueryingStale,
            _ => Phase::Idle,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Debouncing => "debouncing",
            Phase::Querying => "querying",
            Phase::QueryingStale => "querying (stale)",
        };
        f.write_str(label)
    }
}

/// Shared in-flight flag, phase, active term and busy indicator
pub(crate) struct CycleState {
    in_flight: AtomicBool,
    phase: AtomicU8,
    /// Term of the query currently executing
    active: ArcSwapOption<String>,
    busy: watch::Sender<bool>,
}

impl CycleState {
    pub(crate) fn new() -> Self {
        let (busy, _) = watch::channel(false);
        Self {
            in_flight: AtomicBool::new(false),
            phase: AtomicU8::new(Phase::Idle as u8),
            active: ArcSwapOption::empty(),
            busy,
        }
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Enter `Querying` for `term`
    pub(crate) fn begin_query(&self, term: Arc<String>) {
        self.active.store(Some(term));
        self.set_phase(Phase::Querying);
    }

    /// Current phase; `Querying` turns into `QueryingStale` once `current`
    /// differs from the term being queried
    pub(crate) fn phase(&self, current: &str) -> Phase {
        match Phase::from_u8(self.phase.load(Ordering::Acquire)) {
            Phase::Querying => match self.active.load().as_deref() {
                Some(active) if active.as_str() != current => Phase::QueryingStale,
                _ => Phase::Querying,
            },
            other => other,
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub(crate) fn subscribe_busy(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }
}

/// Ownership of the single cycle slot
///
/// Dropping the guard releases the slot and clears busy on every exit path,
/// including cancellation and a cycle future that never got to run. The
/// slot can be opened early with [`release_slot`](Self::release_slot) while
/// busy stays set until the guard is dropped.
pub(crate) struct InFlightGuard {
    state: Arc<CycleState>,
    holds_slot: bool,
}

impl InFlightGuard {
    /// Claim the slot, or `None` if a cycle already holds it
    pub(crate) fn try_acquire(state: &Arc<CycleState>) -> Option<Self> {
        let mut guard = Self {
            state: Arc::clone(state),
            holds_slot: false,
        };
        guard.reacquire().then_some(guard)
    }

    /// Claim the slot again after [`release_slot`](Self::release_slot)
    pub(crate) fn reacquire(&mut self) -> bool {
        if self.holds_slot {
            return true;
        }
        if self
            .state
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.holds_slot = true;
        self.state.busy.send_if_modified(|busy| !std::mem::replace(busy, true));
        true
    }

    /// Open the slot to other cycles; busy is left as it is
    pub(crate) fn release_slot(&mut self) {
        if !self.holds_slot {
            return;
        }
        self.holds_slot = false;
        self.state.set_phase(Phase::Idle);
        self.state.active.store(None);
        self.state.in_flight.store(false, Ordering::Release);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.release_slot();
        // Checked under the channel lock: an owner that took the slot first
        // has sent (or is about to send) `true`, which must not be undone
        let state = &self.state;
        state.busy.send_if_modified(|busy| {
            if state.in_flight.load(Ordering::Acquire) {
                return false;
            }
            std::mem::replace(busy, false)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive() {
        let state = Arc::new(CycleState::new());

        let guard = InFlightGuard::try_acquire(&state).unwrap();
        assert!(state.is_busy());
        assert!(InFlightGuard::try_acquire(&state).is_none());

        drop(guard);
        assert!(!state.is_busy());
        assert!(InFlightGuard::try_acquire(&state).is_some());
    }

    #[test]
    fn test_release_resets_phase() {
        let state = Arc::new(CycleState::new());
        let guard = InFlightGuard::try_acquire(&state).unwrap();
        state.begin_query(Arc::new("M".to_string()));
        assert_eq!(state.phase("M"), Phase::Querying);

        drop(guard);
        assert_eq!(state.phase("M"), Phase::Idle);
    }

    #[test]
    fn test_stale_phase_is_derived() {
        let state = CycleState::new();
        state.begin_query(Arc::new("M".to_string()));

        assert_eq!(state.phase("M"), Phase::Querying);
        assert_eq!(state.phase("Mi"), Phase::QueryingStale);

        state.set_phase(Phase::Debouncing);
        assert_eq!(state.phase("Mi"), Phase::Debouncing);
    }

    #[test]
    fn test_busy_held_across_release_and_reacquire() {
        let state = Arc::new(CycleState::new());
        let mut rx = state.subscribe_busy();
        let mut guard = InFlightGuard::try_acquire(&state).unwrap();
        assert!(*rx.borrow_and_update());

        guard.release_slot();
        assert!(state.is_busy());
        assert!(!rx.has_changed().unwrap());

        assert!(guard.reacquire());
        assert!(InFlightGuard::try_acquire(&state).is_none());
        assert!(!rx.has_changed().unwrap());

        drop(guard);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_released_guard_leaves_new_owner_busy() {
        let state = Arc::new(CycleState::new());
        let mut first = InFlightGuard::try_acquire(&state).unwrap();
        first.release_slot();

        let second = InFlightGuard::try_acquire(&state).unwrap();
        assert!(!first.reacquire());
        drop(first);
        assert!(state.is_busy());

        drop(second);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_busy_subscription() {
        let state = Arc::new(CycleState::new());
        let mut rx = state.subscribe_busy();
        assert!(!*rx.borrow_and_update());

        let guard = InFlightGuard::try_acquire(&state).unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());

        drop(guard);
        assert!(!*rx.borrow());
        assert_eq!(Phase::QueryingStale.to_string(), "querying (stale)");
    }
}
