//! StatRecord Store: the single source of truth for the dashboard.
//!
//! The collection is replaced wholesale on every applied refresh; records
//! are never patched individually. Subscribers receive a [`Snapshot`] after
//! every change (records replaced, or the updating indicator flipping).
//!
//! # Refresh sequencing
//!
//! Manual refreshes and poll ticks may overlap. Each refresh takes a
//! monotonically increasing [`RefreshTicket`] when it starts; on completion
//! the result is applied only if no newer refresh has been applied already.
//! A slow request that started first therefore cannot overwrite a fresher
//! one that finished before it.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;

use super::{FetchResult, StatRecord};

/// Proof that a refresh is outstanding. Pass it back to [`StatStore::complete`].
#[derive(Debug)]
#[must_use = "an outstanding refresh keeps the updating indicator on until completed"]
pub struct RefreshTicket {
    seq: u64,
}

impl RefreshTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Point-in-time view of the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub records: Vec<StatRecord>,
    pub is_fallback: bool,
    /// A refresh is outstanding.
    pub updating: bool,
    /// At least one fetch result has been applied.
    pub loaded: bool,
    /// Bumped on every applied result.
    pub version: u64,
    /// RFC 3339 time the current records were applied.
    pub updated_at: Option<String>,
    /// Labels whose value differs from the previous collection.
    pub changed: Vec<String>,
}

type Subscriber = Box<dyn Fn(&Snapshot) + Send + Sync>;

/// Handle returned by [`StatStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct State {
    snapshot: Snapshot,
    in_flight: usize,
    next_seq: u64,
    applied_seq: u64,
}

#[derive(Default)]
pub struct StatStore {
    state: Mutex<State>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscriber: Mutex<u64>,
}

impl StatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock_state().snapshot.clone()
    }

    /// Full record collection, ignoring any view filters.
    pub fn records(&self) -> Vec<StatRecord> {
        self.lock_state().snapshot.records.clone()
    }

    pub fn is_updating(&self) -> bool {
        self.lock_state().in_flight > 0
    }

    /// Register a change listener. Listeners run on the thread that made
    /// the change and must not call back into the store's mutating methods.
    pub fn subscribe(&self, listener: impl Fn(&Snapshot) + Send + Sync + 'static) -> SubscriptionId {
        let id = {
            let mut next = self
                .next_subscriber
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *next += 1;
            SubscriptionId(*next)
        };
        self.lock_subscribers().push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.lock_subscribers().retain(|(sub, _)| *sub != id);
    }

    // -- Refresh lifecycle --

    /// Start a refresh unconditionally (manual refresh).
    pub fn begin_refresh(&self) -> RefreshTicket {
        let (ticket, snapshot) = {
            let mut state = self.lock_state();
            let ticket = Self::issue_ticket(&mut state);
            (ticket, state.snapshot.clone())
        };
        self.notify(&snapshot);
        ticket
    }

    /// Start a refresh only if none is outstanding (poll ticks).
    pub fn try_begin_refresh(&self) -> Option<RefreshTicket> {
        let (ticket, snapshot) = {
            let mut state = self.lock_state();
            if state.in_flight > 0 {
                return None;
            }
            let ticket = Self::issue_ticket(&mut state);
            (ticket, state.snapshot.clone())
        };
        self.notify(&snapshot);
        Some(ticket)
    }

    /// Finish a refresh. Returns `true` if the result was applied, `false`
    /// if a newer refresh had already been applied.
    pub fn complete(&self, ticket: RefreshTicket, result: FetchResult) -> bool {
        let (applied, snapshot) = {
            let mut state = self.lock_state();
            state.in_flight = state.in_flight.saturating_sub(1);

            let applied = ticket.seq > state.applied_seq;
            if applied {
                state.applied_seq = ticket.seq;
                let changed = changed_labels(&state.snapshot.records, &result.records);
                let snap = &mut state.snapshot;
                snap.records = result.records;
                snap.is_fallback = result.is_fallback;
                snap.loaded = true;
                snap.version += 1;
                snap.updated_at = Some(Utc::now().to_rfc3339());
                snap.changed = changed;
            } else {
                log::debug!(
                    "discarding stale refresh #{} (already applied #{})",
                    ticket.seq,
                    state.applied_seq
                );
            }
            state.snapshot.updating = state.in_flight > 0;
            (applied, state.snapshot.clone())
        };
        self.notify(&snapshot);
        applied
    }

    /// Give up on a refresh without a result. Clears the updating indicator
    /// if nothing else is outstanding.
    pub fn abandon(&self, ticket: RefreshTicket) {
        let snapshot = {
            let mut state = self.lock_state();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.snapshot.updating = state.in_flight > 0;
            log::debug!("abandoned refresh #{}", ticket.seq);
            state.snapshot.clone()
        };
        self.notify(&snapshot);
    }

    /// Run `fetch` as a refresh and apply its result.
    pub fn refresh_with(&self, fetch: impl FnOnce() -> FetchResult) -> bool {
        let ticket = self.begin_refresh();
        self.complete(ticket, fetch())
    }

    /// Replace the collection directly, as a refresh that has already finished.
    pub fn replace(&self, result: FetchResult) -> bool {
        self.refresh_with(|| result)
    }

    // -- Internal --

    fn issue_ticket(state: &mut State) -> RefreshTicket {
        state.next_seq += 1;
        state.in_flight += 1;
        state.snapshot.updating = true;
        RefreshTicket {
            seq: state.next_seq,
        }
    }

    fn notify(&self, snapshot: &Snapshot) {
        for (_, listener) in self.lock_subscribers().iter() {
            listener(snapshot);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Labels present in both collections whose value changed.
pub fn changed_labels(previous: &[StatRecord], next: &[StatRecord]) -> Vec<String> {
    next.iter()
        .filter(|record| {
            previous
                .iter()
                .any(|old| old.label == record.label && old.value != record.value)
        })
        .map(|record| record.label.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
