//! Polling Controller: live-mode refresh on a fixed period.
//!
//! Two states: [`PollState::Idle`] and [`PollState::Polling`]. The controller
//! polls exactly when live mode is on *and* the dashboard is the active view;
//! every other combination, and shutdown, is idle.
//!
//! Each polling session is a [`PollHandle`]: a background thread that sleeps
//! on a cancel channel until the next period boundary. `cancel()` is
//! idempotent and returns without waiting for an in-flight fetch. A tick
//! that took its refresh ticket while `cancel()` was waiting abandons the
//! ticket instead of fetching, so once `cancel()` has returned no further
//! tick fetch is issued. A fetch already running is allowed to finish and
//! apply its result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::analytics::events::Trigger;
use crate::stats::fetcher::StatsFetcher;
use crate::stats::store::StatStore;

/// Default live-mode refresh period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(20);

/// The two dashboard views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Generator,
}

impl View {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Some(Self::Dashboard),
            "generator" => Some(Self::Generator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Idle,
    Polling,
}

// ---------------------------------------------------------------------------
// PollHandle
// ---------------------------------------------------------------------------

/// A cancellable periodic task.
///
/// Every period, `prepare` runs while holding the cancellation gate and
/// decides whether this tick does any work. The stop flag is checked again
/// once `prepare` returns: work prepared while a `cancel()` was waiting goes
/// to `discard` instead of `run`. Keep `prepare` short: `cancel()` waits
/// for it.
///
/// After `cancel()` returns, `run` only executes for a tick that passed its
/// final check before `cancel()` was called.
pub struct PollHandle {
    cancel_tx: Option<Sender<()>>,
    stopped: Arc<AtomicBool>,
    gate: Arc<Mutex<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn spawn<T, P, R>(period: Duration, prepare: P, run: R) -> Self
    where
        T: 'static,
        P: FnMut() -> Option<T> + Send + 'static,
        R: FnMut(T) + Send + 'static,
    {
        Self::spawn_with_discard(period, prepare, run, drop)
    }

    pub fn spawn_with_discard<T, P, R, D>(
        period: Duration,
        mut prepare: P,
        mut run: R,
        mut discard: D,
    ) -> Self
    where
        T: 'static,
        P: FnMut() -> Option<T> + Send + 'static,
        R: FnMut(T) + Send + 'static,
        D: FnMut(T) + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        let stopped = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(Mutex::new(()));
        let (tick_stopped, tick_gate) = (stopped.clone(), gate.clone());

        let thread = thread::spawn(move || {
            let mut next_tick = Instant::now() + period;
            loop {
                let wait = next_tick.saturating_duration_since(Instant::now());
                match cancel_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Cancel signal, or the handle was dropped.
                    _ => break,
                }
                next_tick += period;

                let work = {
                    let _gate = tick_gate.lock().unwrap_or_else(|e| e.into_inner());
                    if tick_stopped.load(Ordering::SeqCst) {
                        break;
                    }
                    prepare()
                };
                if let Some(work) = work {
                    if tick_stopped.load(Ordering::SeqCst) {
                        discard(work);
                        break;
                    }
                    run(work);
                }

                // Skip boundaries missed while `run` was busy.
                let now = Instant::now();
                while next_tick <= now {
                    next_tick += period;
                }
            }
        });

        Self {
            cancel_tx: Some(cancel_tx),
            stopped,
            gate,
            thread: Some(thread),
        }
    }

    /// Stop issuing ticks. Idempotent.
    pub fn cancel(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Wait out a `prepare` in progress; its work will be discarded.
        drop(self.gate.lock().unwrap_or_else(|e| e.into_inner()));
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        // Detach: an in-flight `run` finishes on its own.
        self.thread.take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// PollingController
// ---------------------------------------------------------------------------

pub struct PollingController {
    store: Arc<StatStore>,
    fetcher: Arc<StatsFetcher>,
    period: Duration,
    live: bool,
    view: View,
    handle: Option<PollHandle>,
}

impl PollingController {
    pub fn new(store: Arc<StatStore>, fetcher: Arc<StatsFetcher>, period: Duration) -> Self {
        Self {
            store,
            fetcher,
            period,
            live: false,
            view: View::Dashboard,
            handle: None,
        }
    }

    pub fn state(&self) -> PollState {
        if self.handle.is_some() {
            PollState::Polling
        } else {
            PollState::Idle
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn set_live_mode(&mut self, enabled: bool) {
        self.live = enabled;
        self.reconcile();
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.reconcile();
    }

    /// Stop polling for good. Live mode and view are left as they were.
    pub fn shutdown(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
            info!("live polling stopped (shutdown)");
        }
    }

    /// User-triggered refresh, independent of the polling state.
    ///
    /// Shares the store's updating indicator with poll ticks. Returns
    /// whether the result was applied.
    pub fn manual_refresh(&self) -> bool {
        self.store
            .refresh_with(|| self.fetcher.fetch_for(Trigger::Manual))
    }

    /// Run a refresh on its own thread. The updating indicator is set
    /// before this returns.
    pub fn refresh_in_background(&self, trigger: Trigger) -> JoinHandle<bool> {
        let store = self.store.clone();
        let fetcher = self.fetcher.clone();
        let ticket = store.begin_refresh();
        thread::spawn(move || {
            let result = fetcher.fetch_for(trigger);
            store.complete(ticket, result)
        })
    }

    fn reconcile(&mut self) {
        let should_poll = self.live && self.view == View::Dashboard;
        match (should_poll, self.handle.is_some()) {
            (true, false) => {
                self.handle = Some(self.start());
                info!("live polling started (every {}s)", self.period.as_secs_f64());
            }
            (false, true) => {
                if let Some(mut handle) = self.handle.take() {
                    handle.cancel();
                }
                info!(
                    "live polling stopped (live={}, view={:?})",
                    self.live, self.view
                );
            }
            _ => {}
        }
    }

    fn start(&self) -> PollHandle {
        let store = self.store.clone();
        let tick_store = self.store.clone();
        let discard_store = self.store.clone();
        let fetcher = self.fetcher.clone();

        PollHandle::spawn_with_discard(
            self.period,
            move || {
                let ticket = store.try_begin_refresh();
                if ticket.is_none() {
                    debug!("skipping poll tick: a refresh is already outstanding");
                }
                ticket
            },
            move |ticket| {
                let result = fetcher.fetch_for(Trigger::Poll);
                tick_store.complete(ticket, result);
            },
            move |ticket| discard_store.abandon(ticket),
        )
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::stats::CategoryPolicy;

    fn controller(period_ms: u64) -> PollingController {
        PollingController::new(
            Arc::new(StatStore::new()),
            Arc::new(StatsFetcher::new(None, CategoryPolicy::Drop)),
            Duration::from_millis(period_ms),
        )
    }

    #[test]
    fn idle_until_live_on_dashboard() {
        let mut ctl = controller(10_000);
        assert_eq!(ctl.state(), PollState::Idle);

        ctl.set_view(View::Generator);
        ctl.set_live_mode(true);
        assert_eq!(ctl.state(), PollState::Idle);

        ctl.set_view(View::Dashboard);
        assert_eq!(ctl.state(), PollState::Polling);
    }

    #[test]
    fn leaving_dashboard_or_disabling_live_goes_idle() {
        let mut ctl = controller(10_000);
        ctl.set_live_mode(true);
        assert_eq!(ctl.state(), PollState::Polling);

        ctl.set_view(View::Generator);
        assert_eq!(ctl.state(), PollState::Idle);

        ctl.set_view(View::Dashboard);
        assert_eq!(ctl.state(), PollState::Polling);

        ctl.set_live_mode(false);
        assert_eq!(ctl.state(), PollState::Idle);
    }

    #[test]
    fn shutdown_goes_idle_and_is_repeatable() {
        let mut ctl = controller(10_000);
        ctl.set_live_mode(true);
        ctl.shutdown();
        ctl.shutdown();
        assert_eq!(ctl.state(), PollState::Idle);
        assert!(ctl.is_live());
    }

    #[test]
    fn manual_refresh_applies_in_idle_state() {
        let ctl = controller(10_000);
        assert!(ctl.manual_refresh());
        let snap = ctl.store.snapshot();
        assert!(snap.loaded);
        assert!(snap.is_fallback);
        assert!(!snap.updating);
    }

    #[test]
    fn background_refresh_marks_updating_immediately() {
        let ctl = controller(10_000);
        let worker = ctl.refresh_in_background(Trigger::Initial);
        assert!(ctl.store.snapshot().updating || ctl.store.snapshot().loaded);
        assert!(worker.join().unwrap());
        assert!(!ctl.store.is_updating());
        assert_eq!(ctl.store.records().len(), 63);
    }

    #[test]
    fn polling_fetches_once_per_period() {
        let mut ctl = controller(40);
        ctl.set_live_mode(true);
        thread::sleep(Duration::from_millis(190));
        ctl.shutdown();
        thread::sleep(Duration::from_millis(20));

        let version = ctl.store.snapshot().version;
        assert!((3..=5).contains(&version), "expected ~4 ticks, got {version}");

        thread::sleep(Duration::from_millis(100));
        assert_eq!(ctl.store.snapshot().version, version);
    }

    #[test]
    fn handle_cancel_is_idempotent() {
        let mut handle = PollHandle::spawn(Duration::from_secs(60), || None::<()>, |_| {});
        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn handle_ticks_until_cancelled() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let mut handle = PollHandle::spawn(
            Duration::from_millis(20),
            || Some(()),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        thread::sleep(Duration::from_millis(130));
        handle.cancel();
        // A tick that passed the gate before cancel may still finish.
        thread::sleep(Duration::from_millis(10));
        let at_cancel = ticks.load(Ordering::SeqCst);
        assert!(at_cancel >= 3, "expected several ticks, got {at_cancel}");

        thread::sleep(Duration::from_millis(80));
        assert_eq!(ticks.load(Ordering::SeqCst), at_cancel);
    }

    #[test]
    fn work_prepared_during_cancel_is_discarded() {
        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let ran = Arc::new(AtomicUsize::new(0));
        let discarded = Arc::new(AtomicUsize::new(0));
        let (ran_count, discarded_count) = (ran.clone(), discarded.clone());

        let mut handle = PollHandle::spawn_with_discard(
            Duration::from_millis(10),
            move || {
                let _ = entered_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(2));
                Some(())
            },
            move |_| {
                ran_count.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                discarded_count.fetch_add(1, Ordering::SeqCst);
            },
        );

        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        // `cancel()` sets the stop flag, then waits for `prepare` to finish.
        let canceller = thread::spawn(move || {
            handle.cancel();
            handle
        });
        thread::sleep(Duration::from_millis(30));
        release_tx.send(()).unwrap();
        let handle = canceller.join().unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(handle.is_cancelled());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(discarded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_controller_leaves_store_idle() {
        let mut ctl = controller(20);
        ctl.set_live_mode(true);
        thread::sleep(Duration::from_millis(70));
        ctl.shutdown();
        thread::sleep(Duration::from_millis(30));
        assert!(!ctl.store.is_updating());
    }

    #[test]
    fn view_parse() {
        assert_eq!(View::parse("dashboard"), Some(View::Dashboard));
        assert_eq!(View::parse("Generator"), Some(View::Generator));
        assert_eq!(View::parse("settings"), None);
    }
}
