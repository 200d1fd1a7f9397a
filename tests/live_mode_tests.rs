/// Integration tests for live polling, refresh ordering, and the script
/// generator cache.
///
/// Timing-based tests use short periods and generous bounds so they stay
/// stable on a loaded machine.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use worldstats::llm::{GenerateRequest, Provider};
use worldstats::poll::{PollState, PollingController, View};
use worldstats::script::ScriptGenerator;
use worldstats::stats::fetcher::StatsFetcher;
use worldstats::stats::store::StatStore;
use worldstats::stats::{Category, CategoryPolicy, FetchResult, StatRecord};

/// Counts calls and answers each with a distinct value.
struct Counting {
    calls: AtomicUsize,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for Counting {
    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if request.search_grounding {
            Ok(format!(
                r#"[{{"label": "Births today", "value": "{n}", "category": "population"}}]"#
            ))
        } else {
            Ok(r#"{"code": "print('scrape')", "explanation": "Prints.", "libraries": ["requests"]}"#
                .to_string())
        }
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

fn controller(provider: Arc<Counting>, period_ms: u64) -> (PollingController, Arc<StatStore>) {
    let store = Arc::new(StatStore::new());
    let fetcher = Arc::new(StatsFetcher::new(Some(provider), CategoryPolicy::Drop));
    let ctl = PollingController::new(store.clone(), fetcher, Duration::from_millis(period_ms));
    (ctl, store)
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[test]
fn one_fetch_per_period_while_live_on_dashboard() {
    let provider = Counting::new();
    let (mut ctl, store) = controller(provider.clone(), 50);

    ctl.set_live_mode(true);
    assert_eq!(ctl.state(), PollState::Polling);
    // Enabling live mode waits one period before the first fetch.
    assert_eq!(provider.calls(), 0);

    thread::sleep(Duration::from_millis(275));
    ctl.shutdown();
    thread::sleep(Duration::from_millis(20));

    let calls = provider.calls();
    assert!((4..=6).contains(&calls), "expected ~5 fetches, got {calls}");
    assert_eq!(store.snapshot().records[0].value, calls.to_string());
}

#[test]
fn no_fetch_after_leaving_dashboard() {
    let provider = Counting::new();
    let (mut ctl, _store) = controller(provider.clone(), 30);

    ctl.set_live_mode(true);
    thread::sleep(Duration::from_millis(100));
    ctl.set_view(View::Generator);
    assert_eq!(ctl.state(), PollState::Idle);
    thread::sleep(Duration::from_millis(10));

    let at_cancel = provider.calls();
    thread::sleep(Duration::from_millis(120));
    assert_eq!(provider.calls(), at_cancel);
}

#[test]
fn dropping_controller_stops_polling() {
    let provider = Counting::new();
    {
        let (mut ctl, _store) = controller(provider.clone(), 30);
        ctl.set_live_mode(true);
        thread::sleep(Duration::from_millis(80));
    }
    thread::sleep(Duration::from_millis(10));
    let at_drop = provider.calls();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(provider.calls(), at_drop);
}

#[test]
fn manual_refresh_while_idle() {
    let provider = Counting::new();
    let (ctl, store) = controller(provider.clone(), 10_000);

    assert!(ctl.manual_refresh());
    assert!(ctl.manual_refresh());
    assert_eq!(provider.calls(), 2);
    assert_eq!(store.snapshot().version, 2);
    assert_eq!(store.snapshot().changed, vec!["Births today".to_string()]);
}

// ---------------------------------------------------------------------------
// Refresh ordering
// ---------------------------------------------------------------------------

#[test]
fn slow_refresh_cannot_overwrite_newer_result() {
    let store = Arc::new(StatStore::new());
    let record = |v: &str| FetchResult::live(vec![StatRecord::new("a", v, Category::Water)], 0);

    let slow_ticket = store.begin_refresh();
    let slow_store = store.clone();
    let order = Arc::new(Mutex::new(Vec::new()));
    let slow_order = order.clone();

    let slow = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        let applied = slow_store.complete(slow_ticket, record("stale"));
        slow_order.lock().unwrap().push(("slow", applied));
    });

    let fast_ticket = store.begin_refresh();
    let applied = store.complete(fast_ticket, record("fresh"));
    order.lock().unwrap().push(("fast", applied));
    slow.join().unwrap();

    assert_eq!(
        *order.lock().unwrap(),
        vec![("fast", true), ("slow", false)]
    );
    assert_eq!(store.snapshot().records[0].value, "fresh");
    assert!(!store.is_updating());
}

// ---------------------------------------------------------------------------
// Script generator
// ---------------------------------------------------------------------------

#[test]
fn script_generator_returns_cached_value_on_second_call() {
    let provider = Counting::new();
    let generator = ScriptGenerator::new(Some(provider.clone()));

    let first = generator.generate();
    let second = generator.generate();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(provider.calls(), 1);
    assert_eq!(first.libraries, vec!["requests"]);
}

#[test]
fn concurrent_first_requests_make_one_call() {
    let provider = Counting::new();
    let generator = Arc::new(ScriptGenerator::new(Some(provider.clone())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let generator = generator.clone();
            thread::spawn(move || generator.generate())
        })
        .collect();
    let scripts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(provider.calls(), 1);
    assert!(scripts.iter().all(|s| Arc::ptr_eq(s, &scripts[0])));
}
