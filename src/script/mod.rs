//! Script Generator: asks the provider to author a scraping program.
//!
//! The result is cached for the lifetime of the generator after the first
//! successful generation; later calls hand back the same `Arc` until a
//! forced regeneration replaces it. Failures produce a sentinel script that
//! is returned to the caller but never cached, so the next call tries again.
//!
//! `code` is opaque text. Nothing here parses or runs it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::analytics::events::{EventKind, EventLog, ProviderEvent, Trigger};
use crate::llm::validation::parse_generated_script;
use crate::llm::{Provider, classify_failure, prompts};
use crate::stats::FailureKind;

pub const ERROR_CODE: &str = "# Error generating code. Please try again.";
pub const ERROR_EXPLANATION: &str = "An error occurred.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedScript {
    pub code: String,
    pub explanation: String,
    #[serde(default)]
    pub libraries: Vec<String>,
}

impl GeneratedScript {
    /// The placeholder returned when generation fails.
    pub fn failed() -> Self {
        Self {
            code: ERROR_CODE.to_string(),
            explanation: ERROR_EXPLANATION.to_string(),
            libraries: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.code == ERROR_CODE
    }
}

pub struct ScriptGenerator {
    provider: Option<Arc<dyn Provider>>,
    cache: Mutex<Option<Arc<GeneratedScript>>>,
    /// Most recent outcome, failures included. Display only.
    latest: Mutex<Option<Arc<GeneratedScript>>>,
    /// Serializes generations so concurrent first requests make one call.
    generation: Mutex<()>,
    generating: AtomicBool,
    /// A background generation has been claimed but may not have started.
    pending: AtomicBool,
    events: EventLog,
}

impl ScriptGenerator {
    pub fn new(provider: Option<Arc<dyn Provider>>) -> Self {
        Self {
            provider,
            cache: Mutex::new(None),
            latest: Mutex::new(None),
            generation: Mutex::new(()),
            generating: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            events: EventLog::disabled(),
        }
    }

    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// The cached script, if one has been generated.
    pub fn cached(&self) -> Option<Arc<GeneratedScript>> {
        self.lock_cache().clone()
    }

    /// The last generated script, or the failure sentinel if the last
    /// attempt failed.
    pub fn latest(&self) -> Option<Arc<GeneratedScript>> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst) || self.pending.load(Ordering::SeqCst)
    }

    /// Generate on a new thread. Returns `None` without spawning when a
    /// background generation is already claimed; the claim is taken before
    /// this returns.
    pub fn spawn_generation(
        self: &Arc<Self>,
        trigger: Trigger,
        force: bool,
    ) -> Option<JoinHandle<Arc<GeneratedScript>>> {
        if self
            .pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        let generator = self.clone();
        Some(thread::spawn(move || {
            let script = generator.generate_for(trigger, force);
            generator.pending.store(false, Ordering::SeqCst);
            script
        }))
    }

    /// Return the cached script, generating it on first use.
    pub fn generate(&self) -> Arc<GeneratedScript> {
        self.generate_for(Trigger::Manual, false)
    }

    /// Discard the cache and generate a fresh script.
    pub fn regenerate(&self) -> Arc<GeneratedScript> {
        self.generate_for(Trigger::Manual, true)
    }

    pub fn generate_for(&self, trigger: Trigger, force: bool) -> Arc<GeneratedScript> {
        if !force && let Some(script) = self.cached() {
            return script;
        }

        let _guard = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have finished while we waited.
        if !force && let Some(script) = self.cached() {
            return script;
        }

        self.generating.store(true, Ordering::SeqCst);
        let start = Instant::now();
        let outcome = self.call_provider();
        let latency_ms = start.elapsed().as_millis() as u64;
        self.generating.store(false, Ordering::SeqCst);

        let script = match outcome {
            Ok(script) => {
                let script = Arc::new(script);
                *self.lock_cache() = Some(script.clone());

                let mut event =
                    ProviderEvent::new(EventKind::Script, trigger, "generated", latency_ms);
                event.records = script.libraries.len();
                self.events.record(&event);
                info!(
                    "generated scraping script ({} libraries)",
                    script.libraries.len()
                );
                script
            }
            Err(kind) => {
                let mut event = ProviderEvent::new(EventKind::Script, trigger, "failed", latency_ms);
                event.failure = Some(kind);
                self.events.record(&event);
                Arc::new(GeneratedScript::failed())
            }
        };
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(script.clone());
        script
    }

    fn call_provider(&self) -> Result<GeneratedScript, FailureKind> {
        let Some(provider) = &self.provider else {
            warn!("no API key configured; cannot generate a script");
            return Err(FailureKind::Provider);
        };

        provider
            .generate(&prompts::script_request())
            .and_then(|text| parse_generated_script(&text))
            .map_err(|e| {
                let kind = classify_failure(&e);
                match kind {
                    FailureKind::RateLimited => warn!("provider quota exceeded generating script: {e:#}"),
                    FailureKind::Provider => error!("error generating script: {e:#}"),
                }
                kind
            })
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<Arc<GeneratedScript>>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use anyhow::{Result, anyhow};

    use super::*;
    use crate::llm::GenerateRequest;

    /// Replies with each canned response in turn and counts calls.
    struct Scripted {
        replies: Mutex<Vec<Result<String>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Provider for Scripted {
        fn generate(&self, request: &GenerateRequest) -> Result<String> {
            assert!(!request.search_grounding);
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(anyhow!("no more replies"));
            }
            replies.remove(0)
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Takes a while to answer, so a spawned generation is still running
    /// when the next request arrives.
    struct Slow {
        calls: AtomicUsize,
    }

    impl Provider for Slow {
        fn generate(&self, _request: &GenerateRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(std::time::Duration::from_millis(100));
            Ok(GOOD.to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    const GOOD: &str = r#"{"code": "import requests\nprint('hi')", "explanation": "Fetches the page.", "libraries": ["requests", "beautifulsoup4"]}"#;

    #[test]
    fn second_call_returns_identical_cached_value() {
        let provider = Scripted::new(vec![Ok(GOOD.to_string())]);
        let generator = ScriptGenerator::new(Some(provider.clone()));

        let first = generator.generate();
        let second = generator.generate();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.libraries, vec!["requests", "beautifulsoup4"]);
    }

    #[test]
    fn regenerate_replaces_cache() {
        let provider = Scripted::new(vec![Ok(GOOD.to_string()), Ok(GOOD.to_string())]);
        let generator = ScriptGenerator::new(Some(provider.clone()));

        let first = generator.generate();
        let second = generator.regenerate();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert!(Arc::ptr_eq(&second, &generator.cached().unwrap()));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_returns_sentinel_and_is_not_cached() {
        let provider = Scripted::new(vec![Err(anyhow!("boom")), Ok(GOOD.to_string())]);
        let generator = ScriptGenerator::new(Some(provider.clone()));

        let failed = generator.generate();
        assert_eq!(*failed, GeneratedScript::failed());
        assert!(failed.is_failure());
        assert!(generator.cached().is_none());
        assert!(generator.latest().unwrap().is_failure());

        let retried = generator.generate();
        assert!(!retried.is_failure());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_code_is_a_failure() {
        let provider = Scripted::new(vec![Ok(
            r#"{"code": "", "explanation": "x", "libraries": []}"#.to_string(),
        )]);
        let generator = ScriptGenerator::new(Some(provider));
        assert!(generator.generate().is_failure());
    }

    #[test]
    fn offline_generator_returns_sentinel() {
        let generator = ScriptGenerator::new(None);
        let script = generator.generate();
        assert_eq!(script.code, ERROR_CODE);
        assert_eq!(script.explanation, ERROR_EXPLANATION);
        assert!(script.libraries.is_empty());
        assert!(!generator.is_generating());
    }

    #[test]
    fn background_generation_is_claimed_before_spawning() {
        let provider = Arc::new(Slow {
            calls: AtomicUsize::new(0),
        });
        let generator = Arc::new(ScriptGenerator::new(Some(provider.clone())));

        let first = generator.spawn_generation(Trigger::Manual, true).unwrap();
        assert!(generator.is_generating());
        assert!(generator.spawn_generation(Trigger::Manual, true).is_none());

        let script = first.join().unwrap();
        assert!(!script.is_failure());
        assert!(!generator.is_generating());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // The claim is released once the thread finishes.
        let again = generator.spawn_generation(Trigger::Manual, true).unwrap();
        again.join().unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn generation_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::at(dir.path().join("events.jsonl"));
        let provider = Scripted::new(vec![Err(anyhow!("429 Too Many Requests")), Ok(GOOD.to_string())]);
        let generator = ScriptGenerator::new(Some(provider)).with_event_log(log.clone());

        generator.generate();
        generator.generate();
        generator.generate();

        let events = log.read_recent(10);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].outcome, "failed");
        assert_eq!(events[0].failure, Some(FailureKind::RateLimited));
        assert_eq!(events[1].outcome, "generated");
        assert_eq!(events[1].records, 2);
    }
}
