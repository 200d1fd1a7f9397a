//! Stats Fetcher: one provider call per refresh, never an error.
//!
//! Every failure path (no credentials, network error, quota, empty or
//! malformed payload) resolves to the fallback dataset with the provenance
//! flag set. Rate limits are logged as warnings and everything else as
//! errors; the dashboard sees no difference. There is no retry: the caller
//! decides when to try again.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use log::{error, info, warn};

use super::{CategoryPolicy, FailureKind, FetchResult};
use crate::analytics::events::{EventKind, EventLog, ProviderEvent, Trigger};
use crate::llm::validation::parse_stat_records;
use crate::llm::{Provider, classify_failure, prompts};

pub struct StatsFetcher {
    /// `None` runs offline on the fallback dataset.
    provider: Option<Arc<dyn Provider>>,
    policy: CategoryPolicy,
    search_grounding: bool,
    events: EventLog,
}

impl StatsFetcher {
    pub fn new(provider: Option<Arc<dyn Provider>>, policy: CategoryPolicy) -> Self {
        Self {
            provider,
            policy,
            search_grounding: true,
            events: EventLog::disabled(),
        }
    }

    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }

    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.provider.is_none()
    }

    pub fn policy(&self) -> CategoryPolicy {
        self.policy
    }

    /// Fetch the current statistics.
    pub fn fetch(&self) -> FetchResult {
        self.fetch_for(Trigger::Manual)
    }

    /// Fetch, tagging the event log entry with what triggered the refresh.
    pub fn fetch_for(&self, trigger: Trigger) -> FetchResult {
        let start = Instant::now();
        let result = self.fetch_inner();
        let latency_ms = start.elapsed().as_millis() as u64;

        let outcome = if result.is_fallback { "fallback" } else { "live" };
        let mut event = ProviderEvent::new(EventKind::Stats, trigger, outcome, latency_ms);
        event.failure = result.failure;
        event.records = result.records.len();
        event.dropped = result.dropped;
        self.events.record(&event);

        result
    }

    fn fetch_inner(&self) -> FetchResult {
        let Some(provider) = &self.provider else {
            info!("no API key configured; serving fallback data");
            return FetchResult::fallback(FailureKind::Provider);
        };

        // Cache-busting: the time reference makes every request unique.
        let time_reference = Local::now().format("%H:%M:%S").to_string();
        let request = prompts::stats_request(&time_reference, self.search_grounding);

        let parsed = provider
            .generate(&request)
            .and_then(|text| parse_stat_records(&text, self.policy));

        match parsed {
            Ok(parsed) => {
                if parsed.dropped > 0 {
                    warn!(
                        "{} provider records failed validation ({} policy)",
                        parsed.dropped, self.policy
                    );
                }
                FetchResult::live(parsed.records, parsed.dropped)
            }
            Err(e) => {
                let kind = classify_failure(&e);
                match kind {
                    FailureKind::RateLimited => {
                        warn!("provider quota exceeded; switching to fallback data: {e:#}")
                    }
                    FailureKind::Provider => error!("error fetching stats: {e:#}"),
                }
                FetchResult::fallback(kind)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::{Result, anyhow};

    use super::*;
    use crate::llm::GenerateRequest;
    use crate::stats::{Category, fallback};

    struct Canned {
        reply: Mutex<Option<Result<String>>>,
        seen_prompt: Mutex<Option<String>>,
    }

    impl Canned {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Ok(text.to_string()))),
                seen_prompt: Mutex::new(None),
            })
        }

        fn err(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Err(anyhow!(message.to_string())))),
                seen_prompt: Mutex::new(None),
            })
        }
    }

    impl Provider for Canned {
        fn generate(&self, request: &GenerateRequest) -> Result<String> {
            *self.seen_prompt.lock().unwrap() = Some(request.prompt.clone());
            self.reply.lock().unwrap().take().unwrap_or_else(|| Err(anyhow!("exhausted")))
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn successful_fetch_is_live() {
        let provider = Canned::ok(
            r#"[{"label": "Births today", "value": "260,000+", "category": "population"}]"#,
        );
        let fetcher = StatsFetcher::new(Some(provider.clone()), CategoryPolicy::Drop);
        let result = fetcher.fetch();

        assert!(!result.is_fallback);
        assert_eq!(result.failure, None);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].category, Category::Population);

        let prompt = provider.seen_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Current time reference:"));
    }

    #[test]
    fn quota_error_serves_fallback() {
        let fetcher = StatsFetcher::new(
            Some(Canned::err("429 RESOURCE_EXHAUSTED: quota")),
            CategoryPolicy::Drop,
        );
        let result = fetcher.fetch();
        assert!(result.is_fallback);
        assert_eq!(result.failure, Some(FailureKind::RateLimited));
        assert_eq!(result.records, fallback::dataset());
    }

    #[test]
    fn malformed_payload_serves_fallback() {
        let fetcher = StatsFetcher::new(Some(Canned::ok("Sorry, I can't")), CategoryPolicy::Drop);
        let result = fetcher.fetch();
        assert!(result.is_fallback);
        assert_eq!(result.failure, Some(FailureKind::Provider));
        assert_eq!(result.records.len(), fallback::FALLBACK_LEN);
    }

    #[test]
    fn empty_payload_serves_fallback() {
        let fetcher = StatsFetcher::new(Some(Canned::ok("[]")), CategoryPolicy::Coerce);
        assert!(fetcher.fetch().is_fallback);
    }

    #[test]
    fn offline_fetcher_serves_fallback() {
        let fetcher = StatsFetcher::new(None, CategoryPolicy::Drop);
        assert!(fetcher.is_offline());
        let result = fetcher.fetch();
        assert!(result.is_fallback);
        assert_eq!(result.records, fallback::dataset());
    }

    #[test]
    fn dropped_records_are_counted_on_live_results() {
        let provider = Canned::ok(
            r#"[
                {"label": "Births today", "value": "1", "category": "population"},
                {"label": "Goals", "value": "2", "category": "sports"}
            ]"#,
        );
        let result = StatsFetcher::new(Some(provider), CategoryPolicy::Drop).fetch();
        assert!(!result.is_fallback);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.dropped, 1);
    }

    #[test]
    fn fetch_writes_event_log_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::at(dir.path().join("events.jsonl"));
        let fetcher = StatsFetcher::new(Some(Canned::err("quota")), CategoryPolicy::Drop)
            .with_event_log(log.clone());

        fetcher.fetch_for(Trigger::Poll);

        let events = log.read_recent(10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, Trigger::Poll);
        assert_eq!(events[0].outcome, "fallback");
        assert_eq!(events[0].failure, Some(FailureKind::RateLimited));
        assert_eq!(events[0].records, 63);
    }
}
