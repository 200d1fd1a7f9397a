/// Generative-AI provider layer.
///
/// Both outbound calls (the stats lookup and the scraper-script generation)
/// go through the [`Provider`] trait so the fetcher and the generator never
/// touch HTTP directly. The production implementation is
/// [`gemini::GeminiClient`]; tests substitute canned providers.
///
/// # Failure classification
///
/// Every provider error is absorbed by the caller, but rate-limit signals
/// are logged at a lower severity than other failures. [`classify_failure`]
/// inspects the error chain for an HTTP 429 status or the quota markers the
/// provider puts in its messages.
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;
use serde_json::Value;

use crate::config::schema::ProviderConfig;
use crate::stats::FailureKind;

pub mod gemini;
pub mod prompts;
pub mod validation;

/// One generation request: a prompt plus the JSON shape the answer must take.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    /// OpenAPI-style response schema forwarded to the provider.
    pub response_schema: Value,
    /// Ask the provider to ground the answer with web search.
    pub search_grounding: bool,
}

/// A text-generation backend.
///
/// Implementations return the raw response text (expected to be JSON) or an
/// error. They must be shareable across the poller and request threads.
pub trait Provider: Send + Sync {
    fn generate(&self, request: &GenerateRequest) -> Result<String>;

    /// Model name for logs and the health endpoint.
    fn model_name(&self) -> &str;
}

/// The configured provider, or `None` to run offline (no API key).
pub fn provider_from_config(config: &ProviderConfig) -> Option<Arc<dyn Provider>> {
    gemini::GeminiClient::from_config(config).map(|client| Arc::new(client) as Arc<dyn Provider>)
}

/// Decide whether a provider error was a quota/rate-limit signal.
pub fn classify_failure(err: &anyhow::Error) -> FailureKind {
    if is_rate_limit_status(err) {
        return FailureKind::RateLimited;
    }

    let message = format!("{err:#}");
    if RATE_LIMIT_RE.is_match(&message) {
        FailureKind::RateLimited
    } else {
        FailureKind::Provider
    }
}

/// An HTTP 429 from `ureq`, anywhere under the error's context chain.
fn is_rate_limit_status(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ureq::Error>(),
        Some(ureq::Error::Status(429, _))
    )
}

/// Quota markers in provider error text: a bare `429` status, "quota",
/// `RESOURCE_EXHAUSTED`, or "rate limit".
static RATE_LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b429\b|quota|resource_exhausted|rate.?limit")
        .expect("rate-limit regex must compile")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_messages_classify_as_rate_limited() {
        let err = anyhow::anyhow!("You exceeded your current quota");
        assert_eq!(classify_failure(&err), FailureKind::RateLimited);

        let err = anyhow::anyhow!("status 429: RESOURCE_EXHAUSTED");
        assert_eq!(classify_failure(&err), FailureKind::RateLimited);
    }

    #[test]
    fn context_chain_is_searched() {
        let err = anyhow::anyhow!("Too Many Requests (429)").context("Gemini request failed");
        assert_eq!(classify_failure(&err), FailureKind::RateLimited);
    }

    fn status_error(code: u16, text: &str) -> anyhow::Error {
        let resp = ureq::Response::new(code, text, "").unwrap();
        anyhow::Error::new(ureq::Error::Status(code, resp))
            .context("Gemini generateContent request failed")
    }

    #[test]
    fn http_429_status_classifies_as_rate_limited() {
        let err = status_error(429, "Too Many Requests");
        assert!(is_rate_limit_status(&err));
        assert_eq!(classify_failure(&err), FailureKind::RateLimited);
    }

    #[test]
    fn other_http_statuses_classify_as_provider() {
        let err = status_error(503, "Service Unavailable");
        assert!(!is_rate_limit_status(&err));
        assert_eq!(classify_failure(&err), FailureKind::Provider);
    }

    #[test]
    fn other_errors_classify_as_provider() {
        let err = anyhow::anyhow!("connection refused");
        assert_eq!(classify_failure(&err), FailureKind::Provider);

        let err = anyhow::anyhow!("expected value at line 1 column 1");
        assert_eq!(classify_failure(&err), FailureKind::Provider);
    }

    #[test]
    fn numbers_containing_429_are_not_rate_limits() {
        let err = anyhow::anyhow!("unexpected token at offset 14290");
        assert_eq!(classify_failure(&err), FailureKind::Provider);
    }
}
