/// Gemini `generateContent` REST client.
///
/// Talks to `{base_url}/v1beta/models/{model}:generateContent` with the
/// synchronous `ureq` HTTP client. The API key travels in the
/// `x-goog-api-key` header, never in the URL, so it cannot leak into logs.
///
/// Requests always ask for `application/json` output constrained by a
/// response schema; the stats call additionally enables the `google_search`
/// grounding tool so the numbers come from a fresh search.
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerateRequest, Provider};
use crate::config::schema::ProviderConfig;

// ---------------------------------------------------------------------------
// Request / response types for the Gemini API
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Grounding tool toggle. Serializes as `{"google_search": {}}`.
#[derive(Debug, Serialize)]
struct Tool {
    google_search: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts, if any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous Gemini HTTP client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client from the resolved config.
    ///
    /// Returns `None` when no API key is configured; callers then run
    /// offline on the fallback dataset.
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return None;
        }

        Some(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl Provider for GeminiClient {
    fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let body = build_request_body(request);

        let resp = ureq::post(&self.endpoint())
            .timeout(self.timeout)
            .set("x-goog-api-key", &self.api_key)
            .send_json(&body)
            .context("Gemini generateContent request failed")?;

        let parsed: GenerateContentResponse = resp
            .into_json()
            .context("failed to parse Gemini response envelope")?;

        parsed
            .text()
            .context("Gemini returned no candidate text")
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn build_request_body(request: &GenerateRequest) -> GenerateContentRequest<'_> {
    let tools = if request.search_grounding {
        vec![Tool {
            google_search: Value::Object(Default::default()),
        }]
    } else {
        Vec::new()
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part {
                text: &request.prompt,
            }],
        }],
        tools,
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &request.response_schema,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
