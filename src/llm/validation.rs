/// Validation of provider responses.
///
/// The provider is asked for schema-constrained JSON, but nothing on the
/// wire guarantees it. Before a response is accepted:
///
/// 1. **Fences stripped**: a ```` ```json ```` wrapper is removed.
/// 2. **Non-empty**: blank text is a failure.
/// 3. **Shape**: the body must parse as the expected JSON shape.
/// 4. **Per-record schema** (stats only): each element needs string
///    `label`, `value` and `category` fields; the category must be in the
///    fixed set or the [`CategoryPolicy`] decides.
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::script::GeneratedScript;
use crate::stats::{Category, CategoryPolicy, StatRecord};

/// Matches a whole-body markdown code fence: ```` ```json\n...\n``` ````.
static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n(.*?)\n?\s*```\s*$")
        .expect("fence regex must compile")
});

/// Records accepted from a stats response, plus how many were rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStats {
    pub records: Vec<StatRecord>,
    pub dropped: usize,
}

/// Remove a markdown code fence around the whole body, if present.
pub fn strip_code_fences(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Parse and validate a stats response body.
///
/// Returns `Err` when the body is empty, is not a JSON array, or yields no
/// usable record; the caller treats all three as a failed fetch.
pub fn parse_stat_records(text: &str, policy: CategoryPolicy) -> Result<ParsedStats> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(anyhow!("provider returned an empty stats payload"));
    }

    let items: Vec<Value> =
        serde_json::from_str(body).context("stats payload is not a JSON array")?;

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        match normalize_record(item, policy) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if records.is_empty() {
        return Err(anyhow!(
            "stats payload contained no valid records ({dropped} rejected)"
        ));
    }

    Ok(ParsedStats { records, dropped })
}

/// Wire shape of one stats element before category validation.
#[derive(Debug, Deserialize)]
struct RawRecord {
    label: String,
    value: Value,
    category: String,
}

fn normalize_record(item: Value, policy: CategoryPolicy) -> Option<StatRecord> {
    let raw: RawRecord = match serde_json::from_value(item) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("rejecting malformed stats record: {e}");
            return None;
        }
    };

    let label = raw.label.trim();
    if label.is_empty() {
        debug!("rejecting stats record with empty label");
        return None;
    }

    // Some models emit bare numbers despite the schema.
    let value = match raw.value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            debug!("rejecting '{label}': unsupported value {other}");
            return None;
        }
    };

    let category = match Category::parse(&raw.category) {
        Some(category) => category,
        None => match policy {
            CategoryPolicy::Drop => {
                warn!(
                    "dropping '{label}': category '{}' is outside the fixed set",
                    raw.category
                );
                return None;
            }
            CategoryPolicy::Coerce => {
                warn!(
                    "coercing '{label}' from category '{}' to 'other'",
                    raw.category
                );
                Category::Other
            }
        },
    };

    Some(StatRecord::new(label, value, category))
}

/// Parse a script-generation response body.
pub fn parse_generated_script(text: &str) -> Result<GeneratedScript> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return Err(anyhow!("No code generated"));
    }

    let script: GeneratedScript =
        serde_json::from_str(body).context("script payload is not a valid object")?;

    if script.code.trim().is_empty() {
        return Err(anyhow!("No code generated"));
    }
    Ok(script)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
