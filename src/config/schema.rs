/// Configuration schema and defaults for worldstats.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[provider]`, `[dashboard]`, `[export]`, and `[logging]`.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override; the API key is the only value that must be
/// supplied for live data.
use serde::{Deserialize, Serialize};

use crate::stats::CategoryPolicy;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level worldstats configuration.
///
/// Maps directly to the `~/.worldstats/config.toml` and `.worldstats.toml`
/// file schemas. All sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldstatsConfig {
    pub provider: ProviderConfig,
    pub dashboard: DashboardConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [provider]
// ---------------------------------------------------------------------------

/// Generative-AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API credential. Empty means offline: the fallback dataset is served.
    pub api_key: String,
    /// REST base URL.
    pub base_url: String,
    pub model: String,
    /// Request timeout in milliseconds. Grounded lookups are slow.
    pub timeout_ms: u64,
    /// Ground the stats lookup with web search.
    pub search_grounding: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            timeout_ms: 60_000,
            search_grounding: true,
        }
    }
}

impl ProviderConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// [dashboard]
// ---------------------------------------------------------------------------

/// Web dashboard and refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Address the dashboard server binds to.
    pub bind: String,
    /// Live-mode refresh period in seconds.
    pub poll_interval_secs: u64,
    /// Start with live mode enabled.
    pub live_mode: bool,
    /// What to do with provider records outside the fixed category set.
    pub category_policy: CategoryPolicy,
    /// Open the dashboard in the default browser on `serve`.
    pub open_browser: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9747".to_string(),
            poll_interval_secs: 20,
            live_mode: false,
            category_policy: CategoryPolicy::default(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [export]
// ---------------------------------------------------------------------------

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory CSV files are written to.
    pub dir: String,
    /// Periodically write an export while the dashboard server runs.
    pub auto_save: bool,
    pub auto_save_interval_secs: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            auto_save: false,
            auto_save_interval_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Diagnostics and event-log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write the JSONL event log.
    pub enabled: bool,
    /// Event log path. A leading `~/` expands to the home directory.
    pub path: String,
    /// Diagnostic level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.worldstats/events.jsonl".to_string(),
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

impl WorldstatsConfig {
    /// Copy of this config safe to display: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.provider.has_api_key() {
            copy.provider.api_key = "********".to_string();
        }
        copy
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl WorldstatsConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `worldstats config init` to create a starting config file with
    /// all settings documented.
    pub fn default_toml() -> String {
        r#"# worldstats Configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (WORLDSTATS_*, GEMINI_API_KEY, API_KEY)
#   2. Project config (.worldstats.toml in current directory)
#   3. User global config (~/.worldstats/config.toml)
#   4. Built-in defaults

[provider]
api_key = ""                          # Empty = offline, fallback data only
base_url = "https://generativelanguage.googleapis.com"
model = "gemini-3-flash-preview"
timeout_ms = 60000
search_grounding = true

[dashboard]
bind = "127.0.0.1:9747"
poll_interval_secs = 20               # Live-mode refresh period
live_mode = false
category_policy = "drop"              # drop | coerce (unknown categories -> "other")
open_browser = true

[export]
dir = "."
auto_save = false
auto_save_interval_secs = 60

[logging]
enabled = true
path = "~/.worldstats/events.jsonl"
level = "info"                        # error | warn | info | debug | trace
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
