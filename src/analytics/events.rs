//! Provider event log: one JSONL line per stats fetch or script generation.
//!
//! Records the outcome of every outbound call, including the fallback
//! decisions that are deliberately hidden from the dashboard user. Rate
//! limits and provider errors show up here with their classification.
//!
//! Log file: `~/.worldstats/events.jsonl` (configurable)

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::expand_home;
use crate::config::schema::LoggingConfig;
use crate::stats::FailureKind;

// ---------------------------------------------------------------------------
// Event entry
// ---------------------------------------------------------------------------

/// Which outbound call an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Stats,
    Script,
}

/// What started a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// First load when the dashboard starts.
    Initial,
    /// User-requested refresh.
    Manual,
    /// Live-mode poll tick.
    Poll,
    /// One-shot CLI command.
    Cli,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Manual => write!(f, "manual"),
            Self::Poll => write!(f, "poll"),
            Self::Cli => write!(f, "cli"),
        }
    }
}

/// A single entry in the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub timestamp: String,
    pub kind: EventKind,
    pub trigger: Trigger,
    /// `"live"`, `"fallback"`, `"generated"`, or `"failed"`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub failure: Option<FailureKind>,
    /// Records served (stats) or libraries listed (script).
    #[serde(default)]
    pub records: usize,
    /// Provider records rejected by validation.
    #[serde(default)]
    pub dropped: usize,
    pub latency_ms: u64,
}

impl ProviderEvent {
    pub fn new(kind: EventKind, trigger: Trigger, outcome: &str, latency_ms: u64) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            kind,
            trigger,
            outcome: outcome.to_string(),
            failure: None,
            records: 0,
            dropped: 0,
            latency_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

/// Append-only JSONL event log. A log without a path records nothing.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self {
            path: expand_home(&config.path),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Append an event. Best-effort: failures are logged and ignored.
    pub fn record(&self, event: &ProviderEvent) {
        if let Err(e) = self.append(event) {
            log::debug!("could not write event log: {e}");
        }
    }

    fn append(&self, event: &ProviderEvent) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let json = serde_json::to_string(event)?;
        writeln!(file, "{json}")?;

        Ok(())
    }

    /// Read the most recent `limit` events, oldest first.
    ///
    /// Silently skips malformed lines. Returns an empty vec if the file does
    /// not exist or cannot be read.
    pub fn read_recent(&self, limit: usize) -> Vec<ProviderEvent> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        let entries: Vec<ProviderEvent> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        let skip = entries.len().saturating_sub(limit);
        entries.into_iter().skip(skip).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
