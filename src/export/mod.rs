//! CSV Exporter.
//!
//! Serializes the *full* record collection, never the filtered view, with
//! one timestamp shared by every row of an export:
//!
//! ```text
//! Timestamp,Category,Label,Value
//! 2026-01-01T12:00:00.000Z,population,"Births today","250,000+"
//! ```
//!
//! Label and value are always quoted with inner quotes doubled; category and
//! timestamp never contain commas or quotes and are written bare. Rows are
//! joined by `\n` with no trailing newline, so N records produce N+1 lines.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::stats::StatRecord;

/// MIME type for downloads.
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

const HEADER: &str = "Timestamp,Category,Label,Value";

/// A rendered export, ready to be written or served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// Render an export captured at `captured_at`. `None` for an empty collection.
pub fn render(records: &[StatRecord], captured_at: DateTime<Utc>) -> Option<CsvExport> {
    if records.is_empty() {
        return None;
    }

    let timestamp = captured_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.to_string());
    for record in records {
        lines.push(format!(
            "{timestamp},{},{},{}",
            record.category.as_str(),
            quote(&record.label),
            quote(&record.value)
        ));
    }

    Some(CsvExport {
        filename: export_filename(captured_at),
        content: lines.join("\n"),
    })
}

/// CSV text for `records` captured at `captured_at`.
pub fn to_csv(records: &[StatRecord], captured_at: DateTime<Utc>) -> Option<String> {
    render(records, captured_at).map(|export| export.content)
}

/// CSV text for `records` captured now.
pub fn export(records: &[StatRecord]) -> Option<String> {
    to_csv(records, Utc::now())
}

/// `worldometers_full_data_<epoch-ms>.csv`
pub fn export_filename(captured_at: DateTime<Utc>) -> String {
    format!(
        "worldometers_full_data_{}.csv",
        captured_at.timestamp_millis()
    )
}

/// Write an export into `dir`. Returns the file path, or `None` (and
/// writes nothing) when the collection is empty.
pub fn write_export(dir: &Path, records: &[StatRecord]) -> Result<Option<PathBuf>> {
    let Some(export) = render(records, Utc::now()) else {
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(&export.filename);
    fs::write(&path, export.content)
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(Some(path))
}

/// Quote a field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
