//! CLI command implementations for worldstats.
//!
//! Provides subcommand handlers for:
//! - `worldstats fetch`: one stats fetch, filtered and printed
//! - `worldstats export`: fetch and write the full CSV export
//! - `worldstats script`: generate the Python scraper
//! - `worldstats health`: check config, provider, and event log
//! - `worldstats events`: recent provider calls from the event log
//! - `worldstats config show|init|set|reset`: configuration management

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::analytics::events::{EventLog, ProviderEvent, Trigger};
use crate::config::{self, WorldstatsConfig};
use crate::export;
use crate::llm;
use crate::script::ScriptGenerator;
use crate::stats::fetcher::StatsFetcher;
use crate::stats::filter::{self, CategoryFilter};
use crate::stats::{FetchResult, StatRecord};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

fn fetcher_for(cfg: &WorldstatsConfig) -> StatsFetcher {
    StatsFetcher::new(
        llm::provider_from_config(&cfg.provider),
        cfg.dashboard.category_policy,
    )
    .with_search_grounding(cfg.provider.search_grounding)
    .with_event_log(EventLog::from_config(&cfg.logging))
}

// ---------------------------------------------------------------------------
// worldstats fetch
// ---------------------------------------------------------------------------

/// Fetch once and print the records matching `query` and `category`.
pub fn run_fetch(
    cfg: &WorldstatsConfig,
    query: &str,
    category: &str,
    format: OutputFormat,
) -> Result<()> {
    let filter = CategoryFilter::parse(category).with_context(|| {
        format!(
            "unknown category '{category}' (expected all, other, or one of: {})",
            crate::stats::Category::FIXED.map(|c| c.as_str()).join(", ")
        )
    })?;

    let result = fetcher_for(cfg).fetch_for(Trigger::Cli);
    let visible = filter::filter_records(&result.records, query, filter);

    match format {
        OutputFormat::Json => print_records_json(&result, &visible)?,
        OutputFormat::Csv => {
            let owned: Vec<StatRecord> = visible.into_iter().cloned().collect();
            if let Some(csv) = export::export(&owned) {
                println!("{csv}");
            }
        }
        OutputFormat::Table => print_records_table(&result, &visible),
    }

    Ok(())
}

fn print_records_table(result: &FetchResult, visible: &[&StatRecord]) {
    println!("{}", "World Statistics".bold().cyan());
    println!("{}", "=".repeat(72));
    println!("  {}   TOTAL METRICS: {}", provenance(result), result.records.len());
    println!();

    if visible.is_empty() {
        println!(
            "{}",
            "No metrics match your search or category filter.".yellow()
        );
        return;
    }

    println!("  {:<24} {:<34} Value", "Category", "Label");
    println!("  {}", "-".repeat(70));
    for (i, record) in visible.iter().enumerate() {
        let line = format!(
            "  {} {:<21} {:<34} {}",
            record.category.icon(),
            truncate(&record.category.display_name(), 21),
            truncate(&record.label, 34),
            record.value.bold(),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    if visible.len() < result.records.len() {
        println!();
        println!(
            "  {}",
            format!("{} of {} shown", visible.len(), result.records.len()).dimmed()
        );
    }
}

fn print_records_json(result: &FetchResult, visible: &[&StatRecord]) -> Result<()> {
    let value = serde_json::json!({
        "is_fallback": result.is_fallback,
        "total": result.records.len(),
        "records": visible,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn provenance(result: &FetchResult) -> colored::ColoredString {
    if result.is_fallback {
        "SIMULATED DATA (RATE LIMIT)".yellow().bold()
    } else {
        "LIVE FROM WORLDOMETERS".green().bold()
    }
}

// ---------------------------------------------------------------------------
// worldstats export
// ---------------------------------------------------------------------------

/// Fetch once and write the full collection as CSV.
pub fn run_export(cfg: &WorldstatsConfig, dir: Option<&Path>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir.to_path_buf(),
        None => config::expand_home(&cfg.export.dir).unwrap_or_else(|| PathBuf::from(".")),
    };

    let result = fetcher_for(cfg).fetch_for(Trigger::Cli);
    match export::write_export(&dir, &result.records)? {
        Some(path) => {
            println!(
                "{} Exported {} metrics to {}",
                "✓".green().bold(),
                result.records.len(),
                path.display()
            );
            if result.is_fallback {
                println!("  {}", provenance(&result));
            }
        }
        None => println!("{}", "Nothing to export.".yellow()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// worldstats script
// ---------------------------------------------------------------------------

/// Generate the scraper script, printing it or writing the code to `out`.
pub fn run_script(cfg: &WorldstatsConfig, out: Option<&Path>) -> Result<()> {
    let generator = ScriptGenerator::new(llm::provider_from_config(&cfg.provider))
        .with_event_log(EventLog::from_config(&cfg.logging));
    let script = generator.generate_for(Trigger::Cli, false);

    if script.is_failure() {
        println!("{}", script.code.red());
        println!("  {}", script.explanation.dimmed());
        anyhow::bail!("script generation failed");
    }

    println!("{}", "Python Data Infrastructure".bold().cyan());
    println!("{}", "=".repeat(50));
    println!("{}", script.explanation);
    if !script.libraries.is_empty() {
        println!("  {} {}", "Libraries:".bold(), script.libraries.join(", "));
    }
    println!();

    match out {
        Some(path) => {
            fs::write(path, &script.code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} Script written to {}", "✓".green().bold(), path.display());
        }
        None => println!("{}", script.code),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// worldstats health
// ---------------------------------------------------------------------------

pub fn run_health(cfg: &WorldstatsConfig) -> Result<()> {
    println!("{}", "worldstats Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.worldstats/config.toml found"
        } else {
            "not found (run `worldstats config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".worldstats.toml found"
        } else {
            "none (optional)"
        },
    );

    let has_key = cfg.provider.has_api_key();
    print_health_item(
        "API key",
        has_key,
        if has_key {
            "configured"
        } else {
            "missing (offline: simulated data only)"
        },
    );
    print_health_item("Model", true, &cfg.provider.model);
    print_health_item(
        "Live polling",
        true,
        &format!(
            "every {}s ({})",
            cfg.dashboard.poll_interval_secs,
            if cfg.dashboard.live_mode { "on at start" } else { "off at start" }
        ),
    );
    print_health_item(
        "Category policy",
        true,
        &cfg.dashboard.category_policy.to_string(),
    );

    let events = EventLog::from_config(&cfg.logging);
    match events.path() {
        Some(path) => {
            let exists = path.exists();
            let detail = if exists {
                format!("{} ({} recent entries)", path.display(), events.read_recent(1000).len())
            } else {
                format!("{} (no entries yet)", path.display())
            };
            print_health_item("Event log", exists, &detail);
        }
        None => print_health_item("Event log", false, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// worldstats events
// ---------------------------------------------------------------------------

/// Show the most recent provider events.
pub fn run_events(cfg: &WorldstatsConfig, limit: usize, format: OutputFormat) -> Result<()> {
    let events = EventLog::from_config(&cfg.logging).read_recent(limit);

    if events.is_empty() {
        println!(
            "{}",
            "No events yet. Run `worldstats fetch` or `worldstats serve` first.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&events)?),
        OutputFormat::Csv => print_events_csv(&events),
        OutputFormat::Table => print_events_table(&events),
    }
    Ok(())
}

fn print_events_table(events: &[ProviderEvent]) {
    println!("{}", "Recent Provider Calls".bold().cyan());
    println!(
        "  {:<20} {:<7} {:<8} {:<10} {:<13} {:>7} {:>8}",
        "Time", "Kind", "Trigger", "Outcome", "Failure", "Records", "Latency"
    );
    println!("  {}", "-".repeat(78));

    for event in events {
        let time = event.timestamp.get(..19).unwrap_or(&event.timestamp);
        let failure = event
            .failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<20} {:<7} {:<8} {} {:<13} {:>7} {:>6}ms",
            time,
            format!("{:?}", event.kind).to_lowercase(),
            event.trigger,
            colorize_outcome(&event.outcome),
            failure,
            event.records,
            event.latency_ms,
        );
    }
}

fn print_events_csv(events: &[ProviderEvent]) {
    println!("timestamp,kind,trigger,outcome,failure,records,dropped,latency_ms");
    for e in events {
        println!(
            "{},{},{},{},{},{},{},{}",
            e.timestamp,
            format!("{:?}", e.kind).to_lowercase(),
            e.trigger,
            e.outcome,
            e.failure.map(|f| f.to_string()).unwrap_or_default(),
            e.records,
            e.dropped,
            e.latency_ms
        );
    }
}

/// Colorize an event outcome, padded to a fixed column.
fn colorize_outcome(outcome: &str) -> colored::ColoredString {
    let padded = format!("{outcome:<10}");
    match outcome {
        "live" | "generated" => padded.green(),
        "fallback" => padded.yellow(),
        "failed" => padded.red(),
        _ => padded.normal(),
    }
}

// ---------------------------------------------------------------------------
// worldstats config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective worldstats Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.worldstats/config.toml");
    print_source(project_exists, ".worldstats.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "WORLDSTATS_* / GEMINI_API_KEY / API_KEY environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.worldstats/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Set provider.api_key (or GEMINI_API_KEY) for live data.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    let shown = if key == "provider.api_key" { "********" } else { value };
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), shown);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
