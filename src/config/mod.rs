/// Configuration system for worldstats.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: hardcoded in [`schema::WorldstatsConfig::default()`]
/// 2. **User global config**: `~/.worldstats/config.toml`
/// 3. **Project local config**: `.worldstats.toml` in the current working directory
/// 4. **Environment variables**: `WORLDSTATS_*` overrides (highest precedence)
///
/// The API credential may also come from `GEMINI_API_KEY` or `API_KEY`.
///
/// # Usage
///
/// ```rust,ignore
/// use worldstats::config;
///
/// let cfg = config::load();
/// if cfg.provider.has_api_key() {
///     // live data
/// }
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::stats::CategoryPolicy;

pub use schema::WorldstatsConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved worldstats configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. Malformed files are skipped and logged as warnings.
pub fn load() -> WorldstatsConfig {
    let (config, warnings) = load_with_warnings();
    for warning in &warnings {
        log::warn!("{warning}");
    }
    config
}

/// Like [`load`], but hands the diagnostics back instead of logging them.
///
/// `main` uses this because the logger level comes from the config itself.
pub fn load_with_warnings() -> (WorldstatsConfig, Vec<String>) {
    let mut warnings = Vec::new();
    let mut config = WorldstatsConfig::default();

    // Layer 2: user global config (~/.worldstats/config.toml)
    if let Some(global) = read_layer(global_config_path(), &mut warnings) {
        config = global;
    }

    // Layer 3: project local config (.worldstats.toml)
    if let Some(project) = read_layer(project_config_path(), &mut warnings) {
        merge_project(&mut config, project);
    }

    // Layer 4: environment variable overrides
    apply_env_overrides(&mut config);

    (config, warnings)
}

/// Load one TOML config file.
///
/// `Ok(None)` if the file doesn't exist or can't be read; `Err` if it is
/// malformed. A malformed file is never fatal to [`load`]: the dashboard
/// must always come up.
pub fn load_from(path: &Path) -> Result<Option<WorldstatsConfig>> {
    let Ok(content) = fs::read_to_string(path) else {
        return Ok(None);
    };
    let config = toml::from_str(&content)
        .with_context(|| format!("malformed config {}", path.display()))?;
    Ok(Some(config))
}

fn read_layer(path: Option<PathBuf>, warnings: &mut Vec<String>) -> Option<WorldstatsConfig> {
    match load_from(&path?) {
        Ok(config) => config,
        Err(e) => {
            warnings.push(format!("ignoring {e:#}"));
            None
        }
    }
}

/// Apply a project config over the global one.
///
/// The project file is deserialized with defaults for unset keys, so it
/// replaces the base wholesale, except that an API key from the global file
/// survives when the project file leaves it empty. Keys belong in the user's
/// home, not in a checked-in project file.
fn merge_project(base: &mut WorldstatsConfig, project: WorldstatsConfig) {
    let global_key = std::mem::take(&mut base.provider.api_key);
    *base = project;
    if !base.provider.has_api_key() {
        base.provider.api_key = global_key;
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.worldstats/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".worldstats").join("config.toml"))
}

/// Path to the project local config: `.worldstats.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".worldstats.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `WORLDSTATS_API_KEY`, then `GEMINI_API_KEY`, then `API_KEY`: credential
/// - `WORLDSTATS_MODEL`: provider model name
/// - `WORLDSTATS_BASE_URL`: provider endpoint
/// - `WORLDSTATS_TIMEOUT_MS`: provider request timeout
/// - `WORLDSTATS_POLL_SECS`: live-mode refresh period
/// - `WORLDSTATS_BIND`: dashboard bind address
/// - `WORLDSTATS_CATEGORY_POLICY`: `drop` or `coerce`
/// - `WORLDSTATS_LOG`: diagnostic level
fn apply_env_overrides(config: &mut WorldstatsConfig) {
    if let Some(key) = ["WORLDSTATS_API_KEY", "GEMINI_API_KEY", "API_KEY"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
    {
        config.provider.api_key = key;
    }

    if let Ok(val) = std::env::var("WORLDSTATS_MODEL")
        && !val.is_empty()
    {
        config.provider.model = val;
    }
    if let Ok(val) = std::env::var("WORLDSTATS_BASE_URL")
        && !val.is_empty()
    {
        config.provider.base_url = val;
    }
    if let Ok(val) = std::env::var("WORLDSTATS_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.provider.timeout_ms = ms;
    }

    if let Ok(val) = std::env::var("WORLDSTATS_POLL_SECS")
        && let Ok(secs) = val.parse::<u64>()
        && secs > 0
    {
        config.dashboard.poll_interval_secs = secs;
    }
    if let Ok(val) = std::env::var("WORLDSTATS_BIND")
        && !val.is_empty()
    {
        config.dashboard.bind = val;
    }
    if let Ok(val) = std::env::var("WORLDSTATS_CATEGORY_POLICY")
        && let Some(policy) = parse_category_policy(&val)
    {
        config.dashboard.category_policy = policy;
    }

    if let Ok(val) = std::env::var("WORLDSTATS_LOG")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a category policy string.
pub fn parse_category_policy(val: &str) -> Option<CategoryPolicy> {
    match val.trim().to_ascii_lowercase().as_str() {
        "drop" => Some(CategoryPolicy::Drop),
        "coerce" | "other" => Some(CategoryPolicy::Coerce),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.worldstats/config.toml`.
///
/// Creates the `~/.worldstats/` directory if it doesn't exist. Returns an
/// error if the file already exists (use `force = true` to overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.worldstats/ directory")?;
    }

    fs::write(&path, WorldstatsConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Reads the current global config (or defaults), updates the specified key,
/// and writes the result back. Supports dotted keys like `dashboard.live_mode`.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&WorldstatsConfig::default())
            .context("failed to serialize default config")?
    };

    let output = update_toml_text(&content, key, value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Apply one dotted-key update to TOML text and validate the result.
fn update_toml_text(content: &str, key: &str, value: &str) -> Result<String> {
    let mut value_table: toml::Value =
        toml::from_str(content).context("failed to parse config as TOML value")?;

    set_toml_value(&mut value_table, key, value)?;

    let output =
        toml::to_string_pretty(&value_table).context("failed to serialize updated config")?;

    // Reject values the schema cannot load (e.g. an unknown category policy).
    toml::from_str::<WorldstatsConfig>(&output)
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;

    Ok(output)
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("empty config key segment in '{key}'");
    }

    // Navigate to the parent table
    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];

    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    // Parse according to the type of the existing value
    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML, with the key masked.
pub fn show_effective_config() -> Result<String> {
    let config = load().redacted();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
