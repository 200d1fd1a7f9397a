//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to an API endpoint and returns a
//! `Response<Cursor<Vec<u8>>>` with JSON content (CSV for the export).

use std::io::Cursor;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Response, StatusCode};
use url::form_urlencoded;

use crate::analytics::events::{ProviderEvent, Trigger};
use crate::config::{self, WorldstatsConfig};
use crate::export;
use crate::poll::{PollState, View};
use crate::script::GeneratedScript;
use crate::stats::filter::{self, CategoryFilter};
use crate::stats::{Category, StatRecord};

use super::state::AppState;
use super::{bad_request, content_type_json};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

/// Dashboard view: the visible subset plus everything the header shows.
#[derive(Serialize)]
struct StatsResponse {
    records: Vec<RecordResponse>,
    /// Size of the full collection, ignoring filters.
    total: usize,
    options: Vec<CategoryOption>,
    query: String,
    category: &'static str,
    is_fallback: bool,
    updating: bool,
    loaded: bool,
    version: u64,
    updated_at: Option<String>,
    live: bool,
    view: View,
    poll_state: PollState,
    poll_interval_secs: u64,
}

#[derive(Serialize)]
struct RecordResponse {
    label: String,
    value: String,
    category: Category,
    category_name: String,
    icon: &'static str,
    changed: bool,
}

#[derive(Serialize)]
struct CategoryOption {
    value: &'static str,
    label: String,
}

#[derive(Serialize)]
struct ModeResponse {
    live: bool,
    view: View,
    poll_state: PollState,
}

#[derive(Deserialize)]
struct LiveRequest {
    enabled: bool,
}

#[derive(Deserialize)]
struct ViewRequest {
    view: String,
}

/// `generating` while a call is running, then `ready` or `failed`.
#[derive(Serialize)]
struct ScriptResponse {
    status: &'static str,
    script: Option<GeneratedScript>,
}

#[derive(Serialize)]
struct ConfigResponse {
    config: WorldstatsConfig,
    toml_text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    provider: String,
    offline: bool,
    config_exists: bool,
    event_log: Option<String>,
    records: usize,
    poll_state: PollState,
    auto_save: bool,
    last_saved: Option<String>,
}

#[derive(Serialize)]
struct EventsResponse {
    events: Vec<ProviderEvent>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// Look up a query parameter, form-urlencoded decoded (`+` is a space).
fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn is_truthy_param(url: &str, name: &str) -> bool {
    query_param(url, name).is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/stats?q=&category=`: visible subset of the store.
pub fn get_stats(state: &AppState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let query = query_param(url, "q").unwrap_or_default();
    let raw_category = query_param(url, "category").unwrap_or_default();
    let Some(category) = CategoryFilter::parse(&raw_category) else {
        return Ok(bad_request(&format!("unknown category '{raw_category}'")));
    };

    let snap = state.store.snapshot();
    let (live, view, poll_state, period) = {
        let ctl = state.controller();
        (ctl.is_live(), ctl.view(), ctl.state(), ctl.period())
    };

    let records = filter::filter_records(&snap.records, &query, category)
        .into_iter()
        .map(|r| record_response(r, &snap.changed))
        .collect();
    let options = filter::category_options(&snap.records)
        .into_iter()
        .map(category_option)
        .collect();

    let resp = StatsResponse {
        records,
        total: snap.records.len(),
        options,
        query,
        category: category.as_str(),
        is_fallback: snap.is_fallback,
        updating: snap.updating,
        loaded: snap.loaded,
        version: snap.version,
        updated_at: snap.updated_at,
        live,
        view,
        poll_state,
        poll_interval_secs: period.as_secs(),
    };

    json_response(&resp)
}

fn record_response(record: &StatRecord, changed: &[String]) -> RecordResponse {
    RecordResponse {
        label: record.label.clone(),
        value: record.value.clone(),
        category: record.category,
        category_name: record.category.display_name(),
        icon: record.category.icon(),
        changed: changed.contains(&record.label),
    }
}

fn category_option(value: &'static str) -> CategoryOption {
    let label = match CategoryFilter::parse(value) {
        Some(CategoryFilter::Only(category)) => category.display_name(),
        _ => value.to_string(),
    };
    CategoryOption { value, label }
}

/// `POST /api/refresh`: start a manual refresh in the background.
pub fn post_refresh(state: &AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    // Detached; the frontend watches `updating` and `version`.
    drop(state.controller().refresh_in_background(Trigger::Manual));
    json_response(&serde_json::json!({ "started": true }))
}

/// `PUT /api/live`: `{ "enabled": bool }`.
pub fn put_live(state: &AppState, body: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let req: LiveRequest =
        serde_json::from_str(body).context("invalid JSON in live mode request")?;
    let mut ctl = state.controller();
    ctl.set_live_mode(req.enabled);
    json_response(&ModeResponse {
        live: ctl.is_live(),
        view: ctl.view(),
        poll_state: ctl.state(),
    })
}

/// `PUT /api/view`: `{ "view": "dashboard" | "generator" }`.
pub fn put_view(state: &AppState, body: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let req: ViewRequest = serde_json::from_str(body).context("invalid JSON in view request")?;
    let Some(view) = View::parse(&req.view) else {
        return Ok(bad_request(&format!("unknown view '{}'", req.view)));
    };

    let mut ctl = state.controller();
    ctl.set_view(view);
    if view == View::Generator && state.generator.latest().is_none() {
        state.generate_script_in_background(false);
    }
    json_response(&ModeResponse {
        live: ctl.is_live(),
        view: ctl.view(),
        poll_state: ctl.state(),
    })
}

/// `GET /api/export`: CSV download of the full collection.
///
/// 204 when there is nothing to export.
pub fn get_export(state: &AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let records = state.store.records();
    let Some(csv) = export::render(&records, chrono::Utc::now()) else {
        return Ok(Response::from_data(Vec::new()).with_status_code(StatusCode(204)));
    };

    let disposition = format!("attachment; filename=\"{}\"", csv.filename);
    let content_type = Header::from_bytes("Content-Type", export::CSV_CONTENT_TYPE)
        .map_err(|_| anyhow::anyhow!("invalid content type header"))?;
    let content_disposition = Header::from_bytes("Content-Disposition", disposition.as_bytes())
        .map_err(|_| anyhow::anyhow!("invalid content disposition header"))?;

    Ok(Response::from_data(csv.content.into_bytes())
        .with_header(content_type)
        .with_header(content_disposition)
        .with_status_code(StatusCode(200)))
}

/// `GET /api/script?force=true`: cached script, generating on first use.
pub fn get_script(state: &AppState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let force = is_truthy_param(url, "force");
    let latest = state.generator.latest();

    if force || latest.is_none() {
        state.generate_script_in_background(force);
    }

    let resp = match latest {
        Some(script) if !force && !state.generator.is_generating() => ScriptResponse {
            status: if script.is_failure() { "failed" } else { "ready" },
            script: Some((*script).clone()),
        },
        _ => ScriptResponse {
            status: "generating",
            script: None,
        },
    };

    json_response(&resp)
}

/// `GET /api/config`: effective configuration with the key masked.
pub fn get_config(state: &AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let config = state.config.redacted();
    let toml_text =
        toml::to_string_pretty(&config).context("failed to serialize effective config")?;
    json_response(&ConfigResponse { config, toml_text })
}

/// `GET /api/health`: provider and background task summary.
pub fn get_health(state: &AppState) -> Result<Response<Cursor<Vec<u8>>>> {
    let config_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);

    let resp = HealthResponse {
        provider: if state.fetcher.is_offline() {
            "offline".to_string()
        } else {
            state.config.provider.model.clone()
        },
        offline: state.fetcher.is_offline(),
        config_exists,
        event_log: state.events.path().map(|p| p.display().to_string()),
        records: state.store.records().len(),
        poll_state: state.controller().state(),
        auto_save: state.auto_save_active(),
        last_saved: state.last_saved(),
    };

    json_response(&resp)
}

/// `GET /api/events?limit=N`: most recent provider events.
pub fn get_events(state: &AppState, url: &str) -> Result<Response<Cursor<Vec<u8>>>> {
    let limit = query_param(url, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);
    json_response(&EventsResponse {
        events: state.events.read_recent(limit),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn state() -> AppState {
        let mut config = WorldstatsConfig::default();
        config.provider.api_key.clear();
        config.logging.enabled = false;
        let state = AppState::new(config, None);
        state.start().join().unwrap();
        state
    }

    fn body_json(resp: Response<Cursor<Vec<u8>>>) -> serde_json::Value {
        let mut text = String::new();
        resp.into_reader().read_to_string(&mut text).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn query_param_decodes_values() {
        let url = "/api/stats?q=births%20today&category=all";
        assert_eq!(query_param(url, "q").as_deref(), Some("births today"));
        assert_eq!(query_param(url, "category").as_deref(), Some("all"));
        assert_eq!(query_param("/api/stats?q=a+b", "q").as_deref(), Some("a b"));
    }

    #[test]
    fn query_param_missing_or_bare() {
        assert_eq!(query_param("/api/stats", "q"), None);
        assert_eq!(query_param("/api/stats?q", "q").as_deref(), Some(""));
        assert_eq!(query_param("/api/stats?x=1", "q"), None);
    }

    #[test]
    fn query_param_keeps_malformed_escapes_and_decodes_multibyte() {
        assert_eq!(query_param("/?q=100%", "q").as_deref(), Some("100%"));
        assert_eq!(query_param("/?q=%zz", "q").as_deref(), Some("%zz"));
        assert_eq!(query_param("/?q=%E2%9D%A4", "q").as_deref(), Some("❤"));
        assert_eq!(query_param("/?cat%65gory=water", "category").as_deref(), Some("water"));
    }

    #[test]
    fn stats_endpoint_filters_visible_records() {
        let state = state();
        let json = body_json(get_stats(&state, "/api/stats?q=tweet&category=all").unwrap());

        assert_eq!(json["total"], 63);
        assert_eq!(json["is_fallback"], true);
        let records = json["records"].as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["label"], "Tweets sent today");
        assert_eq!(records[0]["category"], "society_media");
        assert_eq!(json["options"][0]["value"], "all");
    }

    #[test]
    fn stats_endpoint_rejects_unknown_category() {
        let state = state();
        let resp = get_stats(&state, "/api/stats?category=sports").unwrap();
        assert_eq!(resp.status_code(), StatusCode(400));
    }

    #[test]
    fn live_and_view_drive_poll_state() {
        let state = state();
        let json = body_json(put_live(&state, r#"{"enabled": true}"#).unwrap());
        assert_eq!(json["poll_state"], "polling");

        let json = body_json(put_view(&state, r#"{"view": "generator"}"#).unwrap());
        assert_eq!(json["poll_state"], "idle");
        assert_eq!(json["live"], true);

        let resp = put_view(&state, r#"{"view": "settings"}"#).unwrap();
        assert_eq!(resp.status_code(), StatusCode(400));
        state.shutdown();
    }

    #[test]
    fn export_endpoint_serves_full_collection() {
        let state = state();
        let resp = export_text(get_export(&state).unwrap());
        assert_eq!(resp.lines().count(), 64);
        assert!(resp.starts_with("Timestamp,Category,Label,Value\n"));
    }

    fn export_text(resp: Response<Cursor<Vec<u8>>>) -> String {
        let mut text = String::new();
        resp.into_reader().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn export_endpoint_is_empty_before_load() {
        let mut config = WorldstatsConfig::default();
        config.logging.enabled = false;
        let state = AppState::new(config, None);
        assert_eq!(get_export(&state).unwrap().status_code(), StatusCode(204));
    }

    #[test]
    fn script_endpoint_reports_failure_once_generated() {
        let state = state();
        let json = body_json(get_script(&state, "/api/script").unwrap());
        assert_eq!(json["status"], "generating");

        for _ in 0..100 {
            if state.generator.latest().is_some() && !state.generator.is_generating() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let json = body_json(get_script(&state, "/api/script").unwrap());
        assert_eq!(json["status"], "failed");
        assert_eq!(json["script"]["explanation"], "An error occurred.");
    }

    #[test]
    fn config_endpoint_masks_key() {
        let mut config = WorldstatsConfig::default();
        config.provider.api_key = "secret-key".to_string();
        config.logging.enabled = false;
        let state = AppState::new(config, None);
        let json = body_json(get_config(&state).unwrap());
        assert_ne!(json["config"]["provider"]["api_key"], "secret-key");
        assert!(!json["toml_text"].as_str().unwrap().contains("secret-key"));
    }

    #[test]
    fn health_reports_offline_provider() {
        let state = state();
        let json = body_json(get_health(&state).unwrap());
        assert_eq!(json["provider"], "offline");
        assert_eq!(json["records"], 63);
        assert_eq!(json["poll_state"], "idle");
    }
}
