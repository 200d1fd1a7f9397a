//! Embedded web dashboard for worldstats.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page dashboard with the statistics grid and the script generator
//! - JSON API endpoints for stats, refresh, live mode, export, and the script
//!
//! Launched via `worldstats serve` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;
pub mod state;

use std::io::Cursor;

use anyhow::{Context, Result};
use log::{debug, info};
use tiny_http::{Header, Method, Response, Server, StatusCode};

pub use state::AppState;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the configured address.
///
/// Blocks the current thread. Requests are handled sequentially; fetches and
/// script generations run on their own threads so a slow provider never
/// stalls the request loop.
pub fn serve(state: AppState, open: bool) -> Result<()> {
    let addr = state.config.dashboard.bind.clone();
    let server = Server::http(&addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("worldstats dashboard running at http://{addr}");
    if state.fetcher.is_offline() {
        println!("No API key configured: serving simulated data.");
    }
    println!("Press Ctrl+C to stop.\n");

    // Detached; the dashboard shows the loading state until it lands.
    drop(state.start());

    if open {
        let url = format!("http://{addr}");
        if let Err(e) = open_browser(&url) {
            debug!("could not open browser: {e:#}");
        }
    }

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Read body up-front for methods that carry one
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let result = dispatch(&state, &method, &url, body.as_deref());

        match result {
            Ok(resp) => {
                let _ = request.respond(resp);
            }
            Err(e) => {
                let body = serde_json::json!({ "error": format!("{e:#}") }).to_string();
                let resp = Response::from_data(body.into_bytes())
                    .with_header(content_type_json())
                    .with_status_code(StatusCode(500));
                let _ = request.respond(resp);
            }
        }

        // Brief access log; the frontend polls /api/stats, so keep that quiet.
        if url.starts_with("/api/stats") {
            debug!("{method} {url}");
        } else {
            info!("{method} {url}");
        }
    }

    state.shutdown();
    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
fn dispatch(
    state: &AppState,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<Response<Cursor<Vec<u8>>>> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        // API: Dashboard
        (&Method::Get, "/api/stats") => api::get_stats(state, url),
        (&Method::Post, "/api/refresh") => api::post_refresh(state),
        (&Method::Put, "/api/live") => api::put_live(state, body.unwrap_or("{}")),
        (&Method::Put, "/api/view") => api::put_view(state, body.unwrap_or("{}")),
        (&Method::Get, "/api/export") => api::get_export(state),

        // API: Script generator
        (&Method::Get, "/api/script") => api::get_script(state, url),

        // API: Diagnostics
        (&Method::Get, "/api/config") => api::get_config(state),
        (&Method::Get, "/api/health") => api::get_health(state),
        (&Method::Get, "/api/events") => api::get_events(state, url),

        // 404
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> Response<Cursor<Vec<u8>>> {
    let html = frontend::INDEX_HTML;
    Response::from_data(html.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

/// 404 response.
fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = r#"{"error": "not found"}"#;
    Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json())
        .with_status_code(StatusCode(404))
}

/// 400 response with a JSON error message.
pub(crate) fn bad_request(message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(400))
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldstatsConfig;
    use crate::poll::{PollState, View};

    fn state() -> AppState {
        let mut config = WorldstatsConfig::default();
        config.logging.enabled = false;
        AppState::new(config, None)
    }

    #[test]
    fn dispatch_serves_frontend() {
        let resp = dispatch(&state(), &Method::Get, "/", None).unwrap();
        assert_eq!(resp.status_code(), StatusCode(200));
    }

    #[test]
    fn dispatch_unknown_route_is_404() {
        let resp = dispatch(&state(), &Method::Get, "/api/nope", None).unwrap();
        assert_eq!(resp.status_code(), StatusCode(404));
        let resp = dispatch(&state(), &Method::Delete, "/api/stats", None).unwrap();
        assert_eq!(resp.status_code(), StatusCode(404));
    }

    #[test]
    fn dispatch_bad_json_is_an_error() {
        assert!(dispatch(&state(), &Method::Put, "/api/live", Some("not json")).is_err());
    }

    #[test]
    fn page_load_restores_dashboard_polling() {
        let state = state();
        let put = |body: &str| dispatch(&state, &Method::Put, "/api/view", Some(body)).unwrap();
        dispatch(&state, &Method::Put, "/api/live", Some(r#"{"enabled": true}"#)).unwrap();
        put(r#"{"view": "generator"}"#);
        assert_eq!(state.controller().state(), PollState::Idle);

        // A reload opens on the dashboard and syncs the view before polling stats.
        assert!(frontend::INDEX_HTML.contains("let currentView = 'dashboard';"));
        assert!(frontend::INDEX_HTML.contains("syncView().then(loadStats);"));
        assert!(frontend::INDEX_HTML.contains("await api('PUT', '/api/view', { view: currentView });"));
        put(r#"{"view": "dashboard"}"#);

        assert_eq!(state.controller().state(), PollState::Polling);
        assert_eq!(state.controller().view(), View::Dashboard);
        state.shutdown();
    }

    #[test]
    fn frontend_references_every_endpoint() {
        for endpoint in [
            "/api/stats",
            "/api/refresh",
            "/api/live",
            "/api/view",
            "/api/export",
            "/api/script",
            "/api/health",
        ] {
            assert!(frontend::INDEX_HTML.contains(endpoint), "missing {endpoint}");
        }
    }
}
