//! Shared dashboard state: the store, its fetcher, the polling controller,
//! the script generator, and the optional auto-save task.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};

use crate::analytics::events::{EventLog, Trigger};
use crate::config::WorldstatsConfig;
use crate::config::expand_home;
use crate::export;
use crate::llm::{self, Provider};
use crate::poll::{PollHandle, PollingController};
use crate::script::ScriptGenerator;
use crate::stats::fetcher::StatsFetcher;
use crate::stats::store::StatStore;

pub struct AppState {
    pub config: WorldstatsConfig,
    pub store: Arc<StatStore>,
    pub fetcher: Arc<StatsFetcher>,
    pub generator: Arc<ScriptGenerator>,
    pub events: EventLog,
    controller: Mutex<PollingController>,
    auto_save: Mutex<Option<PollHandle>>,
    last_saved: Arc<Mutex<Option<String>>>,
}

impl AppState {
    /// Build the state from config, talking to Gemini when a key is set.
    pub fn from_config(config: WorldstatsConfig) -> Self {
        let provider = llm::provider_from_config(&config.provider);
        Self::new(config, provider)
    }

    pub fn new(config: WorldstatsConfig, provider: Option<Arc<dyn Provider>>) -> Self {
        let events = EventLog::from_config(&config.logging);
        let store = Arc::new(StatStore::new());
        let fetcher = Arc::new(
            StatsFetcher::new(provider.clone(), config.dashboard.category_policy)
                .with_search_grounding(config.provider.search_grounding)
                .with_event_log(events.clone()),
        );
        let generator = Arc::new(ScriptGenerator::new(provider).with_event_log(events.clone()));
        let controller = PollingController::new(
            store.clone(),
            fetcher.clone(),
            Duration::from_secs(config.dashboard.poll_interval_secs.max(1)),
        );

        store.subscribe(|snap| {
            if !snap.updating && snap.loaded {
                debug!(
                    "store v{}: {} records ({}), {} changed",
                    snap.version,
                    snap.records.len(),
                    if snap.is_fallback { "fallback" } else { "live" },
                    snap.changed.len()
                );
            }
        });

        Self {
            config,
            store,
            fetcher,
            generator,
            events,
            controller: Mutex::new(controller),
            auto_save: Mutex::new(None),
            last_saved: Arc::new(Mutex::new(None)),
        }
    }

    /// Kick off the initial load and apply the configured live mode.
    pub fn start(&self) -> JoinHandle<bool> {
        let initial = self.controller().refresh_in_background(Trigger::Initial);
        if self.config.dashboard.live_mode {
            self.controller().set_live_mode(true);
        }
        if self.config.export.auto_save {
            self.start_auto_save();
        }
        initial
    }

    pub fn controller(&self) -> MutexGuard<'_, PollingController> {
        self.controller.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a script generation on its own thread unless one is running.
    pub fn generate_script_in_background(&self, force: bool) {
        // Detached; the frontend polls /api/script.
        drop(self.generator.spawn_generation(Trigger::Manual, force));
    }

    pub fn export_dir(&self) -> PathBuf {
        expand_home(&self.config.export.dir).unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn last_saved(&self) -> Option<String> {
        self.last_saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn auto_save_active(&self) -> bool {
        self.auto_save
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn start_auto_save(&self) {
        let period = Duration::from_secs(self.config.export.auto_save_interval_secs.max(1));
        let store = self.store.clone();
        let dir = self.export_dir();
        let last_saved = self.last_saved.clone();

        let handle = PollHandle::spawn(
            period,
            move || Some(store.records()),
            move |records| match export::write_export(&dir, &records) {
                Ok(Some(path)) => {
                    info!("auto-saved {}", path.display());
                    *last_saved.lock().unwrap_or_else(|e| e.into_inner()) =
                        Some(Local::now().format("%H:%M:%S").to_string());
                }
                Ok(None) => debug!("auto-save skipped: no records yet"),
                Err(e) => warn!("auto-save failed: {e:#}"),
            },
        );

        info!("auto-save every {}s into {}", period.as_secs(), self.export_dir().display());
        *self.auto_save.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop polling and auto-save.
    pub fn shutdown(&self) {
        self.controller().shutdown();
        if let Some(mut handle) = self
            .auto_save
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::poll::PollState;

    fn offline_config(dir: &std::path::Path) -> WorldstatsConfig {
        let mut config = WorldstatsConfig::default();
        config.provider.api_key.clear();
        config.logging.enabled = false;
        config.export.dir = dir.display().to_string();
        config
    }

    #[test]
    fn start_loads_fallback_when_offline() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::from_config(offline_config(dir.path()));
        assert!(state.fetcher.is_offline());

        assert!(state.start().join().unwrap());
        let snap = state.store.snapshot();
        assert!(snap.loaded);
        assert!(snap.is_fallback);
        assert_eq!(snap.records.len(), 63);
        assert_eq!(state.controller().state(), PollState::Idle);
        assert!(!state.auto_save_active());
    }

    #[test]
    fn configured_live_mode_starts_polling() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.dashboard.live_mode = true;
        let state = AppState::new(config, None);

        state.start().join().unwrap();
        assert_eq!(state.controller().state(), PollState::Polling);
        state.shutdown();
        assert_eq!(state.controller().state(), PollState::Idle);
    }

    #[test]
    fn auto_save_writes_exports() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = offline_config(dir.path());
        config.export.auto_save = true;
        config.export.auto_save_interval_secs = 1;
        let state = AppState::new(config, None);

        state.start().join().unwrap();
        assert!(state.auto_save_active());
        thread::sleep(Duration::from_millis(1300));
        state.shutdown();

        assert!(state.last_saved().is_some());
        let written = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(written >= 1);
    }
}
