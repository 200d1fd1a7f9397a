use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use worldstats::analytics::logger;
use worldstats::cli::{self, OutputFormat};
use worldstats::config;
use worldstats::web::{self, AppState};

#[derive(Debug, Parser)]
#[command(name = "worldstats")]
#[command(about = "Live world statistics dashboard with simulated fallback data")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web dashboard
    Serve {
        /// Address to bind (overrides dashboard.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Start with live polling enabled
        #[arg(long)]
        live: bool,
        /// Don't open the dashboard in a browser
        #[arg(long)]
        no_open: bool,
    },
    /// Fetch statistics once and print them
    Fetch {
        /// Case-insensitive label search
        #[arg(short, long, default_value = "")]
        query: String,
        /// Category filter: all, other, or a category name
        #[arg(short, long, default_value = "all")]
        category: String,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fetch statistics and write the full CSV export
    Export {
        /// Directory to write into (overrides export.dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Generate the Python scraper script
    Script {
        /// Write the code to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check config, provider credentials, and the event log
    Health,
    /// Show recent provider calls
    Events {
        /// Number of events to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file to ~/.worldstats/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a value in the global config, e.g. `dashboard.poll_interval_secs 30`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let (mut cfg, warnings) = config::load_with_warnings();
    logger::init(&cfg.logging.level);
    for warning in &warnings {
        log::warn!("{warning}");
    }

    match app.command {
        Commands::Serve {
            bind,
            live,
            no_open,
        } => {
            if let Some(bind) = bind {
                cfg.dashboard.bind = bind;
            }
            if live {
                cfg.dashboard.live_mode = true;
            }
            let open = cfg.dashboard.open_browser && !no_open;
            web::serve(AppState::from_config(cfg), open)
        }
        Commands::Fetch {
            query,
            category,
            format,
        } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_fetch(&cfg, &query, &category, fmt)
        }
        Commands::Export { dir } => cli::run_export(&cfg, dir.as_deref()),
        Commands::Script { out } => cli::run_script(&cfg, out.as_deref()),
        Commands::Health => cli::run_health(&cfg),
        Commands::Events { limit, format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_events(&cfg, limit, fmt)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
