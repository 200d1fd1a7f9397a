//! worldstats: a local dashboard of world statistics fetched from a
//! generative-AI search provider, with a simulated fallback dataset, live
//! polling, CSV export, and an on-demand scraper-script generator.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod export;
pub mod llm;
pub mod poll;
pub mod script;
pub mod stats;
pub mod web;
