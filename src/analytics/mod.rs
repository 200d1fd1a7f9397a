//! Diagnostics and the JSONL event log.
//!
//! - [`logger`]: `log`/`env_logger` setup for human-readable diagnostics
//! - [`events`]: one JSONL line per provider call, for later inspection

pub mod events;
pub mod logger;
