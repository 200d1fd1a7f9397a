use std::io::Write;

use log::LevelFilter;

/// Parse a configured level name. Unknown names fall back to `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Install the global diagnostic logger on stderr.
///
/// `RUST_LOG` still refines per-module filters on top of the configured
/// level. Calling this twice is harmless; the second call is ignored.
pub fn init(level: &str) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(parse_level(level));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[worldstats {} {}] {}",
            chrono::Local::now().format("%H:%M:%S"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_handles_variants() {
        assert_eq!(parse_level("warn"), LevelFilter::Warn);
        assert_eq!(parse_level("WARNING"), LevelFilter::Warn);
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }
}
