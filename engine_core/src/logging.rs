//! Engine log sink wired behind the `log` facade.
//!
//! Library crates log through `log::{debug, info, warn}`; binaries call
//! [`init`] once to route those records into a replaceable sink. The default
//! sink writes `[level] target: message` lines to stderr.

use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn from_record(level: Level) -> Self {
        match level {
            Level::Error => LogLevel::Error,
            Level::Warn => LogLevel::Warn,
            Level::Info => LogLevel::Info,
            Level::Debug | Level::Trace => LogLevel::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        write!(f, "{}", label)
    }
}

type Sink = Box<dyn Fn(LogLevel, &str) + Send + Sync + 'static>;

fn default_sink(level: LogLevel, message: &str) {
    eprintln!("[{}] {}", level, message);
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn sink_cell() -> &'static Mutex<Sink> {
    static SINK: OnceLock<Mutex<Sink>> = OnceLock::new();
    SINK.get_or_init(|| Mutex::new(Box::new(default_sink)))
}

/// Replaces the active sink. Records already emitted are not replayed.
pub fn set_sink(sink: impl Fn(LogLevel, &str) + Send + Sync + 'static) {
    let mut guard = lock_unpoisoned(sink_cell());
    *guard = Box::new(sink);
}

pub fn reset_sink() {
    set_sink(default_sink);
}

struct EngineLogger;

impl Log for EngineLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("{}: {}", record.target(), record.args());
        let guard = lock_unpoisoned(sink_cell());
        (guard)(LogLevel::from_record(record.level()), &message);
    }

    fn flush(&self) {}
}

static LOGGER: EngineLogger = EngineLogger;

/// Installs the engine logger as the `log` backend. Safe to call more than
/// once; later calls only adjust the level filter.
pub fn init(max_level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(max_level);
}

pub fn parse_level_filter(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn routes_facade_records_into_sink() {
        let captured: Arc<Mutex<Vec<(LogLevel, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_captured = Arc::clone(&captured);
        set_sink(move |level, message| {
            lock_unpoisoned(&sink_captured).push((level, message.to_string()));
        });
        init(LevelFilter::Info);

        log::warn!(target: "probe", "wall probe failed");
        log::debug!(target: "probe", "filtered out");

        let captured = lock_unpoisoned(&captured).clone();
        reset_sink();
        assert_eq!(
            captured,
            vec![(LogLevel::Warn, "probe: wall probe failed".to_string())]
        );
    }

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level_filter(" Warning "), Some(LevelFilter::Warn));
        assert_eq!(parse_level_filter("trace"), Some(LevelFilter::Trace));
        assert_eq!(parse_level_filter("loud"), None);
    }
}
