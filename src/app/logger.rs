use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

use crate::Result;

const LEVEL_ENV: &str = "TRAFFICLINK_LOG_LEVEL";
const PATH_ENV: &str = "TRAFFICLINK_LOG_PATH";

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl FromStr for LogLevel {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(()),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Level after applying the environment override.
pub fn effective_level(requested: LogLevel) -> LogLevel {
    std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|s| LogLevel::from_str(&s).ok())
        .unwrap_or(requested)
}

/// Filter for the subscriber. `TRAFFICLINK_LOG_LEVEL` may hold a plain level or
/// full directives such as `trafficlink::serial=trace`.
pub fn build_filter(requested: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from(effective_level(requested)).into())
        .with_env_var(LEVEL_ENV)
        .from_env_lossy()
}

/// Install the global tracing subscriber. Logs go to stderr unless a file is
/// given on the command line or through the environment. Installing twice is
/// harmless; the first subscriber stays.
pub fn init(level: LogLevel, file_path: Option<PathBuf>) -> Result<()> {
    let filter = build_filter(level);
    let path = file_path.or_else(|| std::env::var_os(PATH_ENV).map(PathBuf::from));
    let writer = match path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("trace".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn maps_to_tracing_filters() {
        assert_eq!(LevelFilter::from(LogLevel::Debug), LevelFilter::DEBUG);
        assert!(LogLevel::Error < LogLevel::Trace);
    }

    #[test]
    fn filter_defaults_to_requested_level() {
        if std::env::var_os(LEVEL_ENV).is_some() {
            return;
        }
        let filter = build_filter(LogLevel::Debug);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        let filter = build_filter(LogLevel::Warn);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn init_with_file_sink_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trafficlink.log");
        init(LogLevel::Debug, Some(path.clone())).unwrap();
        assert!(path.exists());
    }
}
