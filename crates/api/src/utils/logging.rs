//! Tracing subscriber setup for the binary
//!
//! `RUST_LOG` selects the filter (default `info`). `ADMINHUB_LOG_FORMAT=json`
//! switches to one JSON object per line.

use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::EnvFilter;

const LOG_FORMAT_ENV_VAR: &str = "ADMINHUB_LOG_FORMAT";
const DEFAULT_FILTER: &str = "info";

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse a format name; anything unknown falls back to `Pretty`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV_VAR).map(|value| Self::parse(&value)).unwrap_or_default()
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let format = LogFormat::from_env();

        let result = match format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr)
                .try_init(),
        };

        match result {
            Ok(()) => tracing::debug!(?format, "logging initialized"),
            Err(err) => eprintln!("logging already initialized: {err}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("still logging");
    }
}
