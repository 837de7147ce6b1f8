//! Tracing/logging initialization.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "FLOORSCAN_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log shipping.
    #[default]
    Json,
    /// Human-readable lines, for a terminal session.
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub default_filter: String,
    pub format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl ObservabilityConfig {
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Defaults, with `FLOORSCAN_LOG_FORMAT=plain` switching to plain text.
    pub fn from_env() -> Self {
        let format = match std::env::var(ENV_LOG_FORMAT) {
            Ok(v) if v.trim().eq_ignore_ascii_case("plain") => LogFormat::Plain,
            _ => LogFormat::Json,
        };
        Self::default().with_format(format)
    }
}

/// Initialize tracing/logging for the process with JSON output.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&ObservabilityConfig::default());
}

pub fn init_with(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // Configurable via RUST_LOG. Stdout belongs to the operator prompt.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init_with(&ObservabilityConfig::default().with_format(LogFormat::Plain));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ObservabilityConfig = serde_json::from_str(r#"{"format": "plain"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Plain);
        assert_eq!(config.default_filter, "info");
    }
}
