//! Engine configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_SCAN_GAP_MS: &str = "FLOORSCAN_SCAN_GAP_MS";
pub const ENV_MIN_SCAN_LEN: &str = "FLOORSCAN_MIN_SCAN_LEN";
pub const ENV_COMPOSITE_DELIMITER: &str = "FLOORSCAN_COMPOSITE_DELIMITER";
pub const ENV_REPORT_MISMATCHES: &str = "FLOORSCAN_REPORT_MISMATCHES";

/// Tunables of the scan engine.
///
/// `scan_gap_ms` is a heuristic: keyboard-emulating scanners type much faster than
/// people, but nothing at the hardware level guarantees it. Sites tune it per device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum gap between two keystrokes of one scanner burst.
    pub scan_gap_ms: u64,
    /// Bursts shorter than this are discarded as noise.
    pub min_scan_len: usize,
    /// Separator of `product|lot` composite codes.
    pub composite_delimiter: char,
    /// Publish LOCATION_MISMATCH / ITEM_MISMATCH records for rejected scans.
    pub report_mismatches: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_gap_ms: 100,
            min_scan_len: 3,
            composite_delimiter: '|',
            report_mismatches: true,
        }
    }
}

impl EngineConfig {
    pub fn with_scan_gap_ms(mut self, ms: u64) -> Self {
        self.scan_gap_ms = ms;
        self
    }

    pub fn with_min_scan_len(mut self, len: usize) -> Self {
        self.min_scan_len = len;
        self
    }

    pub fn with_composite_delimiter(mut self, delimiter: char) -> Self {
        self.composite_delimiter = delimiter;
        self
    }

    pub fn with_report_mismatches(mut self, enabled: bool) -> Self {
        self.report_mismatches = enabled;
        self
    }

    /// Build a config from `FLOORSCAN_*` environment variables, keeping defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SCAN_GAP_MS) {
            match raw.trim().parse() {
                Ok(ms) => config.scan_gap_ms = ms,
                Err(_) => warn!(var = ENV_SCAN_GAP_MS, value = %raw, "ignoring unparsable value"),
            }
        }

        if let Some(raw) = lookup(ENV_MIN_SCAN_LEN) {
            match raw.trim().parse() {
                Ok(len) => config.min_scan_len = len,
                Err(_) => warn!(var = ENV_MIN_SCAN_LEN, value = %raw, "ignoring unparsable value"),
            }
        }

        if let Some(raw) = lookup(ENV_COMPOSITE_DELIMITER) {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => config.composite_delimiter = c,
                _ => warn!(
                    var = ENV_COMPOSITE_DELIMITER,
                    value = %raw,
                    "delimiter must be a single character"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_REPORT_MISMATCHES) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.report_mismatches = true,
                "0" | "false" | "no" => config.report_mismatches = false,
                _ => warn!(var = ENV_REPORT_MISMATCHES, value = %raw, "ignoring unparsable value"),
            }
        }

        config
    }

    pub fn scan_gap(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.scan_gap_ms).unwrap_or(i64::MAX))
    }
}
