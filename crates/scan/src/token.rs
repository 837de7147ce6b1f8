use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a token was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanSource {
    Scanner,
    Manual,
}

/// One discrete scan: the text of a burst (or of a manual entry) and when it was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanToken {
    pub raw: String,
    pub captured_at: DateTime<Utc>,
    pub source: ScanSource,
}

impl ScanToken {
    pub fn scanned(raw: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            raw: raw.into(),
            captured_at,
            source: ScanSource::Scanner,
        }
    }

    /// Keyboard fallback: the operator typed the code into the entry field.
    pub fn manual(raw: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            raw: raw.into(),
            captured_at,
            source: ScanSource::Manual,
        }
    }

    pub fn is_scanner(&self) -> bool {
        self.source == ScanSource::Scanner
    }
}
