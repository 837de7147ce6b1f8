//! Location master: the set of bins the site knows about.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use floorscan_core::{ScanError, ScanResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    PickFace,
    Reserve,
    Dock,
    Staging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location_code: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
}

impl Location {
    pub fn new(code: impl Into<String>, zone: impl Into<String>, location_type: LocationType) -> Self {
        Self {
            location_code: code.into(),
            zone: zone.into(),
            location_type,
        }
    }
}

/// Lookup of scanned bin labels, case-insensitive.
///
/// An empty master accepts every code: sites without a loaded master still get free-form
/// putaway and moves.
#[derive(Debug, Clone, Default)]
pub struct LocationMaster {
    by_code: HashMap<String, Location>,
}

impl LocationMaster {
    pub fn new(locations: impl IntoIterator<Item = Location>) -> Self {
        let by_code = locations
            .into_iter()
            .map(|loc| (normalize(&loc.location_code), loc))
            .collect();
        Self { by_code }
    }

    /// A master that accepts any code.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Location> {
        self.by_code.get(&normalize(code))
    }

    /// Resolve a scanned code to its canonical spelling, or reject it.
    pub fn resolve(&self, code: &str) -> ScanResult<String> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ScanError::invalid_location(code));
        }
        if self.is_unrestricted() {
            return Ok(code.to_string());
        }
        self.get(code)
            .map(|loc| loc.location_code.clone())
            .ok_or_else(|| ScanError::invalid_location(code))
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
