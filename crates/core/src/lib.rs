//! `floorscan-core`: shared building blocks for the scan verification engine.
//!
//! This crate contains **pure** primitives (no IO): identifiers, the operator-facing
//! error taxonomy, operating modes and engine configuration.

pub mod config;
pub mod error;
pub mod id;
pub mod mode;

pub use config::EngineConfig;
pub use error::{ScanError, ScanResult};
pub use id::{OrderId, TaskId};
pub use mode::Mode;

/// Case-insensitive comparison of two scanned codes (bins, products, lots).
///
/// Surrounding whitespace is ignored; scanners commonly append it.
pub fn codes_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
