//! Scan input handling: keystroke classification and barcode grammars.
//!
//! Pure logic, no IO. Timestamps are supplied by the caller.

pub mod classifier;
pub mod composite;
pub mod gs1;
pub mod input;
pub mod token;

pub use classifier::{Key, KeyEvent, ScanInputClassifier};
pub use composite::CompositeCode;
pub use gs1::{DecodedCode, Gs1Decode, SkipReason, SkippedGroup};
pub use input::{CodeForm, ScanInput};
pub use token::{ScanSource, ScanToken};
