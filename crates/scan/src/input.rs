//! A scan token interpreted against the barcode grammars.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use floorscan_core::{ScanError, ScanResult, codes_match};

use crate::token::{ScanSource, ScanToken};
use crate::{composite, gs1};

/// Which grammar produced the fields of a [`ScanInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeForm {
    Plain,
    Gs1,
    Composite,
}

/// A scan ready for matching: the raw text plus whatever the grammars recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanInput {
    pub raw: String,
    pub source: ScanSource,
    pub form: CodeForm,
    pub product_code: Option<String>,
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub serial: Option<String>,
    /// Non-fatal notices (e.g. `PARTIAL_GS1`).
    #[serde(skip)]
    pub warnings: Vec<ScanError>,
}

impl ScanInput {
    /// Interpret a token. Only a malformed composite code is an error.
    pub fn parse(token: &ScanToken, delimiter: char) -> ScanResult<Self> {
        let raw = token.raw.trim().to_string();
        let mut input = Self {
            raw: raw.clone(),
            source: token.source,
            form: CodeForm::Plain,
            product_code: None,
            lot: None,
            expiry: None,
            serial: None,
            warnings: Vec::new(),
        };

        if let Some(decoded) = gs1::decode(&raw) {
            if decoded.is_partial() {
                let skipped: Vec<String> = decoded.skipped.iter().map(|g| g.to_string()).collect();
                warn!(raw = %raw, ?skipped, "partial GS1 decode");
                input.warnings.push(ScanError::PartialGs1 { skipped });
            }
            input.form = CodeForm::Gs1;
            input.product_code = decoded.code.product_code;
            input.lot = decoded.code.lot;
            input.expiry = decoded.code.expiry;
            input.serial = decoded.code.serial;
            return Ok(input);
        }

        if let Some(parsed) = composite::parse(&raw, delimiter) {
            let code = parsed?;
            input.form = CodeForm::Composite;
            input.product_code = Some(code.product_code);
            input.lot = code.lot;
        }

        Ok(input)
    }

    /// Convenience for manual entry and tests.
    pub fn manual(raw: &str) -> Self {
        Self {
            raw: raw.trim().to_string(),
            source: ScanSource::Manual,
            form: CodeForm::Plain,
            product_code: None,
            lot: None,
            expiry: None,
            serial: None,
            warnings: Vec::new(),
        }
    }

    /// The code to compare against a product: the decoded product if any, else the raw text.
    pub fn product_text(&self) -> &str {
        self.product_code.as_deref().unwrap_or(&self.raw)
    }

    /// The code to compare against a lot: the decoded lot if any, else the raw text.
    pub fn lot_text(&self) -> &str {
        self.lot.as_deref().unwrap_or(&self.raw)
    }

    pub fn matches_product(&self, product_code: &str) -> bool {
        codes_match(self.product_text(), product_code)
    }

    /// Location codes are always plain labels.
    pub fn matches_location(&self, location_code: &str) -> bool {
        codes_match(&self.raw, location_code)
    }

    pub fn is_structured(&self) -> bool {
        self.form != CodeForm::Plain
    }
}
