//! GS1 element-string decoding (human-readable form).
//!
//! A structured code is a run of `(AI)value` groups, e.g. `(01)SKU2(17)251231(10)LOTA`.
//! Recognized Application Identifiers:
//!
//! | AI | field |
//! |----|-------|
//! | 01 | product code (GTIN) |
//! | 10 | lot / batch |
//! | 17 | expiry, `YYMMDD` |
//! | 21 | serial |
//!
//! Anything else is ignored and reported as skipped.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

static ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d{2,4})\)([^()]+)").expect("GS1 element pattern is valid")
});

pub const AI_PRODUCT: &str = "01";
pub const AI_LOT: &str = "10";
pub const AI_EXPIRY: &str = "17";
pub const AI_SERIAL: &str = "21";

/// Fields recovered from a structured code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedCode {
    pub product_code: Option<String>,
    pub lot: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    UnrecognizedAi,
    MalformedExpiry,
}

/// A group that was present in the code but did not make it into [`DecodedCode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedGroup {
    pub ai: String,
    pub value: String,
    pub reason: SkipReason,
}

impl core::fmt::Display for SkippedGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}){}", self.ai, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gs1Decode {
    pub code: DecodedCode,
    pub skipped: Vec<SkippedGroup>,
}

impl Gs1Decode {
    /// Fewer fields decoded than groups present.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Decode a GS1 element string.
///
/// Returns `None` when no `(AI)value` group is present; the caller then treats the
/// token as plain text.
pub fn decode(raw: &str) -> Option<Gs1Decode> {
    let mut code = DecodedCode::default();
    let mut skipped = Vec::new();
    let mut matched = false;

    for caps in ELEMENT.captures_iter(raw) {
        matched = true;
        let ai = &caps[1];
        let value = caps[2].trim();

        match ai {
            AI_PRODUCT => code.product_code = Some(value.to_string()),
            AI_LOT => code.lot = Some(value.to_string()),
            AI_SERIAL => code.serial = Some(value.to_string()),
            AI_EXPIRY => match parse_yymmdd(value) {
                Some(date) => code.expiry = Some(date),
                None => skipped.push(SkippedGroup {
                    ai: ai.to_string(),
                    value: value.to_string(),
                    reason: SkipReason::MalformedExpiry,
                }),
            },
            _ => skipped.push(SkippedGroup {
                ai: ai.to_string(),
                value: value.to_string(),
                reason: SkipReason::UnrecognizedAi,
            }),
        }
    }

    matched.then_some(Gs1Decode { code, skipped })
}

/// `YYMMDD` in the 2000s. Day `00` means the last day of the month.
fn parse_yymmdd(value: &str) -> Option<NaiveDate> {
    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = 2000 + value[0..2].parse::<i32>().ok()?;
    let month = value[2..4].parse::<u32>().ok()?;
    let day = value[4..6].parse::<u32>().ok()?;

    if day == 0 {
        let first_of_next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month.checked_add(1)?, 1)?
        };
        let last = first_of_next.pred_opt()?;
        return (last.month() == month).then_some(last);
    }

    NaiveDate::from_ymd_opt(year, month, day)
}
