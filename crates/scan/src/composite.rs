//! `product|lot` composite codes.

use serde::{Deserialize, Serialize};

use floorscan_core::{ScanError, ScanResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeCode {
    pub product_code: String,
    pub lot: Option<String>,
}

/// Split a composite code on `delimiter`.
///
/// `None` when the delimiter does not occur. Exactly one delimiter is allowed and the
/// product segment is mandatory; an empty lot segment is read as "no lot".
pub fn parse(raw: &str, delimiter: char) -> Option<ScanResult<CompositeCode>> {
    let (product, lot) = raw.trim().split_once(delimiter)?;

    if lot.contains(delimiter) {
        return Some(Err(ScanError::MalformedComposite(format!(
            "more than one '{delimiter}' in {raw}"
        ))));
    }

    let product = product.trim();
    if product.is_empty() {
        return Some(Err(ScanError::MalformedComposite(format!(
            "missing product segment in {raw}"
        ))));
    }

    let lot = lot.trim();
    Some(Ok(CompositeCode {
        product_code: product.to_string(),
        lot: (!lot.is_empty()).then(|| lot.to_string()),
    }))
}
