//! FEFO ranking of the lots stored in a bin.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotCandidate {
    pub lot_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub available_qty: u32,
}

impl LotCandidate {
    pub fn new(lot_number: impl Into<String>, expiry_date: Option<NaiveDate>, available_qty: u32) -> Self {
        Self {
            lot_number: lot_number.into(),
            expiry_date,
            available_qty,
        }
    }
}

/// A candidate as presented to the operator. Only the head of a ranking is recommended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedLot {
    pub candidate: LotCandidate,
    pub recommended: bool,
}

/// Lookup key for the inventory service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LotQuery {
    pub product_code: String,
    pub location_code: String,
}

pub struct LotSelector;

impl LotSelector {
    /// Sort ascending by expiry, lots without expiry last. Stable for equal expiries.
    pub fn fefo_sort(candidates: &mut [LotCandidate]) {
        candidates.sort_by_key(|c| (c.expiry_date.is_none(), c.expiry_date));
    }

    /// FEFO order with the first entry marked as the recommendation.
    pub fn rank(mut candidates: Vec<LotCandidate>) -> Vec<RankedLot> {
        Self::fefo_sort(&mut candidates);
        candidates
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| RankedLot {
                candidate,
                recommended: i == 0,
            })
            .collect()
    }
}
