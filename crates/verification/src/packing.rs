//! Packing verification: every product scan packs one unit of an order line.
//!
//! Composite `product|lot`, GS1 and plain product codes all go through the same entry
//! point.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use floorscan_core::{EngineConfig, OrderId, ScanError, ScanResult, codes_match};
use floorscan_scan::{ScanInput, ScanToken};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackLine {
    pub product_code: String,
    pub required_qty: u32,
    #[serde(default)]
    pub packed_qty: u32,
}

impl PackLine {
    pub fn new(product_code: impl Into<String>, required_qty: u32) -> Self {
        Self {
            product_code: product_code.into(),
            required_qty,
            packed_qty: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.packed_qty >= self.required_qty
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingOrder {
    pub order_id: OrderId,
    pub lines: Vec<PackLine>,
}

impl PackingOrder {
    pub fn new(order_id: OrderId, lines: Vec<PackLine>) -> Self {
        Self { order_id, lines }
    }

    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(PackLine::is_complete)
    }
}

/// Result of one accepted packing scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackOutcome {
    pub order_id: OrderId,
    pub product_code: String,
    pub lot: Option<String>,
    pub packed_qty: u32,
    pub required_qty: u32,
    pub line_complete: bool,
    pub order_complete: bool,
}

#[derive(Debug, Clone)]
pub struct CompositeCodeInterpreter {
    order: PackingOrder,
    delimiter: char,
}

impl CompositeCodeInterpreter {
    pub fn new(order: PackingOrder, config: &EngineConfig) -> Self {
        Self {
            order,
            delimiter: config.composite_delimiter,
        }
    }

    pub fn order(&self) -> &PackingOrder {
        &self.order
    }

    pub fn scan(&mut self, token: &ScanToken) -> ScanResult<PackOutcome> {
        let input = ScanInput::parse(token, self.delimiter)?;
        self.interpret(&input)
    }

    /// Pack one unit of the scanned product.
    ///
    /// Lines of the same product are filled in order, so a product split over several
    /// lines is only rejected once all of them are full.
    pub fn interpret(&mut self, input: &ScanInput) -> ScanResult<PackOutcome> {
        let product = input.product_text();
        let mut matching = self
            .order
            .lines
            .iter_mut()
            .filter(|line| codes_match(&line.product_code, product))
            .peekable();

        if matching.peek().is_none() {
            debug!(order = %self.order.order_id, product, "product not in order");
            return Err(ScanError::NotInOrder(product.to_string()));
        }
        let line = matching
            .find(|line| !line.is_complete())
            .ok_or_else(|| ScanError::AlreadyComplete(product.to_string()))?;

        line.packed_qty += 1;
        let mut outcome = PackOutcome {
            order_id: self.order.order_id,
            product_code: line.product_code.clone(),
            lot: input.lot.clone(),
            packed_qty: line.packed_qty,
            required_qty: line.required_qty,
            line_complete: line.is_complete(),
            order_complete: false,
        };
        outcome.order_complete = self.order.is_complete();
        if outcome.order_complete {
            info!(order = %self.order.order_id, "order fully packed");
        }
        Ok(outcome)
    }
}
