//! Warehouse fixtures: locations, tasks, stock and packing orders in one JSON document.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use floorscan_verification::{Location, LocationMaster, PackingOrder, Task};

use crate::inventory::{InMemoryInventoryService, StockRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseSeed {
    pub locations: Vec<Location>,
    pub tasks: Vec<Task>,
    pub stock: Vec<StockRecord>,
    pub packing_orders: Vec<PackingOrder>,
}

impl WarehouseSeed {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid warehouse seed")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn location_master(&self) -> LocationMaster {
        LocationMaster::new(self.locations.iter().cloned())
    }

    /// Split into the location master and an in-memory backend holding stock and tasks.
    pub fn into_parts(self) -> (LocationMaster, InMemoryInventoryService, Vec<PackingOrder>) {
        let master = self.location_master();
        let service = InMemoryInventoryService::new(self.stock, self.tasks);
        (master, service, self.packing_orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryService;
    use floorscan_core::Mode;
    use floorscan_verification::TaskKind;

    const SEED: &str = r#"{
        "locations": [
            {"location_code": "A-01", "zone": "PICK", "type": "PICK_FACE"},
            {"location_code": "DOCK1", "zone": "INBOUND", "type": "DOCK"}
        ],
        "tasks": [
            {
                "id": "0190f0a8-1c1e-7c4e-9d2a-3b5e6f708192",
                "kind": {"kind": "PICK", "orders": []},
                "target_location": "A-01",
                "product_code": "SKU1",
                "required_qty": 5
            }
        ],
        "stock": [
            {
                "product_code": "SKU1",
                "location_code": "A-01",
                "lots": [{"lot_number": "L1", "expiry_date": "2025-06-01", "available_qty": 9}]
            }
        ]
    }"#;

    #[test]
    fn seed_parses_with_defaults() {
        let seed = WarehouseSeed::from_json(SEED).unwrap();
        assert_eq!(seed.locations.len(), 2);
        assert!(seed.packing_orders.is_empty());
        assert!(matches!(seed.tasks[0].kind, TaskKind::Pick { .. }));
        assert_eq!(seed.tasks[0].completed_qty, 0);
    }

    #[test]
    fn parts_share_tasks_and_stock() {
        let (master, service, _) = WarehouseSeed::from_json(SEED).unwrap().into_parts();
        assert!(master.get("dock1").is_some());
        assert_eq!(service.on_hand("SKU1", "A-01"), 9);
        assert_eq!(service.pending_tasks(Mode::Pick).unwrap().len(), 1);
    }

    #[test]
    fn broken_seed_reports_context() {
        let err = WarehouseSeed::from_json("{ not json").unwrap_err();
        assert!(err.to_string().contains("invalid warehouse seed"));
    }
}
