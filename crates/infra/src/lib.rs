//! Infrastructure layer: inventory backend port, warehouse fixtures and the terminal
//! runtime that executes engine effects.

pub mod inventory;
pub mod seed;
pub mod terminal;

pub use inventory::{InMemoryInventoryService, InventoryService, ServiceError, StockRecord};
pub use seed::WarehouseSeed;
pub use terminal::ScanTerminal;
