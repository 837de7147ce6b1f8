//! Port to the external inventory/order service, the system of record for stock and
//! tasks.

mod in_memory;

pub use in_memory::{InMemoryInventoryService, StockRecord};

use thiserror::Error;

use floorscan_core::Mode;
use floorscan_events::{CommitEvent, ExceptionRecord};
use floorscan_verification::{LotCandidate, LotQuery, Task};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service could not be reached; the call may be retried.
    #[error("inventory service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request.
    #[error("rejected by inventory service: {0}")]
    Rejected(String),

    #[error("inventory state lock poisoned")]
    Poisoned,
}

/// Calls the terminal makes against the inventory/order backend.
pub trait InventoryService: Send + Sync {
    /// Lots of `product_code` currently stored in `location_code`.
    fn lot_candidates(&self, query: &LotQuery) -> Result<Vec<LotCandidate>, ServiceError>;

    /// Record a verified operation. Not deduplicated: the terminal never submits twice.
    fn commit(&self, commit: &CommitEvent) -> Result<(), ServiceError>;

    /// Pending tasks for a mode, in the order the operator should see them.
    fn pending_tasks(&self, mode: Mode) -> Result<Vec<Task>, ServiceError>;

    /// Hand over an exception record. Only SHORT_PICK has backend consequences.
    fn record_exception(&self, _record: &ExceptionRecord) -> Result<(), ServiceError> {
        Ok(())
    }
}
