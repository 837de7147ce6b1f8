//! Exception notifications: short picks and rejected bin/item scans.
//!
//! Reports are one-way. A failed publish is logged and dropped; the corrective count
//! task is raised by whoever consumes the report.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use floorscan_events::{
    EventBus, EventEnvelope, ExceptionKind, ExceptionRecord, FloorEvent, FloorPublisher,
};

use crate::task::Task;

pub struct ExceptionReporter<B> {
    publisher: Arc<FloorPublisher<B>>,
}

impl<B> ExceptionReporter<B>
where
    B: EventBus<EventEnvelope<FloorEvent>>,
{
    pub fn new(publisher: Arc<FloorPublisher<B>>) -> Self {
        Self { publisher }
    }

    /// Publish a record. Returns whether the bus accepted it.
    pub fn report(&self, record: ExceptionRecord) -> bool {
        let kind = record.kind;
        let product = record.product_code.clone();
        match self.publisher.publish(FloorEvent::Exception(record)) {
            Ok(sequence) => {
                info!(?kind, product = %product, sequence, "exception reported");
                true
            }
            Err(err) => {
                warn!(?kind, product = %product, error = ?err, "exception report dropped");
                false
            }
        }
    }
}

/// SHORT_PICK record for `shortfall` units of the task's product at its bin.
pub fn short_pick(task: &Task, shortfall: u32, now: DateTime<Utc>) -> ExceptionRecord {
    record(task, ExceptionKind::ShortPick, shortfall, now)
}

pub fn location_mismatch(task: &Task, now: DateTime<Utc>) -> ExceptionRecord {
    record(task, ExceptionKind::LocationMismatch, 0, now)
}

pub fn item_mismatch(task: &Task, now: DateTime<Utc>) -> ExceptionRecord {
    record(task, ExceptionKind::ItemMismatch, 0, now)
}

fn record(task: &Task, kind: ExceptionKind, qty: u32, now: DateTime<Utc>) -> ExceptionRecord {
    ExceptionRecord {
        task_id: Some(task.id),
        kind,
        product_code: task.product_code.clone(),
        location_code: task.target_location.clone(),
        reported_qty: qty,
        occurred_at: now,
    }
}
