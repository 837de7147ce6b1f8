//! Events emitted by the scan engine towards the external inventory/order service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use floorscan_core::{OrderId, TaskId};

use crate::event::Event;

/// Share of a pick credited to one order (split fulfillment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAllocation {
    pub order_id: OrderId,
    pub qty: u32,
}

/// Event: PickCommitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickCommitted {
    pub task_id: TaskId,
    pub product_code: String,
    pub location_code: String,
    pub qty: u32,
    pub lot_number: Option<String>,
    /// Serial read from the label, when the product is serialized.
    #[serde(default)]
    pub serial_number: Option<String>,
    pub allocations: Vec<OrderAllocation>,
    /// The operator explicitly confirmed a quantity different from the expected one.
    pub override_applied: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CountCommitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountCommitted {
    pub task_id: TaskId,
    pub product_code: String,
    pub location_code: String,
    pub counted_qty: u32,
    pub expected_qty: u32,
    /// `counted_qty - expected_qty`.
    pub variance: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiveCommitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveCommitted {
    pub task_id: TaskId,
    pub product_code: String,
    pub location_code: String,
    pub qty: u32,
    pub lot_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub serial_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MoveCommitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommitted {
    pub product_code: String,
    pub source_location: String,
    pub dest_location: String,
    pub qty: u32,
    pub lot_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReplenishCommitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishCommitted {
    pub task_id: TaskId,
    pub occurred_at: DateTime<Utc>,
}

/// One completed verification session, ready for the external service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitEvent {
    Pick(PickCommitted),
    Count(CountCommitted),
    Receive(ReceiveCommitted),
    Move(MoveCommitted),
    Replenish(ReplenishCommitted),
}

impl CommitEvent {
    /// The task this commit completes (MOVE sessions have none).
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            CommitEvent::Pick(e) => Some(e.task_id),
            CommitEvent::Count(e) => Some(e.task_id),
            CommitEvent::Receive(e) => Some(e.task_id),
            CommitEvent::Replenish(e) => Some(e.task_id),
            CommitEvent::Move(_) => None,
        }
    }

    /// Units credited towards the task's `completed_qty`.
    ///
    /// `None` means the commit closes the task outright (count, replenish).
    pub fn credited_qty(&self) -> Option<u32> {
        match self {
            CommitEvent::Pick(e) => Some(e.qty),
            CommitEvent::Receive(e) => Some(e.qty),
            CommitEvent::Move(e) => Some(e.qty),
            CommitEvent::Count(_) | CommitEvent::Replenish(_) => None,
        }
    }
}

/// Kind of an exception notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionKind {
    ShortPick,
    LocationMismatch,
    ItemMismatch,
}

/// One-way exception notification. Resolution happens outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    pub task_id: Option<TaskId>,
    pub kind: ExceptionKind,
    pub product_code: String,
    pub location_code: String,
    /// Shortfall for SHORT_PICK; zero for mismatches.
    pub reported_qty: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Everything a terminal publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloorEvent {
    Committed(CommitEvent),
    Exception(ExceptionRecord),
}

impl Event for CommitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CommitEvent::Pick(_) => "floor.pick.committed",
            CommitEvent::Count(_) => "floor.count.committed",
            CommitEvent::Receive(_) => "floor.receive.committed",
            CommitEvent::Move(_) => "floor.move.committed",
            CommitEvent::Replenish(_) => "floor.replenish.committed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CommitEvent::Pick(e) => e.occurred_at,
            CommitEvent::Count(e) => e.occurred_at,
            CommitEvent::Receive(e) => e.occurred_at,
            CommitEvent::Move(e) => e.occurred_at,
            CommitEvent::Replenish(e) => e.occurred_at,
        }
    }
}

impl Event for FloorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FloorEvent::Committed(e) => e.event_type(),
            FloorEvent::Exception(e) => match e.kind {
                ExceptionKind::ShortPick => "floor.exception.short_pick",
                ExceptionKind::LocationMismatch => "floor.exception.location_mismatch",
                ExceptionKind::ItemMismatch => "floor.exception.item_mismatch",
            },
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FloorEvent::Committed(e) => e.occurred_at(),
            FloorEvent::Exception(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn move_commit_has_no_task() {
        let ev = CommitEvent::Move(MoveCommitted {
            product_code: "SKU1".into(),
            source_location: "A-01".into(),
            dest_location: "B-02".into(),
            qty: 3,
            lot_number: None,
            occurred_at: test_time(),
        });
        assert_eq!(ev.task_id(), None);
        assert_eq!(ev.credited_qty(), Some(3));
        assert_eq!(ev.event_type(), "floor.move.committed");
    }

    #[test]
    fn exception_event_type_follows_kind() {
        let ev = FloorEvent::Exception(ExceptionRecord {
            task_id: Some(TaskId::new()),
            kind: ExceptionKind::ShortPick,
            product_code: "SKU1".into(),
            location_code: "A-01".into(),
            reported_qty: 2,
            occurred_at: test_time(),
        });
        assert_eq!(ev.event_type(), "floor.exception.short_pick");
    }

    #[test]
    fn receive_expiry_serializes_as_calendar_date() {
        let ev = ReceiveCommitted {
            task_id: TaskId::new(),
            product_code: "SKU2".into(),
            location_code: "DOCK1".into(),
            qty: 10,
            lot_number: Some("LOTA".into()),
            expiry_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            serial_number: None,
            occurred_at: test_time(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["expiry_date"], "2025-12-31");
        assert_eq!(json["lot_number"], "LOTA");
    }

    #[test]
    fn commits_without_serial_field_still_deserialize() {
        let json = serde_json::json!({
            "task_id": TaskId::new(),
            "product_code": "SKU2",
            "location_code": "DOCK1",
            "qty": 1,
            "lot_number": null,
            "expiry_date": null,
            "occurred_at": test_time(),
        });
        let ev: ReceiveCommitted = serde_json::from_value(json).unwrap();
        assert_eq!(ev.serial_number, None);
    }
}
