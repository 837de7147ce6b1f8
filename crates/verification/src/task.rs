//! Operator tasks as handed over by the external task system.

use serde::{Deserialize, Serialize};

use floorscan_core::{Mode, OrderId, TaskId};
use floorscan_events::{CommitEvent, OrderAllocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
}

/// Demand of one order inside a (possibly aggregated) pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNeed {
    pub order_id: OrderId,
    pub qty_needed: u32,
}

/// Mode-specific part of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Pick { orders: Vec<OrderNeed> },
    Count,
    Receive,
    /// Move stock from `target_location` (reserve) to `dest_location` (pick face).
    Replenish { dest_location: String },
}

impl TaskKind {
    pub fn mode(&self) -> Mode {
        match self {
            TaskKind::Pick { .. } => Mode::Pick,
            TaskKind::Count => Mode::Count,
            TaskKind::Receive => Mode::Receive,
            TaskKind::Replenish { .. } => Mode::Replenish,
        }
    }
}

/// A task snapshot. The engine never mutates a task while a session runs on it; the
/// board only records the outcome of an acknowledged commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Bin to pick from / count / replenish from; expected dock for receipts.
    pub target_location: String,
    pub product_code: String,
    pub required_qty: u32,
    #[serde(default)]
    pub completed_qty: u32,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

impl Task {
    pub fn new(
        kind: TaskKind,
        target_location: impl Into<String>,
        product_code: impl Into<String>,
        required_qty: u32,
    ) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            target_location: target_location.into(),
            product_code: product_code.into(),
            required_qty,
            completed_qty: 0,
            status: TaskStatus::Pending,
        }
    }

    pub fn pick(
        location: impl Into<String>,
        product: impl Into<String>,
        required_qty: u32,
        orders: Vec<OrderNeed>,
    ) -> Self {
        Self::new(TaskKind::Pick { orders }, location, product, required_qty)
    }

    pub fn count(location: impl Into<String>, product: impl Into<String>, expected_qty: u32) -> Self {
        Self::new(TaskKind::Count, location, product, expected_qty)
    }

    pub fn receive(dock: impl Into<String>, product: impl Into<String>, expected_qty: u32) -> Self {
        Self::new(TaskKind::Receive, dock, product, expected_qty)
    }

    pub fn replenish(
        source: impl Into<String>,
        dest: impl Into<String>,
        product: impl Into<String>,
        qty_to_move: u32,
    ) -> Self {
        Self::new(
            TaskKind::Replenish {
                dest_location: dest.into(),
            },
            source,
            product,
            qty_to_move,
        )
    }

    pub fn mode(&self) -> Mode {
        self.kind.mode()
    }

    pub fn remaining_qty(&self) -> u32 {
        self.required_qty.saturating_sub(self.completed_qty)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Split `qty` over the task's orders, in list order.
    ///
    /// Units beyond the total order demand (an override over-pick) are not credited to
    /// any order.
    pub fn allocate(&self, qty: u32) -> Vec<OrderAllocation> {
        let TaskKind::Pick { orders } = &self.kind else {
            return Vec::new();
        };

        let mut left = qty;
        let mut allocations = Vec::new();
        for need in orders {
            if left == 0 {
                break;
            }
            let take = need.qty_needed.min(left);
            if take > 0 {
                allocations.push(OrderAllocation {
                    order_id: need.order_id,
                    qty: take,
                });
                left -= take;
            }
        }
        allocations
    }
}

/// Local view of the externally owned pending-task list for one mode.
///
/// Authority stays with the task system: after each commit the board is flagged stale
/// and expects [`TaskBoard::replace`] with a fresh list.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    needs_refresh: bool,
}

impl TaskBoard {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            needs_refresh: false,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.is_pending())
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    /// Install a fresh list from the task system. `active` keeps its in-progress mark.
    pub fn replace(&mut self, tasks: Vec<Task>, active: Option<TaskId>) {
        self.tasks = tasks;
        if let Some(id) = active {
            self.set_status(id, TaskStatus::InProgress);
        }
        self.needs_refresh = false;
    }

    pub fn mark_in_progress(&mut self, id: TaskId) {
        self.set_status(id, TaskStatus::InProgress);
    }

    /// Back to PENDING after a cancel.
    pub fn release(&mut self, id: TaskId) {
        self.set_status(id, TaskStatus::Pending);
    }

    /// Drop a task from the active list (short pick).
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        self.needs_refresh = true;
        Some(self.tasks.remove(pos))
    }

    /// Record an acknowledged commit.
    pub fn apply_commit(&mut self, commit: &CommitEvent) {
        self.needs_refresh = true;
        let Some(id) = commit.task_id() else {
            return;
        };
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return;
        };

        match commit.credited_qty() {
            Some(qty) => {
                task.completed_qty = task.completed_qty.saturating_add(qty);
                task.status = if task.completed_qty >= task.required_qty {
                    TaskStatus::Complete
                } else {
                    TaskStatus::Pending
                };
            }
            None => task.status = TaskStatus::Complete,
        }
    }

    fn set_status(&mut self, id: TaskId, status: TaskStatus) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use floorscan_events::PickCommitted;

    fn need(qty: u32) -> OrderNeed {
        OrderNeed {
            order_id: OrderId::new(),
            qty_needed: qty,
        }
    }

    fn pick_commit(task: &Task, qty: u32) -> CommitEvent {
        CommitEvent::Pick(PickCommitted {
            task_id: task.id,
            product_code: task.product_code.clone(),
            location_code: task.target_location.clone(),
            qty,
            lot_number: None,
            serial_number: None,
            allocations: task.allocate(qty),
            override_applied: false,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn allocation_fills_orders_in_list_order() {
        let orders = vec![need(2), need(3), need(4)];
        let task = Task::pick("A-01", "SKU1", 9, orders.clone());

        let split = task.allocate(4);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].order_id, orders[0].order_id);
        assert_eq!(split[0].qty, 2);
        assert_eq!(split[1].order_id, orders[1].order_id);
        assert_eq!(split[1].qty, 2);
    }

    #[test]
    fn over_pick_is_not_credited_to_orders() {
        let task = Task::pick("A-01", "SKU1", 2, vec![need(2)]);
        let split = task.allocate(5);
        assert_eq!(split.iter().map(|a| a.qty).sum::<u32>(), 2);
    }

    #[test]
    fn partial_commit_leaves_task_pending() {
        let task = Task::pick("A-01", "SKU1", 5, vec![]);
        let mut board = TaskBoard::new(vec![task.clone()]);
        board.mark_in_progress(task.id);

        board.apply_commit(&pick_commit(&task, 3));

        let after = board.get(task.id).unwrap();
        assert_eq!(after.completed_qty, 3);
        assert_eq!(after.status, TaskStatus::Pending);
        assert!(board.needs_refresh());
    }

    #[test]
    fn full_commit_completes_task() {
        let task = Task::pick("A-01", "SKU1", 5, vec![]);
        let mut board = TaskBoard::new(vec![task.clone()]);
        board.apply_commit(&pick_commit(&task, 5));
        assert_eq!(board.get(task.id).unwrap().status, TaskStatus::Complete);
        assert_eq!(board.pending().count(), 0);
    }

    #[test]
    fn replace_clears_refresh_and_keeps_active_task() {
        let task = Task::count("B-02", "SKU4", 10);
        let mut board = TaskBoard::new(vec![]);
        board.remove(TaskId::new());
        board.apply_commit(&pick_commit(&task, 1));
        assert!(board.needs_refresh());

        board.replace(vec![task.clone()], Some(task.id));
        assert!(!board.needs_refresh());
        assert_eq!(board.get(task.id).unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn tasks_deserialize_with_defaults() {
        let json = r#"{
            "id": "0190f5a2-0000-7000-8000-000000000001",
            "kind": {"kind": "REPLENISH", "dest_location": "PF-01"},
            "target_location": "R-10",
            "product_code": "SKU8",
            "required_qty": 12
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.mode(), Mode::Replenish);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.completed_qty, 0);
    }
}
