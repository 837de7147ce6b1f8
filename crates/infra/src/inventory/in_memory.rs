use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use floorscan_core::{Mode, TaskId, codes_match};
use floorscan_events::{CommitEvent, ExceptionKind, ExceptionRecord};
use floorscan_verification::{LotCandidate, LotQuery, LotSelector, Task, TaskKind, TaskStatus};

use super::{InventoryService, ServiceError};

/// Lots of one product in one bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub product_code: String,
    pub location_code: String,
    pub lots: Vec<LotCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StockKey {
    product: String,
    location: String,
}

impl StockKey {
    fn new(product: &str, location: &str) -> Self {
        Self {
            product: product.trim().to_ascii_uppercase(),
            location: location.trim().to_ascii_uppercase(),
        }
    }
}

/// In-memory inventory backend.
///
/// Intended for tests and the standalone terminal. Outages can be simulated with
/// [`InMemoryInventoryService::fail_next_commits`] and
/// [`InMemoryInventoryService::fail_next_lookups`].
#[derive(Debug, Default)]
pub struct InMemoryInventoryService {
    stock: RwLock<HashMap<StockKey, Vec<LotCandidate>>>,
    tasks: RwLock<Vec<Task>>,
    commits: RwLock<Vec<CommitEvent>>,
    failing_commits: AtomicU32,
    failing_lookups: AtomicU32,
}

impl InMemoryInventoryService {
    pub fn new(stock: Vec<StockRecord>, tasks: Vec<Task>) -> Self {
        let service = Self::default();
        if let Ok(mut map) = service.stock.write() {
            for record in stock {
                map.entry(StockKey::new(&record.product_code, &record.location_code))
                    .or_default()
                    .extend(record.lots);
            }
        }
        if let Ok(mut list) = service.tasks.write() {
            *list = tasks;
        }
        service
    }

    /// The next `n` commits fail with [`ServiceError::Unavailable`].
    pub fn fail_next_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_lookups(&self, n: u32) {
        self.failing_lookups.store(n, Ordering::SeqCst);
    }

    /// Every accepted commit, oldest first.
    pub fn commits(&self) -> Vec<CommitEvent> {
        self.commits.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.read().map(|t| t.clone()).unwrap_or_default()
    }

    /// Units of a product on hand in a bin, all lots.
    pub fn on_hand(&self, product_code: &str, location_code: &str) -> u32 {
        self.stock
            .read()
            .ok()
            .and_then(|map| {
                map.get(&StockKey::new(product_code, location_code))
                    .map(|lots| lots.iter().map(|l| l.available_qty).sum())
            })
            .unwrap_or(0)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

type Stock = HashMap<StockKey, Vec<LotCandidate>>;

/// Units leaving one bin for another.
struct Transfer<'a> {
    product: &'a str,
    source: &'a str,
    dest: &'a str,
    lot: Option<&'a str>,
    qty: u32,
}

/// Refuse a commit before anything changes. For a replenishment, returns the transfer it
/// implies.
fn check<'a>(
    tasks: &'a [Task],
    stock: &Stock,
    commit: &'a CommitEvent,
) -> Result<Option<Transfer<'a>>, ServiceError> {
    let task = match commit.task_id() {
        Some(id) => Some(
            tasks
                .iter()
                .find(|t| t.id == id)
                .ok_or_else(|| ServiceError::Rejected(format!("unknown task {id}")))?,
        ),
        None => None,
    };

    match commit {
        CommitEvent::Pick(p) => {
            ensure_stock(stock, &p.product_code, &p.location_code, p.lot_number.as_deref(), p.qty)?;
        }
        CommitEvent::Move(m) => {
            ensure_stock(stock, &m.product_code, &m.source_location, m.lot_number.as_deref(), m.qty)?;
        }
        CommitEvent::Replenish(r) => {
            let not_replenishment =
                || ServiceError::Rejected(format!("task {} is not a replenishment", r.task_id));
            let task = task.ok_or_else(not_replenishment)?;
            let TaskKind::Replenish { dest_location } = &task.kind else {
                return Err(not_replenishment());
            };
            let transfer = Transfer {
                product: &task.product_code,
                source: &task.target_location,
                dest: dest_location,
                lot: None,
                qty: task.remaining_qty(),
            };
            ensure_stock(stock, transfer.product, transfer.source, None, transfer.qty)?;
            return Ok(Some(transfer));
        }
        CommitEvent::Receive(_) | CommitEvent::Count(_) => {}
    }
    Ok(None)
}

fn ensure_stock(
    stock: &Stock,
    product: &str,
    location: &str,
    lot: Option<&str>,
    qty: u32,
) -> Result<(), ServiceError> {
    let available: u32 = stock
        .get(&StockKey::new(product, location))
        .map(|lots| {
            lots.iter()
                .filter(|l| lot.is_none_or(|n| codes_match(n, &l.lot_number)))
                .map(|l| l.available_qty)
                .sum()
        })
        .unwrap_or(0);
    if available < qty {
        return Err(ServiceError::Rejected(format!(
            "not enough physical stock: only {available} of {product} in {location}"
        )));
    }
    Ok(())
}

fn apply_stock(stock: &mut Stock, commit: &CommitEvent, replenish: Option<&Transfer<'_>>) {
    match commit {
        CommitEvent::Pick(p) => {
            let lots = stock
                .entry(StockKey::new(&p.product_code, &p.location_code))
                .or_default();
            take(lots, p.lot_number.as_deref(), p.qty);
        }
        CommitEvent::Receive(r) => {
            let lots = stock
                .entry(StockKey::new(&r.product_code, &r.location_code))
                .or_default();
            put(lots, r.lot_number.as_deref(), r.expiry_date, r.qty);
        }
        CommitEvent::Move(m) => transfer(
            stock,
            &Transfer {
                product: &m.product_code,
                source: &m.source_location,
                dest: &m.dest_location,
                lot: m.lot_number.as_deref(),
                qty: m.qty,
            },
        ),
        CommitEvent::Count(c) => {
            let lots = stock
                .entry(StockKey::new(&c.product_code, &c.location_code))
                .or_default();
            adjust_to_count(lots, c.counted_qty);
        }
        CommitEvent::Replenish(_) => {
            if let Some(leg) = replenish {
                transfer(stock, leg);
            }
        }
    }
}

fn transfer(stock: &mut Stock, leg: &Transfer<'_>) {
    let moved = take(
        stock.entry(StockKey::new(leg.product, leg.source)).or_default(),
        leg.lot,
        leg.qty,
    );
    let dest = stock.entry(StockKey::new(leg.product, leg.dest)).or_default();
    for lot in moved {
        put(dest, Some(lot.lot_number.as_str()), lot.expiry_date, lot.available_qty);
    }
}

fn apply_task(tasks: &mut [Task], commit: &CommitEvent) {
    let Some(task) = commit
        .task_id()
        .and_then(|id| tasks.iter_mut().find(|t| t.id == id))
    else {
        return;
    };
    match commit {
        CommitEvent::Pick(p) => credit(task, p.qty),
        CommitEvent::Receive(r) => credit(task, r.qty),
        _ => task.status = TaskStatus::Complete,
    }
}

fn credit(task: &mut Task, qty: u32) {
    task.completed_qty = task.completed_qty.saturating_add(qty);
    if task.completed_qty >= task.required_qty {
        task.status = TaskStatus::Complete;
    }
}

/// Remove `qty` units, from the named lot or FEFO-first. Returns what was taken per lot.
fn take(lots: &mut Vec<LotCandidate>, lot: Option<&str>, qty: u32) -> Vec<LotCandidate> {
    LotSelector::fefo_sort(lots);
    let mut left = qty;
    let mut taken = Vec::new();
    for candidate in lots.iter_mut() {
        if left == 0 {
            break;
        }
        if lot.is_some_and(|n| !codes_match(n, &candidate.lot_number)) {
            continue;
        }
        let n = candidate.available_qty.min(left);
        if n > 0 {
            candidate.available_qty -= n;
            left -= n;
            taken.push(LotCandidate::new(candidate.lot_number.clone(), candidate.expiry_date, n));
        }
    }
    lots.retain(|l| l.available_qty > 0);
    taken
}

fn put(
    lots: &mut Vec<LotCandidate>,
    lot: Option<&str>,
    expiry: Option<chrono::NaiveDate>,
    qty: u32,
) {
    let lot_number = lot.unwrap_or_default();
    match lots.iter_mut().find(|l| codes_match(&l.lot_number, lot_number)) {
        Some(existing) => existing.available_qty = existing.available_qty.saturating_add(qty),
        None => lots.push(LotCandidate::new(lot_number, expiry, qty)),
    }
}

/// A count overrides the book quantity; the difference lands on the FEFO-last lot.
fn adjust_to_count(lots: &mut Vec<LotCandidate>, counted: u32) {
    let on_hand: u32 = lots.iter().map(|l| l.available_qty).sum();
    if counted < on_hand {
        let mut excess = on_hand - counted;
        LotSelector::fefo_sort(lots);
        for lot in lots.iter_mut().rev() {
            let n = lot.available_qty.min(excess);
            lot.available_qty -= n;
            excess -= n;
        }
        lots.retain(|l| l.available_qty > 0);
    } else if counted > on_hand {
        match lots.last_mut() {
            Some(last) => last.available_qty += counted - on_hand,
            None => lots.push(LotCandidate::new("", None, counted)),
        }
    }
}

impl InventoryService for InMemoryInventoryService {
    fn lot_candidates(&self, query: &LotQuery) -> Result<Vec<LotCandidate>, ServiceError> {
        if Self::take_failure(&self.failing_lookups) {
            return Err(ServiceError::Unavailable("lot lookup timed out".to_string()));
        }
        let stock = self.stock.read().map_err(|_| ServiceError::Poisoned)?;
        let lots = stock
            .get(&StockKey::new(&query.product_code, &query.location_code))
            .cloned()
            .unwrap_or_default();
        debug!(product = %query.product_code, location = %query.location_code, lots = lots.len(), "lot lookup");
        Ok(lots)
    }

    fn commit(&self, commit: &CommitEvent) -> Result<(), ServiceError> {
        if Self::take_failure(&self.failing_commits) {
            return Err(ServiceError::Unavailable("connection refused".to_string()));
        }
        let mut commits = self.commits.write().map_err(|_| ServiceError::Poisoned)?;
        let mut tasks = self.tasks.write().map_err(|_| ServiceError::Poisoned)?;
        let mut stock = self.stock.write().map_err(|_| ServiceError::Poisoned)?;

        let replenish = check(&tasks, &stock, commit).inspect_err(|err| {
            warn!(task = ?commit.task_id(), error = %err, "commit refused");
        })?;
        apply_stock(&mut stock, commit, replenish.as_ref());
        apply_task(&mut tasks, commit);
        commits.push(commit.clone());
        Ok(())
    }

    fn pending_tasks(&self, mode: Mode) -> Result<Vec<Task>, ServiceError> {
        let tasks = self.tasks.read().map_err(|_| ServiceError::Poisoned)?;
        Ok(tasks
            .iter()
            .filter(|t| t.mode() == mode && t.status != TaskStatus::Complete)
            .cloned()
            .map(|mut t| {
                t.status = TaskStatus::Pending;
                t
            })
            .collect())
    }

    /// A short pick closes the pick task and raises a count task for the bin.
    fn record_exception(&self, record: &ExceptionRecord) -> Result<(), ServiceError> {
        if record.kind != ExceptionKind::ShortPick {
            return Ok(());
        }
        let mut tasks = self.tasks.write().map_err(|_| ServiceError::Poisoned)?;
        if let Some(id) = record.task_id {
            close(&mut tasks, id);
        }
        let expected = self.on_hand(&record.product_code, &record.location_code);
        tasks.push(Task::count(
            record.location_code.clone(),
            record.product_code.clone(),
            expected,
        ));
        info!(product = %record.product_code, location = %record.location_code, "count task raised after short pick");
        Ok(())
    }
}

fn close(tasks: &mut [Task], id: TaskId) {
    if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
        task.status = TaskStatus::Complete;
    }
}
