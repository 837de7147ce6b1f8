//! Verification session state.
//!
//! The session is an explicit tagged union ([`SessionState`]) plus scratch data owned by
//! the session. Transitions live in [`crate::flow`]; nothing here performs IO.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use floorscan_core::{Mode, TaskId};
use floorscan_events::CommitEvent;

use crate::lots::{LotCandidate, LotQuery, RankedLot};
use crate::task::Task;

/// Operator-visible step of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    Location,
    Item,
    LotSelect,
    LotVerify,
    Quantity,
    Destination,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Location => "LOCATION",
            Step::Item => "ITEM",
            Step::LotSelect => "LOT_SELECT",
            Step::LotVerify => "LOT_VERIFY",
            Step::Quantity => "QUANTITY",
            Step::Destination => "DESTINATION",
        }
    }
}

impl core::fmt::Display for Step {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Location,
    Item,
    LotSelect { candidates: Vec<RankedLot> },
    LotVerify { chosen: LotCandidate },
    Quantity,
    Destination,
}

impl SessionState {
    pub fn step(&self) -> Step {
        match self {
            SessionState::Location => Step::Location,
            SessionState::Item => Step::Item,
            SessionState::LotSelect { .. } => Step::LotSelect,
            SessionState::LotVerify { .. } => Step::LotVerify,
            SessionState::Quantity => Step::Quantity,
            SessionState::Destination => Step::Destination,
        }
    }
}

/// An outstanding call to the inventory service. While set, the session accepts no scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Lots(LotQuery),
    Commit(CommitEvent),
}

impl Pending {
    pub fn describe(&self) -> &'static str {
        match self {
            Pending::Lots(_) => "lot lookup",
            Pending::Commit(_) => "commit",
        }
    }
}

/// Values captured during the session. They reach the task only through a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scratch {
    /// Product identity confirmed (by the opening scan or at ITEM).
    pub item_verified: bool,
    /// MOVE: the scanned product.
    pub product_code: Option<String>,
    /// RECEIVE: chosen putaway bin. MOVE: source bin.
    pub location: Option<String>,
    /// MOVE: destination bin.
    pub dest_location: Option<String>,
    pub captured_lot: Option<String>,
    pub captured_expiry: Option<NaiveDate>,
    pub captured_qty: Option<u32>,
    /// Units on hand in the chosen lot, when it came from the lot lookup.
    pub lot_available: Option<u32>,
    /// GS1 AI 21 from the item or lot label.
    pub captured_serial: Option<String>,
    /// Shortfall to report once the partial pick is acknowledged.
    pub short_pick: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSession {
    pub mode: Mode,
    /// Snapshot of the task taken when the session opened. `None` for MOVE.
    pub task: Option<Task>,
    pub state: SessionState,
    pub scratch: Scratch,
    pub pending: Option<Pending>,
    /// A call that failed and can be retried.
    pub stalled: Option<Pending>,
}

impl VerificationSession {
    pub fn open(mode: Mode, task: Option<Task>, state: SessionState) -> Self {
        Self {
            mode,
            task,
            state,
            scratch: Scratch::default(),
            pending: None,
            stalled: None,
        }
    }

    pub fn step(&self) -> Step {
        self.state.step()
    }

    pub fn task_id(&self) -> Option<TaskId> {
        self.task.as_ref().map(|t| t.id)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }
}

/// What the terminal should ask the operator for next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    /// No session open: scan a product or bin to pick up a task (or a source bin in MOVE).
    ScanToStart { mode: Mode },
    ScanLocation { expected: Option<String> },
    ScanItem { expected: Option<String> },
    ChooseLot { candidates: Vec<RankedLot> },
    ScanLot { expected: String },
    EnterQuantity { expected: Option<u32> },
    ScanDestination { expected: Option<String> },
    Waiting { on: String },
    Retry { failed: String },
}

impl core::fmt::Display for Prompt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Prompt::ScanToStart { mode } => write!(f, "{mode}: scan to start"),
            Prompt::ScanLocation { expected: Some(loc) } => write!(f, "Go to location {loc}"),
            Prompt::ScanLocation { expected: None } => f.write_str("Scan bin label"),
            Prompt::ScanItem { expected: Some(sku) } => write!(f, "Scan item {sku}"),
            Prompt::ScanItem { expected: None } => f.write_str("Scan product barcode"),
            Prompt::ChooseLot { candidates } => {
                f.write_str("Choose lot:")?;
                for c in candidates {
                    let marker = if c.recommended { " (FEFO)" } else { "" };
                    match c.candidate.expiry_date {
                        Some(exp) => write!(f, " {} exp {exp}{marker};", c.candidate.lot_number)?,
                        None => write!(f, " {} no expiry{marker};", c.candidate.lot_number)?,
                    }
                }
                Ok(())
            }
            Prompt::ScanLot { expected } => write!(f, "Scan lot {expected}"),
            Prompt::EnterQuantity { expected: Some(qty) } => write!(f, "Enter quantity ({qty})"),
            Prompt::EnterQuantity { expected: None } => f.write_str("Enter quantity"),
            Prompt::ScanDestination { expected: Some(loc) } => write!(f, "Scan destination {loc}"),
            Prompt::ScanDestination { expected: None } => f.write_str("Scan destination bin"),
            Prompt::Waiting { on } => write!(f, "Waiting for {on}..."),
            Prompt::Retry { failed } => write!(f, "{failed} failed; retry or cancel"),
        }
    }
}
