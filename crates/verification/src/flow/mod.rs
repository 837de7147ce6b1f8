//! Mode-specific verification flows.
//!
//! Every mode implements [`VerificationFlow`]; [`transition`] is the single pure
//! `(session, input) -> transition` entry point. It owns the concerns shared by all
//! modes (outstanding calls, retries, commit acknowledgement, cancel) and delegates the
//! step logic to the flow.

mod receive;
mod template;
mod transfer;

pub use receive::ReceiveFlow;
pub use template::TemplateFlow;
pub use transfer::MoveFlow;

use chrono::{DateTime, Utc};

use floorscan_core::{Mode, ScanError, ScanResult};
use floorscan_events::{CommitEvent, ExceptionRecord};
use floorscan_scan::ScanInput;

use crate::exceptions;
use crate::location::LocationMaster;
use crate::lots::{LotCandidate, LotQuery};
use crate::session::{Pending, Prompt, Step, VerificationSession};
use crate::task::Task;

/// Read-only surroundings of a transition.
#[derive(Debug, Clone, Copy)]
pub struct FlowContext<'a> {
    pub locations: &'a LocationMaster,
    pub now: DateTime<Utc>,
}

/// Everything that can happen to an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Scan(ScanInput),
    SelectLot(usize),
    EnterQuantity { qty: u32, confirm_override: bool },
    /// PICK only: `found_qty` units are all the bin holds.
    ShortPick { found_qty: u32 },
    LotsLoaded(Vec<LotCandidate>),
    LotsFailed(String),
    CommitAcknowledged,
    /// The service was unreachable; the same commit may be retried.
    CommitFailed(String),
    /// The service refused the commit; retrying it unchanged cannot succeed.
    CommitRejected(String),
    Retry,
    Cancel,
}

impl SessionInput {
    fn label(&self) -> &'static str {
        match self {
            SessionInput::Scan(_) => "scan",
            SessionInput::SelectLot(_) => "lot choice",
            SessionInput::EnterQuantity { .. } => "quantity",
            SessionInput::ShortPick { .. } => "short pick",
            SessionInput::LotsLoaded(_) => "lot list",
            SessionInput::LotsFailed(_) => "lot lookup failure",
            SessionInput::CommitAcknowledged => "commit acknowledgement",
            SessionInput::CommitFailed(_) => "commit failure",
            SessionInput::CommitRejected(_) => "commit rejection",
            SessionInput::Retry => "retry",
            SessionInput::Cancel => "cancel",
        }
    }
}

/// Requests for the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchLots(LotQuery),
    Commit(CommitEvent),
    Report(ExceptionRecord),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closure {
    Committed(CommitEvent),
    Cancelled,
    /// Task leaves the active list; `commit` carries the partial quantity, if any.
    ShortPicked { commit: Option<CommitEvent> },
}

/// Which task field the opening scan matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Product,
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// `None` once the session closed.
    pub session: Option<VerificationSession>,
    pub effects: Vec<Effect>,
    pub warnings: Vec<ScanError>,
    pub closed: Option<Closure>,
}

impl Transition {
    pub fn to(session: VerificationSession) -> Self {
        Self {
            session: Some(session),
            effects: Vec::new(),
            warnings: Vec::new(),
            closed: None,
        }
    }

    pub fn close(closure: Closure) -> Self {
        Self {
            session: None,
            effects: Vec::new(),
            warnings: Vec::new(),
            closed: Some(closure),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_warning(mut self, warning: ScanError) -> Self {
        self.warnings.push(warning);
        self
    }
}

/// The interface shared by all mode flows.
pub trait VerificationFlow: Send + Sync {
    fn mode(&self) -> Mode;

    /// Steps of this mode in their only permitted order.
    fn sequence(&self) -> &'static [Step];

    /// Start a session from the scan that selected it.
    fn open(
        &self,
        task: Option<Task>,
        matched: MatchedBy,
        scan: &ScanInput,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition>;

    fn submit_scan(
        &self,
        session: &VerificationSession,
        scan: &ScanInput,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition>;

    fn enter_quantity(
        &self,
        session: &VerificationSession,
        qty: u32,
        confirm_override: bool,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition>;

    fn current_prompt(&self, session: &VerificationSession) -> Prompt;

    fn select_lot(&self, session: &VerificationSession, _index: usize) -> ScanResult<Transition> {
        Err(ScanError::unexpected(session.step(), "lot choice"))
    }

    fn lots_loaded(
        &self,
        session: &VerificationSession,
        _lots: Vec<LotCandidate>,
    ) -> ScanResult<Transition> {
        Err(ScanError::unexpected(session.step(), "lot list"))
    }

    fn short_pick(
        &self,
        session: &VerificationSession,
        _found_qty: u32,
        _ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        Err(ScanError::unexpected(session.step(), "short pick"))
    }

    /// Leave the session without touching anything outside it.
    fn cancel(&self, _session: &VerificationSession) -> ScanResult<Transition> {
        Ok(Transition::close(Closure::Cancelled))
    }
}

pub fn flow_for(mode: Mode) -> Box<dyn VerificationFlow> {
    match mode {
        Mode::Pick | Mode::Count | Mode::Replenish => Box::new(TemplateFlow::new(mode)),
        Mode::Receive => Box::new(ReceiveFlow),
        Mode::Move => Box::new(MoveFlow),
    }
}

/// Apply one input to a session.
///
/// On `Err` the session is unchanged; the caller keeps its current value.
pub fn transition(
    flow: &dyn VerificationFlow,
    session: &VerificationSession,
    input: SessionInput,
    ctx: &FlowContext<'_>,
) -> ScanResult<Transition> {
    match (input, &session.pending) {
        (SessionInput::CommitAcknowledged, Some(Pending::Commit(commit))) => {
            Ok(acknowledge(session, commit.clone(), ctx))
        }
        (SessionInput::CommitFailed(reason), Some(Pending::Commit(_))) => {
            Ok(stall(session, reason))
        }
        (SessionInput::CommitRejected(_), Some(Pending::Commit(_))) => Ok(reopen(session)),
        (SessionInput::LotsLoaded(lots), Some(Pending::Lots(_))) => {
            let mut resumed = session.clone();
            resumed.pending = None;
            flow.lots_loaded(&resumed, lots)
        }
        (SessionInput::LotsFailed(reason), Some(Pending::Lots(_))) => Ok(stall(session, reason)),
        (SessionInput::Cancel, Some(Pending::Commit(_))) => Err(ScanError::busy("commit")),
        (SessionInput::Cancel, _) => flow.cancel(session),
        (input, Some(pending)) => {
            tracing::debug!(input = input.label(), pending = pending.describe(), "input while busy");
            Err(ScanError::busy(pending.describe()))
        }
        (SessionInput::Retry, None) => match &session.stalled {
            Some(stalled) => Ok(resume(session, stalled.clone())),
            None => Err(ScanError::unexpected(session.step(), "retry")),
        },
        (input, None) if session.stalled.is_some() => Err(ScanError::unexpected(
            session.step(),
            format!("{} (retry or cancel first)", input.label()),
        )),
        (SessionInput::Scan(scan), None) => flow.submit_scan(session, &scan, ctx),
        (SessionInput::SelectLot(index), None) => flow.select_lot(session, index),
        (SessionInput::EnterQuantity { qty, confirm_override }, None) => {
            flow.enter_quantity(session, qty, confirm_override, ctx)
        }
        (SessionInput::ShortPick { found_qty }, None) => flow.short_pick(session, found_qty, ctx),
        (input, None) => Err(ScanError::unexpected(session.step(), input.label())),
    }
}

/// Prompt for the operator, including waiting and retry states.
pub fn prompt(flow: &dyn VerificationFlow, session: &VerificationSession) -> Prompt {
    if let Some(pending) = &session.pending {
        return Prompt::Waiting {
            on: pending.describe().to_string(),
        };
    }
    if let Some(stalled) = &session.stalled {
        return Prompt::Retry {
            failed: stalled.describe().to_string(),
        };
    }
    flow.current_prompt(session)
}

fn acknowledge(session: &VerificationSession, commit: CommitEvent, ctx: &FlowContext<'_>) -> Transition {
    match (session.scratch.short_pick, session.task.as_ref()) {
        (Some(shortfall), Some(task)) => {
            let record = exceptions::short_pick(task, shortfall, ctx.now);
            Transition::close(Closure::ShortPicked { commit: Some(commit) })
                .with_effect(Effect::Report(record))
        }
        _ => Transition::close(Closure::Committed(commit)),
    }
}

fn stall(session: &VerificationSession, reason: String) -> Transition {
    let mut next = session.clone();
    next.stalled = next.pending.take();
    Transition::to(next).with_warning(ScanError::ServiceUnavailable(reason))
}

/// Drop the refused commit; the operator re-enters from the step that produced it.
fn reopen(session: &VerificationSession) -> Transition {
    let mut next = session.clone();
    next.pending = None;
    next.scratch.short_pick = None;
    Transition::to(next)
}

fn resume(session: &VerificationSession, stalled: Pending) -> Transition {
    let effect = match &stalled {
        Pending::Lots(query) => Effect::FetchLots(query.clone()),
        Pending::Commit(commit) => Effect::Commit(commit.clone()),
    };
    let mut next = session.clone();
    next.stalled = None;
    next.pending = Some(stalled);
    Transition::to(next).with_effect(effect)
}

/// Put a call in flight.
pub(crate) fn await_call(mut session: VerificationSession, pending: Pending) -> Transition {
    let effect = match &pending {
        Pending::Lots(query) => Effect::FetchLots(query.clone()),
        Pending::Commit(commit) => Effect::Commit(commit.clone()),
    };
    session.pending = Some(pending);
    Transition::to(session).with_effect(effect)
}

/// Keep lot, expiry and serial carried by a structured scan.
pub(crate) fn capture_lot(session: &mut VerificationSession, scan: &ScanInput) {
    if scan.lot.is_some() {
        session.scratch.captured_lot = scan.lot.clone();
    }
    if scan.expiry.is_some() {
        session.scratch.captured_expiry = scan.expiry;
    }
    capture_serial(session, scan);
}

pub(crate) fn capture_serial(session: &mut VerificationSession, scan: &ScanInput) {
    if scan.serial.is_some() {
        session.scratch.captured_serial = scan.serial.clone();
    }
}
