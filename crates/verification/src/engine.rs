//! The scan engine: one operator, one mode, one session at a time.
//!
//! `ScanEngine` owns the local task board and the open session. Everything that has to
//! leave the engine (lot lookups, commits, exception reports) is queued as an [`Effect`];
//! the caller runs it and feeds the answer back (`lots_loaded`, `commit_succeeded`, ...).

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use floorscan_core::{EngineConfig, Mode, ScanError, ScanResult};
use floorscan_scan::{ScanInput, ScanToken};

use crate::exceptions;
use crate::flow::{
    Closure, Effect, FlowContext, MatchedBy, SessionInput, Transition, VerificationFlow, flow_for,
    prompt, transition,
};
use crate::location::LocationMaster;
use crate::lots::LotCandidate;
use crate::selector::TaskSelector;
use crate::session::{Prompt, VerificationSession};
use crate::task::{Task, TaskBoard};

/// What the terminal shows after an accepted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub prompt: Prompt,
    /// Non-fatal notices (`PARTIAL_GS1`, `SERVICE_UNAVAILABLE`, lot fallback).
    pub warnings: Vec<ScanError>,
    pub closed: Option<Closure>,
}

pub struct ScanEngine {
    config: EngineConfig,
    flow: Box<dyn VerificationFlow>,
    board: TaskBoard,
    locations: LocationMaster,
    session: Option<VerificationSession>,
    outbox: Vec<Effect>,
}

impl ScanEngine {
    pub fn new(mode: Mode, config: EngineConfig, locations: LocationMaster, tasks: Vec<Task>) -> Self {
        Self {
            config,
            flow: flow_for(mode),
            board: TaskBoard::new(tasks),
            locations,
            session: None,
            outbox: Vec::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.flow.mode()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&VerificationSession> {
        self.session.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        self.board.tasks()
    }

    /// Set after every commit or removal: the task system should send a fresh list.
    pub fn needs_refresh(&self) -> bool {
        self.board.needs_refresh()
    }

    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        let active = self.session.as_ref().and_then(VerificationSession::task_id);
        self.board.replace(tasks, active);
    }

    /// Hand over queued effects, oldest first.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    pub fn prompt(&self) -> Prompt {
        match &self.session {
            Some(session) => prompt(self.flow.as_ref(), session),
            None => Prompt::ScanToStart { mode: self.mode() },
        }
    }

    /// Feed a token from the classifier or manual entry.
    pub fn submit(&mut self, token: &ScanToken) -> ScanResult<Outcome> {
        let scan = ScanInput::parse(token, self.config.composite_delimiter).inspect_err(|err| {
            warn!(raw = %token.raw, code = err.code(), "scan rejected");
        })?;
        self.submit_input(scan)
    }

    pub fn submit_input(&mut self, scan: ScanInput) -> ScanResult<Outcome> {
        let notices = scan.warnings.clone();
        let mut outcome = if self.session.is_some() {
            self.apply(SessionInput::Scan(scan))?
        } else {
            self.open(scan)?
        };
        outcome.warnings.splice(0..0, notices);
        Ok(outcome)
    }

    pub fn select_lot(&mut self, index: usize) -> ScanResult<Outcome> {
        self.apply(SessionInput::SelectLot(index))
    }

    pub fn enter_quantity(&mut self, qty: u32, confirm_override: bool) -> ScanResult<Outcome> {
        self.apply(SessionInput::EnterQuantity {
            qty,
            confirm_override,
        })
    }

    pub fn short_pick(&mut self, found_qty: u32) -> ScanResult<Outcome> {
        self.apply(SessionInput::ShortPick { found_qty })
    }

    pub fn cancel(&mut self) -> ScanResult<Outcome> {
        self.apply(SessionInput::Cancel)
    }

    pub fn retry(&mut self) -> ScanResult<Outcome> {
        self.apply(SessionInput::Retry)
    }

    /// Answer to an [`Effect::FetchLots`].
    pub fn lots_loaded(&mut self, result: Result<Vec<LotCandidate>, String>) -> ScanResult<Outcome> {
        if self.session.is_none() {
            debug!("lot list arrived after the session closed; ignored");
            return Ok(self.idle_outcome());
        }
        match result {
            Ok(lots) => self.apply(SessionInput::LotsLoaded(lots)),
            Err(reason) => self.apply(SessionInput::LotsFailed(reason)),
        }
    }

    /// Answer to an [`Effect::Commit`]: the inventory service accepted it.
    pub fn commit_succeeded(&mut self) -> ScanResult<Outcome> {
        self.apply(SessionInput::CommitAcknowledged)
    }

    /// Answer to an [`Effect::Commit`]: the service could not be reached. The session
    /// stays open on a retry prompt.
    pub fn commit_failed(&mut self, reason: impl Into<String>) -> ScanResult<Outcome> {
        self.apply(SessionInput::CommitFailed(reason.into()))
    }

    /// Answer to an [`Effect::Commit`]: the service refused it. The session goes back to
    /// the step that produced the commit and the refusal is returned to the operator.
    pub fn commit_rejected(&mut self, reason: impl Into<String>) -> ScanResult<Outcome> {
        let reason = reason.into();
        self.apply(SessionInput::CommitRejected(reason.clone()))?;
        let err = ScanError::CommitRejected(reason);
        warn!(step = ?self.session.as_ref().map(VerificationSession::step), error = %err, "commit rejected");
        Err(err)
    }

    fn idle_outcome(&self) -> Outcome {
        Outcome {
            prompt: self.prompt(),
            warnings: Vec::new(),
            closed: None,
        }
    }

    fn open(&mut self, scan: ScanInput) -> ScanResult<Outcome> {
        let mode = self.mode();
        let (task, matched) = if mode.is_task_driven() {
            let (task, matched) = TaskSelector::select(mode, &scan, self.board.pending())
                .inspect_err(|err| warn!(%mode, raw = %scan.raw, code = err.code(), "no task for scan"))?;
            (Some(task), matched)
        } else {
            (None, MatchedBy::Location)
        };

        let ctx = FlowContext {
            locations: &self.locations,
            now: Utc::now(),
        };
        let opened = self
            .flow
            .open(task, matched, &scan, &ctx)
            .inspect_err(|err| warn!(%mode, raw = %scan.raw, code = err.code(), "session not opened"))?;

        if let Some(session) = &opened.session {
            if let Some(id) = session.task_id() {
                self.board.mark_in_progress(id);
            }
            info!(%mode, task = ?session.task_id(), ?matched, step = %session.step(), "session opened");
        }
        Ok(self.settle(opened))
    }

    fn apply(&mut self, input: SessionInput) -> ScanResult<Outcome> {
        let session = self.session.as_ref().ok_or(ScanError::NoActiveSession)?;
        let now = Utc::now();
        let ctx = FlowContext {
            locations: &self.locations,
            now,
        };

        match transition(self.flow.as_ref(), session, input, &ctx) {
            Ok(next) => {
                debug_assert!(
                    next.session
                        .as_ref()
                        .is_none_or(|s| self.step_index(s) >= self.step_index(session)),
                    "session stepped backwards"
                );
                Ok(self.settle(next))
            }
            Err(err) => {
                warn!(step = %session.step(), code = err.code(), error = %err, "input rejected");
                self.report_mismatch(&err, now);
                Err(err)
            }
        }
    }

    fn step_index(&self, session: &VerificationSession) -> usize {
        let step = session.step();
        self.flow
            .sequence()
            .iter()
            .position(|s| *s == step)
            .unwrap_or(usize::MAX)
    }

    fn report_mismatch(&mut self, err: &ScanError, now: DateTime<Utc>) {
        if !self.config.report_mismatches {
            return;
        }
        let Some(task) = self.session.as_ref().and_then(|s| s.task.as_ref()) else {
            return;
        };
        let record = match err {
            ScanError::WrongBin { .. } => exceptions::location_mismatch(task, now),
            ScanError::WrongItem { .. } => exceptions::item_mismatch(task, now),
            _ => return,
        };
        self.outbox.push(Effect::Report(record));
    }

    fn settle(&mut self, transition: Transition) -> Outcome {
        let Transition {
            session,
            effects,
            warnings,
            closed,
        } = transition;

        for effect in &effects {
            if let Effect::Commit(commit) = effect {
                info!(task = ?commit.task_id(), "commit dispatched");
            }
        }
        self.outbox.extend(effects);

        if let Some(closure) = &closed {
            let task_id = self.session.as_ref().and_then(VerificationSession::task_id);
            match closure {
                Closure::Committed(commit) => {
                    self.board.apply_commit(commit);
                    info!(task = ?task_id, "session committed");
                }
                Closure::Cancelled => {
                    if let Some(id) = task_id {
                        self.board.release(id);
                    }
                    info!(task = ?task_id, "session cancelled");
                }
                Closure::ShortPicked { commit } => {
                    if let Some(commit) = commit {
                        self.board.apply_commit(commit);
                    }
                    if let Some(id) = task_id {
                        self.board.remove(id);
                    }
                    info!(task = ?task_id, "short pick recorded");
                }
            }
        }

        for warning in &warnings {
            warn!(code = warning.code(), "{warning}");
        }

        self.session = session;
        Outcome {
            prompt: self.prompt(),
            warnings,
            closed,
        }
    }
}
