//! PICK / COUNT / REPLENISH: the bin-first template.
//!
//! `LOCATION -> ITEM -> [LOT_SELECT -> LOT_VERIFY] -> QUANTITY` (REPLENISH ends at
//! `DESTINATION` instead of `QUANTITY`). Lots are looked up once both bin and product are
//! confirmed.

use floorscan_core::{Mode, ScanError, ScanResult, codes_match};
use floorscan_events::{CommitEvent, CountCommitted, PickCommitted, ReplenishCommitted};
use floorscan_scan::ScanInput;

use super::{
    Closure, Effect, FlowContext, MatchedBy, Transition, VerificationFlow, await_call,
    capture_lot, capture_serial,
};
use crate::exceptions;
use crate::lots::{LotCandidate, LotQuery, LotSelector};
use crate::session::{Pending, Prompt, SessionState, Step, VerificationSession};
use crate::task::{Task, TaskKind};

const PICK_STEPS: &[Step] = &[
    Step::Location,
    Step::Item,
    Step::LotSelect,
    Step::LotVerify,
    Step::Quantity,
];

const REPLENISH_STEPS: &[Step] = &[
    Step::Location,
    Step::Item,
    Step::LotSelect,
    Step::LotVerify,
    Step::Destination,
];

#[derive(Debug, Clone, Copy)]
pub struct TemplateFlow {
    mode: Mode,
}

impl TemplateFlow {
    pub fn new(mode: Mode) -> Self {
        debug_assert!(matches!(mode, Mode::Pick | Mode::Count | Mode::Replenish));
        Self { mode }
    }

    /// Step that follows lot resolution.
    fn after_lot(&self, session: VerificationSession) -> VerificationSession {
        match self.mode {
            Mode::Replenish => session.with_state(SessionState::Destination),
            _ => session.with_state(SessionState::Quantity),
        }
    }

    fn request_lots(&self, session: VerificationSession, task: &Task) -> Transition {
        let query = LotQuery {
            product_code: task.product_code.clone(),
            location_code: task.target_location.clone(),
        };
        await_call(session, Pending::Lots(query))
    }

    fn commit_pick(
        &self,
        session: &VerificationSession,
        task: &Task,
        qty: u32,
        override_applied: bool,
        ctx: &FlowContext<'_>,
    ) -> Transition {
        let commit = CommitEvent::Pick(PickCommitted {
            task_id: task.id,
            product_code: task.product_code.clone(),
            location_code: task.target_location.clone(),
            qty,
            lot_number: session.scratch.captured_lot.clone(),
            serial_number: session.scratch.captured_serial.clone(),
            allocations: task.allocate(qty),
            override_applied,
            occurred_at: ctx.now,
        });
        let mut next = session.clone();
        next.scratch.captured_qty = Some(qty);
        await_call(next, Pending::Commit(commit))
    }
}

fn task_of(session: &VerificationSession) -> ScanResult<&Task> {
    session.task.as_ref().ok_or(ScanError::NoActiveSession)
}

fn choose(session: &mut VerificationSession, lot: &LotCandidate) {
    session.scratch.captured_lot = Some(lot.lot_number.clone());
    session.scratch.captured_expiry = lot.expiry_date;
    session.scratch.lot_available = Some(lot.available_qty);
}

impl VerificationFlow for TemplateFlow {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn sequence(&self) -> &'static [Step] {
        match self.mode {
            Mode::Replenish => REPLENISH_STEPS,
            _ => PICK_STEPS,
        }
    }

    fn open(
        &self,
        task: Option<Task>,
        matched: MatchedBy,
        scan: &ScanInput,
        _ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        let task = task.ok_or_else(|| ScanError::not_found("task"))?;
        match matched {
            // The bin still has to be confirmed physically.
            MatchedBy::Product => {
                let mut session = VerificationSession::open(self.mode, Some(task), SessionState::Location);
                session.scratch.item_verified = true;
                capture_lot(&mut session, scan);
                Ok(Transition::to(session))
            }
            MatchedBy::Location => Ok(Transition::to(VerificationSession::open(
                self.mode,
                Some(task),
                SessionState::Item,
            ))),
        }
    }

    fn submit_scan(
        &self,
        session: &VerificationSession,
        scan: &ScanInput,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        let task = task_of(session)?;

        match &session.state {
            SessionState::Location => {
                if !scan.matches_location(&task.target_location) {
                    return Err(ScanError::WrongBin {
                        expected: task.target_location.clone(),
                        scanned: scan.raw.clone(),
                    });
                }
                if session.scratch.item_verified {
                    Ok(self.request_lots(session.clone(), task))
                } else {
                    Ok(Transition::to(session.clone().with_state(SessionState::Item)))
                }
            }
            SessionState::Item => {
                if !scan.matches_product(&task.product_code) {
                    return Err(ScanError::WrongItem {
                        expected: task.product_code.clone(),
                        scanned: scan.raw.clone(),
                    });
                }
                let mut next = session.clone();
                next.scratch.item_verified = true;
                capture_lot(&mut next, scan);
                Ok(self.request_lots(next, task))
            }
            SessionState::LotVerify { chosen } => {
                // A label naming another product is wrong even when its lot text agrees.
                if scan
                    .product_code
                    .as_deref()
                    .is_some_and(|product| !codes_match(product, &task.product_code))
                {
                    return Err(ScanError::WrongItem {
                        expected: task.product_code.clone(),
                        scanned: scan.raw.clone(),
                    });
                }
                if !codes_match(scan.lot_text(), &chosen.lot_number) {
                    return Err(ScanError::WrongLot {
                        expected: chosen.lot_number.clone(),
                        scanned: scan.raw.clone(),
                    });
                }
                let mut next = session.clone();
                choose(&mut next, chosen);
                capture_serial(&mut next, scan);
                Ok(Transition::to(self.after_lot(next)))
            }
            SessionState::Destination => {
                let TaskKind::Replenish { dest_location } = &task.kind else {
                    return Err(ScanError::unexpected(Step::Destination, "scan"));
                };
                if !scan.matches_location(dest_location) {
                    return Err(ScanError::WrongDest {
                        expected: dest_location.clone(),
                        scanned: scan.raw.clone(),
                    });
                }
                let commit = CommitEvent::Replenish(ReplenishCommitted {
                    task_id: task.id,
                    occurred_at: ctx.now,
                });
                let mut next = session.clone();
                next.scratch.dest_location = Some(dest_location.clone());
                next.scratch.captured_qty = Some(task.remaining_qty());
                Ok(await_call(next, Pending::Commit(commit)))
            }
            SessionState::LotSelect { .. } | SessionState::Quantity => {
                Err(ScanError::unexpected(session.step(), "scan"))
            }
        }
    }

    fn lots_loaded(
        &self,
        session: &VerificationSession,
        lots: Vec<LotCandidate>,
    ) -> ScanResult<Transition> {
        let ranked = LotSelector::rank(lots.into_iter().filter(|l| l.available_qty > 0).collect());
        let mut next = session.clone();
        let mut warnings = Vec::new();

        // A structured scan already named the lot: it stands in for LOT_VERIFY as long as
        // the bin actually holds that lot.
        if let Some(lot) = next.scratch.captured_lot.clone() {
            if ranked.is_empty() {
                return Ok(Transition::to(self.after_lot(next)));
            }
            if let Some(hit) = ranked.iter().find(|r| codes_match(&r.candidate.lot_number, &lot)) {
                let candidate = hit.candidate.clone();
                choose(&mut next, &candidate);
                return Ok(Transition::to(self.after_lot(next)));
            }
            warnings.push(ScanError::WrongLot {
                expected: ranked
                    .iter()
                    .map(|r| r.candidate.lot_number.as_str())
                    .collect::<Vec<_>>()
                    .join("/"),
                scanned: lot,
            });
            next.scratch.captured_lot = None;
            next.scratch.captured_expiry = None;
        }

        let mut transition = match ranked.len() {
            0 => Transition::to(self.after_lot(next)),
            1 => {
                choose(&mut next, &ranked[0].candidate);
                Transition::to(self.after_lot(next))
            }
            _ => Transition::to(next.with_state(SessionState::LotSelect { candidates: ranked })),
        };
        transition.warnings.extend(warnings);
        Ok(transition)
    }

    fn select_lot(&self, session: &VerificationSession, index: usize) -> ScanResult<Transition> {
        let SessionState::LotSelect { candidates } = &session.state else {
            return Err(ScanError::unexpected(session.step(), "lot choice"));
        };
        let chosen = candidates
            .get(index)
            .ok_or_else(|| ScanError::not_found(format!("lot option {index}")))?
            .candidate
            .clone();
        Ok(Transition::to(
            session.clone().with_state(SessionState::LotVerify { chosen }),
        ))
    }

    fn enter_quantity(
        &self,
        session: &VerificationSession,
        qty: u32,
        confirm_override: bool,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        if session.state != SessionState::Quantity {
            return Err(ScanError::unexpected(session.step(), "quantity"));
        }
        let task = task_of(session)?;

        match &task.kind {
            TaskKind::Pick { .. } => {
                if qty == 0 {
                    return Err(ScanError::invalid_quantity(
                        "zero picked; report a short pick instead",
                    ));
                }
                if let Some(available) = session.scratch.lot_available {
                    if qty > available {
                        return Err(ScanError::invalid_quantity(format!(
                            "only {available} available in lot"
                        )));
                    }
                }
                let expected = task.remaining_qty();
                if qty != expected && !confirm_override {
                    return Err(ScanError::OverrideRequired {
                        expected,
                        entered: qty,
                    });
                }
                Ok(self.commit_pick(session, task, qty, qty != expected, ctx))
            }
            TaskKind::Count => {
                let commit = CommitEvent::Count(CountCommitted {
                    task_id: task.id,
                    product_code: task.product_code.clone(),
                    location_code: task.target_location.clone(),
                    counted_qty: qty,
                    expected_qty: task.required_qty,
                    variance: i64::from(qty) - i64::from(task.required_qty),
                    occurred_at: ctx.now,
                });
                let mut next = session.clone();
                next.scratch.captured_qty = Some(qty);
                Ok(await_call(next, Pending::Commit(commit)))
            }
            TaskKind::Receive | TaskKind::Replenish { .. } => {
                Err(ScanError::unexpected(session.step(), "quantity"))
            }
        }
    }

    fn short_pick(
        &self,
        session: &VerificationSession,
        found_qty: u32,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        let task = task_of(session)?;
        if !matches!(task.kind, TaskKind::Pick { .. }) {
            return Err(ScanError::unexpected(session.step(), "short pick"));
        }
        let remaining = task.remaining_qty();
        if found_qty >= remaining {
            return Err(ScanError::invalid_quantity(format!(
                "{found_qty} found covers the {remaining} required; not a short pick"
            )));
        }
        let shortfall = remaining - found_qty;

        if found_qty == 0 {
            let record = exceptions::short_pick(task, shortfall, ctx.now);
            return Ok(Transition::close(Closure::ShortPicked { commit: None })
                .with_effect(Effect::Report(record)));
        }

        if session.state != SessionState::Quantity {
            return Err(ScanError::unexpected(session.step(), "partial short pick"));
        }
        let mut next = session.clone();
        next.scratch.short_pick = Some(shortfall);
        Ok(self.commit_pick(&next, task, found_qty, false, ctx))
    }

    fn current_prompt(&self, session: &VerificationSession) -> Prompt {
        let task = session.task.as_ref();
        match &session.state {
            SessionState::Location => Prompt::ScanLocation {
                expected: task.map(|t| t.target_location.clone()),
            },
            SessionState::Item => Prompt::ScanItem {
                expected: task.map(|t| t.product_code.clone()),
            },
            SessionState::LotSelect { candidates } => Prompt::ChooseLot {
                candidates: candidates.clone(),
            },
            SessionState::LotVerify { chosen } => Prompt::ScanLot {
                expected: chosen.lot_number.clone(),
            },
            SessionState::Quantity => Prompt::EnterQuantity {
                expected: match self.mode {
                    Mode::Pick => task.map(Task::remaining_qty),
                    _ => None,
                },
            },
            SessionState::Destination => Prompt::ScanDestination {
                expected: task.and_then(|t| match &t.kind {
                    TaskKind::Replenish { dest_location } => Some(dest_location.clone()),
                    _ => None,
                }),
            },
        }
    }
}
