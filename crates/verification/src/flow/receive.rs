//! RECEIVE: product first, then a free-form putaway bin, then the quantity.

use floorscan_core::{Mode, ScanError, ScanResult};
use floorscan_events::{CommitEvent, ReceiveCommitted};
use floorscan_scan::ScanInput;

use super::{FlowContext, MatchedBy, Transition, VerificationFlow, await_call, capture_lot};
use crate::session::{Pending, Prompt, SessionState, Step, VerificationSession};
use crate::task::Task;

const STEPS: &[Step] = &[Step::Item, Step::Location, Step::Quantity];

#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiveFlow;

impl VerificationFlow for ReceiveFlow {
    fn mode(&self) -> Mode {
        Mode::Receive
    }

    fn sequence(&self) -> &'static [Step] {
        STEPS
    }

    fn open(
        &self,
        task: Option<Task>,
        matched: MatchedBy,
        scan: &ScanInput,
        _ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        let task = task.ok_or_else(|| ScanError::not_found("receiving task"))?;
        match matched {
            MatchedBy::Product => {
                let mut session =
                    VerificationSession::open(Mode::Receive, Some(task), SessionState::Location);
                session.scratch.item_verified = true;
                capture_lot(&mut session, scan);
                Ok(Transition::to(session))
            }
            // Dock label scanned: the product still has to be identified.
            MatchedBy::Location => Ok(Transition::to(VerificationSession::open(
                Mode::Receive,
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
        let task = session.task.as_ref().ok_or(ScanError::NoActiveSession)?;
        match session.state {
            SessionState::Item => {
                if !scan.matches_product(&task.product_code) {
                    return Err(ScanError::WrongItem {
                        expected: task.product_code.clone(),
                        scanned: scan.raw.clone(),
                    });
                }
                let mut next = session.clone().with_state(SessionState::Location);
                next.scratch.item_verified = true;
                capture_lot(&mut next, scan);
                Ok(Transition::to(next))
            }
            SessionState::Location => {
                if scan.is_structured() {
                    return Err(ScanError::invalid_location(scan.raw.clone()));
                }
                let bin = ctx.locations.resolve(&scan.raw)?;
                let mut next = session.clone().with_state(SessionState::Quantity);
                next.scratch.location = Some(bin);
                Ok(Transition::to(next))
            }
            _ => Err(ScanError::unexpected(session.step(), "scan")),
        }
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
        let task = session.task.as_ref().ok_or(ScanError::NoActiveSession)?;
        let location = session
            .scratch
            .location
            .clone()
            .ok_or_else(|| ScanError::unexpected(session.step(), "quantity before putaway bin"))?;

        if qty == 0 {
            return Err(ScanError::invalid_quantity("nothing received"));
        }
        let expected = task.remaining_qty();
        if qty > expected && !confirm_override {
            return Err(ScanError::OverrideRequired {
                expected,
                entered: qty,
            });
        }

        let commit = CommitEvent::Receive(ReceiveCommitted {
            task_id: task.id,
            product_code: task.product_code.clone(),
            location_code: location,
            qty,
            lot_number: session.scratch.captured_lot.clone(),
            expiry_date: session.scratch.captured_expiry,
            serial_number: session.scratch.captured_serial.clone(),
            occurred_at: ctx.now,
        });
        let mut next = session.clone();
        next.scratch.captured_qty = Some(qty);
        Ok(await_call(next, Pending::Commit(commit)))
    }

    fn current_prompt(&self, session: &VerificationSession) -> Prompt {
        let task = session.task.as_ref();
        match session.state {
            SessionState::Item => Prompt::ScanItem {
                expected: task.map(|t| t.product_code.clone()),
            },
            SessionState::Location => Prompt::ScanLocation { expected: None },
            _ => Prompt::EnterQuantity {
                expected: task.map(Task::remaining_qty),
            },
        }
    }
}
