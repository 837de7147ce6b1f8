//! MOVE: ad hoc relocation without a task.

use floorscan_core::{Mode, ScanError, ScanResult};
use floorscan_events::{CommitEvent, MoveCommitted};
use floorscan_scan::ScanInput;

use super::{FlowContext, MatchedBy, Transition, VerificationFlow, await_call, capture_lot};
use crate::session::{Pending, Prompt, SessionState, Step, VerificationSession};
use crate::task::Task;

const STEPS: &[Step] = &[Step::Location, Step::Item, Step::Quantity, Step::Destination];

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveFlow;

impl VerificationFlow for MoveFlow {
    fn mode(&self) -> Mode {
        Mode::Move
    }

    fn sequence(&self) -> &'static [Step] {
        STEPS
    }

    /// The opening scan is the source bin.
    fn open(
        &self,
        _task: Option<Task>,
        _matched: MatchedBy,
        scan: &ScanInput,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        let session = VerificationSession::open(Mode::Move, None, SessionState::Location);
        self.submit_scan(&session, scan, ctx)
    }

    fn submit_scan(
        &self,
        session: &VerificationSession,
        scan: &ScanInput,
        ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        match session.state {
            SessionState::Location => {
                let source = ctx.locations.resolve(&scan.raw)?;
                let mut next = session.clone().with_state(SessionState::Item);
                next.scratch.location = Some(source);
                Ok(Transition::to(next))
            }
            SessionState::Item => {
                let product = scan.product_text().trim();
                if product.is_empty() {
                    return Err(ScanError::WrongItem {
                        expected: "a product code".to_string(),
                        scanned: scan.raw.clone(),
                    });
                }
                let mut next = session.clone().with_state(SessionState::Quantity);
                next.scratch.product_code = Some(product.to_string());
                next.scratch.item_verified = true;
                capture_lot(&mut next, scan);
                Ok(Transition::to(next))
            }
            SessionState::Destination => {
                let source = session
                    .scratch
                    .location
                    .clone()
                    .ok_or(ScanError::NoActiveSession)?;
                let dest = ctx.locations.resolve(&scan.raw)?;
                if dest.eq_ignore_ascii_case(&source) {
                    return Err(ScanError::WrongDest {
                        expected: format!("a bin other than {source}"),
                        scanned: scan.raw.clone(),
                    });
                }
                let (Some(product_code), Some(qty)) =
                    (session.scratch.product_code.clone(), session.scratch.captured_qty)
                else {
                    return Err(ScanError::unexpected(session.step(), "destination"));
                };

                let commit = CommitEvent::Move(MoveCommitted {
                    product_code,
                    source_location: source,
                    dest_location: dest.clone(),
                    qty,
                    lot_number: session.scratch.captured_lot.clone(),
                    occurred_at: ctx.now,
                });
                let mut next = session.clone();
                next.scratch.dest_location = Some(dest);
                Ok(await_call(next, Pending::Commit(commit)))
            }
            _ => Err(ScanError::unexpected(session.step(), "scan")),
        }
    }

    fn enter_quantity(
        &self,
        session: &VerificationSession,
        qty: u32,
        _confirm_override: bool,
        _ctx: &FlowContext<'_>,
    ) -> ScanResult<Transition> {
        if session.state != SessionState::Quantity {
            return Err(ScanError::unexpected(session.step(), "quantity"));
        }
        if qty == 0 {
            return Err(ScanError::invalid_quantity("nothing to move"));
        }
        let mut next = session.clone().with_state(SessionState::Destination);
        next.scratch.captured_qty = Some(qty);
        Ok(Transition::to(next))
    }

    fn current_prompt(&self, session: &VerificationSession) -> Prompt {
        match session.state {
            SessionState::Location => Prompt::ScanLocation { expected: None },
            SessionState::Item => Prompt::ScanItem { expected: None },
            SessionState::Quantity => Prompt::EnterQuantity { expected: None },
            _ => Prompt::ScanDestination { expected: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Effect, SessionInput, transition};
    use crate::location::{Location, LocationMaster, LocationType};
    use chrono::Utc;
    use floorscan_scan::ScanToken;

    fn test_master() -> LocationMaster {
        LocationMaster::new([
            Location::new("A-01", "PICK", LocationType::PickFace),
            Location::new("B-02", "PICK", LocationType::PickFace),
        ])
    }

    fn scan(raw: &str) -> ScanInput {
        ScanInput::parse(&ScanToken::scanned(raw, Utc::now()), '|').unwrap()
    }

    fn ctx(master: &LocationMaster) -> FlowContext<'_> {
        FlowContext {
            locations: master,
            now: Utc::now(),
        }
    }

    fn test_at_destination(master: &LocationMaster) -> VerificationSession {
        let session = MoveFlow
            .open(None, MatchedBy::Location, &scan("a-01"), &ctx(master))
            .unwrap()
            .session
            .unwrap();
        let session = transition(&MoveFlow, &session, SessionInput::Scan(scan("SKU5")), &ctx(master))
            .unwrap()
            .session
            .unwrap();
        transition(
            &MoveFlow,
            &session,
            SessionInput::EnterQuantity {
                qty: 3,
                confirm_override: false,
            },
            &ctx(master),
        )
        .unwrap()
        .session
        .unwrap()
    }

    #[test]
    fn unknown_source_bin_opens_nothing() {
        let master = test_master();
        let err = MoveFlow
            .open(None, MatchedBy::Location, &scan("Z-99"), &ctx(&master))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_LOCATION");
    }

    #[test]
    fn move_emits_source_destination_and_qty() {
        let master = test_master();
        let session = test_at_destination(&master);
        assert_eq!(session.step(), Step::Destination);

        let t = MoveFlow.submit_scan(&session, &scan("B-02"), &ctx(&master)).unwrap();
        match &t.effects[0] {
            Effect::Commit(CommitEvent::Move(m)) => {
                assert_eq!(m.product_code, "SKU5");
                assert_eq!(m.source_location, "A-01");
                assert_eq!(m.dest_location, "B-02");
                assert_eq!(m.qty, 3);
            }
            other => panic!("Expected move commit, got {other:?}"),
        }
    }

    #[test]
    fn destination_must_differ_from_source() {
        let master = test_master();
        let session = test_at_destination(&master);
        let err = MoveFlow.submit_scan(&session, &scan("A-01"), &ctx(&master)).unwrap_err();
        assert_eq!(err.code(), "WRONG_DEST");
    }
}
