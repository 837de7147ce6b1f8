//! A scanning terminal: keystroke classifier, engine and backend wired together.
//!
//! Effects queued by the engine run synchronously against the [`InventoryService`]
//! until the engine has nothing left to ask for.

use std::sync::Arc;

use tracing::{error, info, warn};

use floorscan_core::{EngineConfig, Mode, ScanResult};
use floorscan_events::{EventBus, EventEnvelope, FloorEvent, FloorPublisher};
use floorscan_scan::{KeyEvent, ScanInputClassifier, ScanToken};
use floorscan_verification::{
    Effect, ExceptionReporter, LocationMaster, Outcome, Prompt, ScanEngine,
};

use crate::inventory::{InventoryService, ServiceError};

pub struct ScanTerminal<S, B> {
    classifier: ScanInputClassifier,
    engine: ScanEngine,
    service: S,
    publisher: Arc<FloorPublisher<B>>,
    reporter: ExceptionReporter<B>,
}

impl<S, B> ScanTerminal<S, B>
where
    S: InventoryService,
    B: EventBus<EventEnvelope<FloorEvent>>,
{
    /// Start a terminal in `mode` with the backend's current task list.
    pub fn new(
        mode: Mode,
        config: EngineConfig,
        locations: LocationMaster,
        service: S,
        publisher: Arc<FloorPublisher<B>>,
    ) -> Result<Self, ServiceError> {
        let tasks = service.pending_tasks(mode)?;
        info!(%mode, tasks = tasks.len(), terminal = publisher.terminal_id(), "terminal started");
        Ok(Self {
            classifier: ScanInputClassifier::new(&config),
            engine: ScanEngine::new(mode, config, locations, tasks),
            service,
            reporter: ExceptionReporter::new(Arc::clone(&publisher)),
            publisher,
        })
    }

    pub fn engine(&self) -> &ScanEngine {
        &self.engine
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn prompt(&self) -> Prompt {
        self.engine.prompt()
    }

    /// Feed one keystroke. Returns an outcome only when the keystroke completed a scan.
    pub fn key(&mut self, event: KeyEvent) -> Option<ScanResult<Outcome>> {
        let token = self.classifier.push(event)?;
        Some(self.scan(&token))
    }

    pub fn scan(&mut self, token: &ScanToken) -> ScanResult<Outcome> {
        let outcome = self.engine.submit(token);
        self.drive(outcome)
    }

    pub fn select_lot(&mut self, index: usize) -> ScanResult<Outcome> {
        let outcome = self.engine.select_lot(index);
        self.drive(outcome)
    }

    pub fn enter_quantity(&mut self, qty: u32, confirm_override: bool) -> ScanResult<Outcome> {
        let outcome = self.engine.enter_quantity(qty, confirm_override);
        self.drive(outcome)
    }

    pub fn short_pick(&mut self, found_qty: u32) -> ScanResult<Outcome> {
        let outcome = self.engine.short_pick(found_qty);
        self.drive(outcome)
    }

    /// Cancel the session. Keystrokes typed so far are dropped with it.
    pub fn cancel(&mut self) -> ScanResult<Outcome> {
        self.classifier.reset();
        let outcome = self.engine.cancel();
        self.drive(outcome)
    }

    pub fn retry(&mut self) -> ScanResult<Outcome> {
        let outcome = self.engine.retry();
        self.drive(outcome)
    }

    /// Run queued effects, folding their answers into `outcome`.
    ///
    /// Rejected inputs can still queue mismatch reports, so effects run on both paths.
    fn drive(&mut self, outcome: ScanResult<Outcome>) -> ScanResult<Outcome> {
        let mut last = outcome;
        loop {
            let effects = self.engine.take_effects();
            if effects.is_empty() {
                break;
            }
            for effect in effects {
                let answer = match effect {
                    Effect::FetchLots(query) => {
                        let lots = self.service.lot_candidates(&query).map_err(|e| e.to_string());
                        Some(self.engine.lots_loaded(lots))
                    }
                    Effect::Commit(commit) => match self.service.commit(&commit) {
                        Ok(()) => {
                            if let Err(err) = self.publisher.publish(FloorEvent::Committed(commit)) {
                                warn!(error = ?err, "commit accepted but not published");
                            }
                            Some(self.engine.commit_succeeded())
                        }
                        Err(ServiceError::Rejected(reason)) => Some(self.engine.commit_rejected(reason)),
                        Err(err) => {
                            error!(error = %err, "commit failed");
                            Some(self.engine.commit_failed(err.to_string()))
                        }
                    },
                    Effect::Report(record) => {
                        if let Err(err) = self.service.record_exception(&record) {
                            warn!(error = %err, kind = ?record.kind, "exception not recorded by backend");
                        }
                        self.reporter.report(record);
                        None
                    }
                };
                if let Some(answer) = answer {
                    last = merge(last, answer);
                }
            }
        }
        self.refresh();
        last
    }

    fn refresh(&mut self) {
        if !self.engine.needs_refresh() {
            return;
        }
        match self.service.pending_tasks(self.engine.mode()) {
            Ok(tasks) => self.engine.replace_tasks(tasks),
            Err(err) => warn!(error = %err, "task list refresh failed; keeping the stale list"),
        }
    }
}

/// Later answers decide the prompt; notices from every step are kept.
fn merge(earlier: ScanResult<Outcome>, later: ScanResult<Outcome>) -> ScanResult<Outcome> {
    match (earlier, later) {
        (Ok(first), Ok(mut next)) => {
            next.warnings.splice(0..0, first.warnings);
            if next.closed.is_none() {
                next.closed = first.closed;
            }
            Ok(next)
        }
        (Err(err), _) | (_, Err(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InMemoryInventoryService, StockRecord};
    use chrono::{Duration, Utc};
    use floorscan_core::ScanError;
    use floorscan_events::{CommitEvent, InMemoryEventBus, MoveCommitted};
    use floorscan_scan::Key;
    use floorscan_verification::{LotCandidate, Task, TaskStatus};

    type TestTerminal = ScanTerminal<InMemoryInventoryService, InMemoryEventBus<EventEnvelope<FloorEvent>>>;

    fn test_terminal(tasks: Vec<Task>) -> TestTerminal {
        terminal_with_stock(Mode::Pick, tasks, 20)
    }

    fn terminal_with_stock(mode: Mode, tasks: Vec<Task>, on_hand: u32) -> TestTerminal {
        let service = InMemoryInventoryService::new(
            vec![StockRecord {
                product_code: "SKU1".into(),
                location_code: "A-01".into(),
                lots: vec![LotCandidate::new("L1", None, on_hand)],
            }],
            tasks,
        );
        let publisher = Arc::new(FloorPublisher::new(InMemoryEventBus::new(), "RF-TEST"));
        ScanTerminal::new(
            mode,
            EngineConfig::default(),
            LocationMaster::unrestricted(),
            service,
            publisher,
        )
        .unwrap()
    }

    fn type_burst(terminal: &mut TestTerminal, text: &str) -> Option<ScanResult<Outcome>> {
        let start = Utc::now();
        let mut last = None;
        for (i, c) in text.chars().enumerate() {
            last = terminal.key(KeyEvent::new(Key::Char(c), start + Duration::milliseconds(10 * i as i64)));
        }
        let end = start + Duration::milliseconds(10 * text.len() as i64);
        last.or_else(|| terminal.key(KeyEvent::new(Key::Commit, end)))
    }

    #[test]
    fn keystroke_bursts_drive_a_pick_to_completion() {
        let mut terminal = test_terminal(vec![Task::pick("A-01", "SKU1", 4, vec![])]);

        type_burst(&mut terminal, "A-01").unwrap().unwrap();
        let out = type_burst(&mut terminal, "SKU1").unwrap().unwrap();
        assert_eq!(out.prompt, Prompt::EnterQuantity { expected: Some(4) });

        let out = terminal.enter_quantity(4, false).unwrap();
        assert!(out.closed.is_some());
        assert_eq!(terminal.service().on_hand("SKU1", "A-01"), 16);
        assert!(terminal.engine().tasks().is_empty());
        assert!(!terminal.engine().needs_refresh());
    }

    #[test]
    fn commit_outage_leaves_retry_prompt() {
        let mut terminal = test_terminal(vec![Task::pick("A-01", "SKU1", 4, vec![])]);
        terminal.service().fail_next_commits(1);

        terminal.scan(&ScanToken::scanned("A-01", Utc::now())).unwrap();
        terminal.scan(&ScanToken::scanned("SKU1", Utc::now())).unwrap();
        let out = terminal.enter_quantity(4, false).unwrap();
        assert_eq!(out.prompt, Prompt::Retry { failed: "commit".into() });
        assert_eq!(terminal.engine().tasks()[0].status, TaskStatus::InProgress);

        let out = terminal.retry().unwrap();
        assert!(out.closed.is_some());
        assert_eq!(terminal.service().commits().len(), 1);
    }

    #[test]
    fn refused_move_returns_to_destination_without_retry() {
        let mut terminal = terminal_with_stock(Mode::Move, vec![], 0);

        terminal.scan(&ScanToken::scanned("A-01", Utc::now())).unwrap();
        terminal.scan(&ScanToken::scanned("SKU1", Utc::now())).unwrap();
        terminal.enter_quantity(5, false).unwrap();
        match terminal.scan(&ScanToken::scanned("B-02", Utc::now())) {
            Err(ScanError::CommitRejected(reason)) => assert!(reason.contains("only 0")),
            other => panic!("Expected CommitRejected, got {other:?}"),
        }

        let session = terminal.engine().session().unwrap();
        assert!(session.stalled.is_none() && !session.is_busy());
        assert_eq!(terminal.prompt(), Prompt::ScanDestination { expected: None });
        assert_eq!(terminal.retry().unwrap_err().code(), "UNEXPECTED_INPUT");

        terminal.cancel().unwrap();
        assert!(terminal.engine().session().is_none());
        assert!(terminal.service().commits().is_empty());
    }

    #[test]
    fn pick_refused_after_bin_was_emptied_keeps_quantity_step() {
        let mut terminal = terminal_with_stock(Mode::Pick, vec![Task::pick("A-01", "SKU1", 3, vec![])], 3);

        terminal.scan(&ScanToken::scanned("A-01", Utc::now())).unwrap();
        let out = terminal.scan(&ScanToken::scanned("SKU1", Utc::now())).unwrap();
        assert_eq!(out.prompt, Prompt::EnterQuantity { expected: Some(3) });

        // Another terminal moves the stock away after the lot lookup.
        terminal
            .service()
            .commit(&CommitEvent::Move(MoveCommitted {
                product_code: "SKU1".into(),
                source_location: "A-01".into(),
                dest_location: "B-09".into(),
                qty: 3,
                lot_number: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();

        let err = terminal.enter_quantity(3, false).unwrap_err();
        assert_eq!(err.code(), "COMMIT_REJECTED");
        assert_eq!(terminal.prompt(), Prompt::EnterQuantity { expected: Some(3) });
        assert_eq!(terminal.engine().tasks()[0].status, TaskStatus::InProgress);
        assert_eq!(terminal.service().tasks()[0].completed_qty, 0);

        let out = terminal.short_pick(0).unwrap();
        assert!(out.closed.is_some());
    }

    #[test]
    fn cancel_drops_half_typed_scan() {
        let mut terminal = test_terminal(vec![Task::pick("A-01", "SKU1", 4, vec![])]);
        type_burst(&mut terminal, "A-01").unwrap().unwrap();

        let t0 = Utc::now();
        for (i, c) in "SK".chars().enumerate() {
            assert!(terminal.key(KeyEvent::new(Key::Char(c), t0 + Duration::milliseconds(5 * i as i64))).is_none());
        }
        terminal.cancel().unwrap();

        // Only "U1" is left after the cancel: below the minimum length, so nothing opens.
        let t1 = t0 + Duration::milliseconds(10);
        terminal.key(KeyEvent::new(Key::Char('U'), t1));
        terminal.key(KeyEvent::new(Key::Char('1'), t1 + Duration::milliseconds(5)));
        assert!(terminal.key(KeyEvent::new(Key::Commit, t1 + Duration::milliseconds(10))).is_none());
        assert!(terminal.engine().session().is_none());
    }
}
