//! End-to-end floor scenarios through `ScanTerminal`.
//!
//! Each test wires an in-memory backend, an in-memory bus and a terminal, then plays an
//! operator's scans and checks what reached the backend and the bus.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use floorscan_core::{EngineConfig, Mode, OrderId, ScanError};
use floorscan_events::{
    CommitEvent, EventEnvelope, ExceptionKind, FloorEvent, FloorPublisher, InMemoryEventBus,
    Subscription,
};
use floorscan_infra::{InMemoryInventoryService, ScanTerminal, StockRecord, WarehouseSeed};
use floorscan_scan::{Key, KeyEvent, ScanToken};
use floorscan_verification::{
    CompositeCodeInterpreter, LotCandidate, LotSelector, PackLine, PackingOrder, Prompt, Step,
    Task,
};

type Bus = InMemoryEventBus<EventEnvelope<FloorEvent>>;
type Terminal = ScanTerminal<InMemoryInventoryService, Bus>;

fn setup(
    mode: Mode,
    tasks: Vec<Task>,
    stock: Vec<StockRecord>,
) -> (Terminal, Subscription<EventEnvelope<FloorEvent>>) {
    let publisher = Arc::new(FloorPublisher::new(Bus::new(), "RF-01"));
    let sub = publisher.subscribe();
    let terminal = ScanTerminal::new(
        mode,
        EngineConfig::default(),
        WarehouseSeed::default().location_master(),
        InMemoryInventoryService::new(stock, tasks),
        publisher,
    )
    .unwrap();
    (terminal, sub)
}

fn scan(terminal: &mut Terminal, raw: &str) -> Result<Prompt, ScanError> {
    terminal
        .scan(&ScanToken::scanned(raw, Utc::now()))
        .map(|out| out.prompt)
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn committed(sub: &Subscription<EventEnvelope<FloorEvent>>) -> Vec<CommitEvent> {
    sub.drain()
        .into_iter()
        .filter_map(|env| match env.into_payload() {
            FloorEvent::Committed(commit) => Some(commit),
            FloorEvent::Exception(_) => None,
        })
        .collect()
}

#[test]
fn scenario_a_pick_commits_after_bin_item_and_quantity() {
    let stock = vec![StockRecord {
        product_code: "SKU1".into(),
        location_code: "A-01".into(),
        lots: vec![LotCandidate::new("L1", None, 8)],
    }];
    let (mut terminal, sub) = setup(Mode::Pick, vec![Task::pick("A-01", "SKU1", 5, vec![])], stock);

    // Scanner burst: 6ms between keys.
    let t0 = Utc::now();
    for (i, c) in "A-01".chars().enumerate() {
        let at = t0 + Duration::milliseconds(6 * i as i64);
        assert!(terminal.key(KeyEvent::new(Key::Char(c), at)).is_none());
    }
    let result = terminal.key(KeyEvent::new(Key::Commit, t0 + Duration::milliseconds(24)));
    assert_eq!(
        result.unwrap().unwrap().prompt,
        Prompt::ScanItem { expected: Some("SKU1".into()) }
    );

    let prompt = scan(&mut terminal, "SKU1").unwrap();
    assert_eq!(prompt, Prompt::EnterQuantity { expected: Some(5) });
    terminal.enter_quantity(5, false).unwrap();

    match committed(&sub).as_slice() {
        [CommitEvent::Pick(p)] => {
            assert_eq!(p.product_code, "SKU1");
            assert_eq!(p.location_code, "A-01");
            assert_eq!(p.qty, 5);
            assert_eq!(p.lot_number.as_deref(), Some("L1"));
            assert!(!p.override_applied);
        }
        other => panic!("Expected one pick commit, got {other:?}"),
    }
    assert_eq!(terminal.service().on_hand("SKU1", "A-01"), 3);
    assert_eq!(terminal.prompt(), Prompt::ScanToStart { mode: Mode::Pick });
}

#[test]
fn scenario_b_wrong_bin_is_rejected_and_step_kept() {
    let (mut terminal, sub) = setup(Mode::Pick, vec![Task::pick("A-01", "SKU1", 5, vec![])], vec![]);

    scan(&mut terminal, "SKU1").unwrap();
    match scan(&mut terminal, "A-02") {
        Err(ScanError::WrongBin { expected, scanned }) => {
            assert_eq!(expected, "A-01");
            assert_eq!(scanned, "A-02");
        }
        other => panic!("Expected WrongBin, got {other:?}"),
    }
    assert_eq!(terminal.engine().session().unwrap().step(), Step::Location);

    let events = sub.drain();
    assert_eq!(events.len(), 1);
    match events[0].payload() {
        FloorEvent::Exception(r) => assert_eq!(r.kind, ExceptionKind::LocationMismatch),
        other => panic!("Expected mismatch report, got {other:?}"),
    }

    // Operator retries at the same step.
    assert_eq!(
        scan(&mut terminal, "a-01").unwrap(),
        Prompt::EnterQuantity { expected: Some(5) }
    );
}

#[test]
fn scenario_c_receive_gs1_label_carries_lot_and_expiry() {
    let (mut terminal, sub) = setup(Mode::Receive, vec![Task::receive("DOCK1", "SKU2", 10)], vec![]);

    let prompt = scan(&mut terminal, "(01)SKU2(17)251231(10)LOTA").unwrap();
    assert_eq!(prompt, Prompt::ScanLocation { expected: None });
    scan(&mut terminal, "DOCK1").unwrap();
    terminal.enter_quantity(10, false).unwrap();

    match committed(&sub).as_slice() {
        [CommitEvent::Receive(r)] => {
            assert_eq!(r.product_code, "SKU2");
            assert_eq!(r.location_code, "DOCK1");
            assert_eq!(r.qty, 10);
            assert_eq!(r.lot_number.as_deref(), Some("LOTA"));
            assert_eq!(r.expiry_date, Some(ymd(2025, 12, 31)));
        }
        other => panic!("Expected one receive commit, got {other:?}"),
    }
    assert_eq!(terminal.service().on_hand("SKU2", "DOCK1"), 10);
}

#[test]
fn scenario_d_composite_packing_stops_at_required_quantity() {
    let order = PackingOrder::new(OrderId::new(), vec![PackLine::new("SKU3", 2)]);
    let mut packer = CompositeCodeInterpreter::new(order, &EngineConfig::default());
    let token = ScanToken::scanned("SKU3|LOT9", Utc::now());

    assert_eq!(packer.scan(&token).unwrap().packed_qty, 1);
    let second = packer.scan(&token).unwrap();
    assert_eq!(second.packed_qty, 2);
    assert!(second.line_complete);
    assert!(second.order_complete);

    match packer.scan(&token) {
        Err(ScanError::AlreadyComplete(product)) => assert_eq!(product, "SKU3"),
        other => panic!("Expected AlreadyComplete, got {other:?}"),
    }
}

#[test]
fn scenario_e_fefo_ranks_null_expiry_last() {
    let ranked = LotSelector::rank(vec![
        LotCandidate::new("A", Some(ymd(2025, 1, 1)), 1),
        LotCandidate::new("B", None, 1),
        LotCandidate::new("C", Some(ymd(2024, 6, 1)), 1),
    ]);
    let order: Vec<&str> = ranked.iter().map(|r| r.candidate.lot_number.as_str()).collect();
    assert_eq!(order, ["C", "A", "B"]);
    assert!(ranked[0].recommended);
    assert!(!ranked[1].recommended && !ranked[2].recommended);
}

#[test]
fn multi_lot_pick_goes_through_selection_and_verification() {
    let stock = vec![StockRecord {
        product_code: "SKU1".into(),
        location_code: "A-01".into(),
        lots: vec![
            LotCandidate::new("LATE", Some(ymd(2026, 1, 1)), 10),
            LotCandidate::new("EARLY", Some(ymd(2025, 1, 1)), 2),
        ],
    }];
    let (mut terminal, sub) = setup(Mode::Pick, vec![Task::pick("A-01", "SKU1", 3, vec![])], stock);

    scan(&mut terminal, "A-01").unwrap();
    match scan(&mut terminal, "SKU1").unwrap() {
        Prompt::ChooseLot { candidates } => {
            assert_eq!(candidates[0].candidate.lot_number, "EARLY");
            assert!(candidates[0].recommended);
        }
        other => panic!("Expected lot choice, got {other:?}"),
    }

    // Operator takes the later lot: EARLY cannot cover 3 units.
    let out = terminal.select_lot(1).unwrap();
    assert_eq!(out.prompt, Prompt::ScanLot { expected: "LATE".into() });
    assert!(matches!(scan(&mut terminal, "EARLY"), Err(ScanError::WrongLot { .. })));
    scan(&mut terminal, "LATE").unwrap();
    terminal.enter_quantity(3, false).unwrap();

    match committed(&sub).as_slice() {
        [CommitEvent::Pick(p)] => assert_eq!(p.lot_number.as_deref(), Some("LATE")),
        other => panic!("Expected one pick commit, got {other:?}"),
    }
    assert_eq!(terminal.service().on_hand("SKU1", "A-01"), 9);
}

#[test]
fn short_pick_removes_task_and_backend_raises_count() {
    let stock = vec![StockRecord {
        product_code: "SKU1".into(),
        location_code: "A-01".into(),
        lots: vec![LotCandidate::new("L1", None, 2)],
    }];
    let (mut terminal, sub) = setup(Mode::Pick, vec![Task::pick("A-01", "SKU1", 5, vec![])], stock);

    scan(&mut terminal, "A-01").unwrap();
    scan(&mut terminal, "SKU1").unwrap();
    let out = terminal.short_pick(2).unwrap();
    assert!(out.closed.is_some());

    let events = sub.drain();
    let kinds: Vec<&str> = events
        .iter()
        .map(|env| match env.payload() {
            FloorEvent::Committed(_) => "commit",
            FloorEvent::Exception(_) => "exception",
        })
        .collect();
    assert_eq!(kinds, ["commit", "exception"]);
    assert!(events.windows(2).all(|w| w[0].sequence_number() < w[1].sequence_number()));

    assert!(terminal.engine().tasks().is_empty());
    let counts: Vec<Task> = terminal
        .service()
        .tasks()
        .into_iter()
        .filter(|t| t.mode() == Mode::Count)
        .collect();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts[0].target_location, "A-01");
}

#[test]
fn lookup_outage_can_be_retried() {
    let (mut terminal, _sub) = setup(Mode::Pick, vec![Task::pick("A-01", "SKU1", 1, vec![])], vec![]);
    terminal.service().fail_next_lookups(1);

    scan(&mut terminal, "A-01").unwrap();
    let out = terminal
        .scan(&ScanToken::scanned("SKU1", Utc::now()))
        .unwrap();
    assert_eq!(out.prompt, Prompt::Retry { failed: "lot lookup".into() });
    assert_eq!(out.warnings.last().map(ScanError::code), Some("SERVICE_UNAVAILABLE"));

    let out = terminal.retry().unwrap();
    assert_eq!(out.prompt, Prompt::EnterQuantity { expected: Some(1) });
}
