use std::io;
use std::sync::Arc;

use anyhow::{Context, bail};

use floorscan_core::{EngineConfig, Mode};
use floorscan_events::{FloorPublisher, InMemoryEventBus};
use floorscan_infra::{ScanTerminal, WarehouseSeed};
use floorscan_observability::ObservabilityConfig;
use floorscan_terminal::{Console, Session, spawn_event_log};
use floorscan_verification::CompositeCodeInterpreter;

fn main() -> anyhow::Result<()> {
    floorscan_observability::init_with(&ObservabilityConfig::from_env());

    let config = EngineConfig::from_env();

    let seed = match std::env::var("FLOORSCAN_SEED") {
        Ok(path) => WarehouseSeed::load(&path)?,
        Err(_) => {
            tracing::warn!("FLOORSCAN_SEED not set; starting with an empty warehouse");
            WarehouseSeed::default()
        }
    };
    let mode_name = std::env::var("FLOORSCAN_MODE").unwrap_or_else(|_| "PICK".to_string());
    let terminal_id = std::env::var("FLOORSCAN_TERMINAL_ID").unwrap_or_else(|_| "RF-01".to_string());

    let (locations, service, packing_orders) = seed.into_parts();

    let (session, event_log) = if mode_name.trim().eq_ignore_ascii_case("PACK") {
        let Some(order) = packing_orders.into_iter().next() else {
            bail!("PACK mode needs a packing order in the seed");
        };
        tracing::info!(order = %order.order_id, "packing session started");
        (Session::Pack(CompositeCodeInterpreter::new(order, &config)), None)
    } else {
        let mode: Mode = mode_name
            .parse()
            .with_context(|| format!("FLOORSCAN_MODE={mode_name}"))?;
        let publisher = Arc::new(FloorPublisher::new(InMemoryEventBus::new(), terminal_id));
        let event_log = spawn_event_log(publisher.subscribe()).context("starting event log")?;
        let terminal = ScanTerminal::new(mode, config, locations, service, publisher)?;
        (Session::Floor(terminal), Some(event_log))
    };

    let stdin = io::stdin();
    let mut console = Console::new(session);
    let result = console.run(stdin.lock(), io::stdout().lock());

    // Dropping the console drops the bus, which ends the log thread.
    drop(console);
    if let Some(handle) = event_log {
        match handle.join() {
            Ok(events) => tracing::info!(events, "event log closed"),
            Err(_) => tracing::error!("event log thread panicked"),
        }
    }
    result
}
