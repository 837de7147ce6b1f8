//! Background log of the floor events a terminal publishes.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::info;

use floorscan_events::{Event, EventEnvelope, FloorEvent, Subscription};

/// Log every event arriving on `subscription` from a background thread.
///
/// The thread ends once the bus behind the subscription is dropped and returns the number
/// of events it logged.
pub fn spawn_event_log(
    subscription: Subscription<EventEnvelope<FloorEvent>>,
) -> io::Result<JoinHandle<u64>> {
    thread::Builder::new()
        .name("floor-events".to_string())
        .spawn(move || {
            let mut logged = 0;
            while let Ok(envelope) = subscription.recv() {
                log_event(&envelope);
                logged += 1;
            }
            logged
        })
}

fn log_event(envelope: &EventEnvelope<FloorEvent>) {
    let event = envelope.payload();
    match event {
        FloorEvent::Committed(commit) => info!(
            terminal = envelope.terminal_id(),
            sequence = envelope.sequence_number(),
            event_type = event.event_type(),
            task = ?commit.task_id(),
            "floor event"
        ),
        FloorEvent::Exception(record) => info!(
            terminal = envelope.terminal_id(),
            sequence = envelope.sequence_number(),
            event_type = event.event_type(),
            task = ?record.task_id,
            product = %record.product_code,
            location = %record.location_code,
            qty = record.reported_qty,
            "floor event"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use floorscan_core::TaskId;
    use floorscan_events::{
        CommitEvent, ExceptionKind, ExceptionRecord, FloorPublisher, InMemoryEventBus,
        ReplenishCommitted,
    };

    #[test]
    fn log_thread_sees_every_event_and_stops_with_the_bus() {
        let publisher = FloorPublisher::new(InMemoryEventBus::new(), "RF-LOG");
        let handle = spawn_event_log(publisher.subscribe()).unwrap();

        publisher
            .publish(FloorEvent::Committed(CommitEvent::Replenish(ReplenishCommitted {
                task_id: TaskId::new(),
                occurred_at: Utc::now(),
            })))
            .unwrap();
        publisher
            .publish(FloorEvent::Exception(ExceptionRecord {
                task_id: None,
                kind: ExceptionKind::LocationMismatch,
                product_code: "SKU1".into(),
                location_code: "A-01".into(),
                reported_qty: 0,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        drop(publisher);

        assert_eq!(handle.join().unwrap(), 2);
    }
}
