//! Sequenced publishing of floor events for one terminal.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::bus::{EventBus, Subscription};
use crate::envelope::EventEnvelope;
use crate::event::Event;
use crate::floor::FloorEvent;

/// Wraps every outgoing [`FloorEvent`] in an envelope stamped with the terminal id and the
/// next sequence number, then hands it to the bus.
#[derive(Debug)]
pub struct FloorPublisher<B> {
    bus: B,
    terminal_id: String,
    next_sequence: AtomicU64,
}

impl<B> FloorPublisher<B>
where
    B: EventBus<EventEnvelope<FloorEvent>>,
{
    pub fn new(bus: B, terminal_id: impl Into<String>) -> Self {
        Self {
            bus,
            terminal_id: terminal_id.into(),
            next_sequence: AtomicU64::new(1),
        }
    }

    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    /// Publish one event; returns the sequence number it was given.
    ///
    /// A failed publish still consumes its number, so receivers see the gap.
    pub fn publish(&self, event: FloorEvent) -> Result<u64, B::Error> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let event_type = event.event_type();
        self.bus
            .publish(EventEnvelope::new(self.terminal_id.clone(), sequence, event))?;
        debug!(terminal = %self.terminal_id, sequence, event_type, "floor event published");
        Ok(sequence)
    }

    pub fn subscribe(&self) -> Subscription<EventEnvelope<FloorEvent>> {
        self.bus.subscribe()
    }
}
