use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for an event leaving a scanning terminal.
///
/// `sequence_number` increases monotonically per terminal so the receiving system can
/// spot gaps; the engine itself does not deduplicate submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    terminal_id: String,
    sequence_number: u64,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(terminal_id: impl Into<String>, sequence_number: u64, payload: E) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            terminal_id: terminal_id.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
