//! Floor events: commit payloads, exception notifications and their transport.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod floor;
pub mod in_memory_bus;
pub mod publisher;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use floor::{
    CommitEvent, CountCommitted, ExceptionKind, ExceptionRecord, FloorEvent, MoveCommitted,
    OrderAllocation, PickCommitted, ReceiveCommitted, ReplenishCommitted,
};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use publisher::FloorPublisher;
