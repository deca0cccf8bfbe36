//! Domain event contracts and the publication bus.
//!
//! Aggregates emit typed events; the infra layer persists them, wraps them in
//! an [`EventEnvelope`] and publishes on an [`EventBus`] after the append.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
