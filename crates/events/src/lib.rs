//! `stockroom-events`: event mechanics shared by domain and infrastructure.
//!
//! Domain crates implement [`Event`]; infrastructure wraps payloads in
//! [`EventEnvelope`] and fans them out through an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, EventSubscriber, SubscriberError};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
