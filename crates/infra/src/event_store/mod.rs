//! Append-only event store boundary.
//!
//! Storage-agnostic streams keyed by aggregate id, plus a global log used to
//! rebuild read models.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
