//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Validate stream ordering
//!   ↓
//! 3. Rehydrate aggregate (apply historical events)
//!   ↓
//! 4. Handle command (pure decision logic, produces events)
//!   ↓
//! 5. Append to store (optimistic concurrency check)
//!   ↓
//! 6. Publish committed events to bus (projections, alert monitor)
//! ```
//!
//! Steps 1-6 run under a commit gate, so envelopes reach subscribers in
//! commit order. Subscribers run inline and may dispatch follow-up commands
//! (the alert monitor does); such nested dispatches on the same thread pass
//! through the gate instead of waiting on it.
//!
//! This module contains no IO itself; it composes the store and bus traits.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use stockroom_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use stockroom_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure or a domain-level conflict (duplicate).
    #[error("{0}")]
    Concurrency(String),
    /// Domain validation failure.
    #[error("{0}")]
    Validation(String),
    /// Domain invariant failure.
    #[error("{0}")]
    InvariantViolation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    /// Historical payloads did not deserialize into the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    /// Loaded stream is out of order or belongs to another aggregate.
    #[error("invalid stream: {0}")]
    InvalidStream(String),
    #[error(transparent)]
    Store(EventStoreError),
    /// Publication failed after a successful append. The events are committed.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

thread_local! {
    static COMMITTING: Cell<bool> = const { Cell::new(false) };
}

/// Held for the duration of one top-level dispatch.
struct CommitGate<'a> {
    _guard: Option<MutexGuard<'a, ()>>,
}

impl Drop for CommitGate<'_> {
    fn drop(&mut self) {
        if self._guard.is_some() {
            COMMITTING.with(|c| c.set(false));
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// ## Execution Guarantees
///
/// - **Atomicity**: events are appended before publication; a failed append publishes nothing
/// - **Ordering**: envelopes are published in commit order, across all streams
/// - **Read-your-writes**: with a synchronous bus, read models reflect the
///   command by the time `dispatch` returns
///
/// ## Error Semantics
///
/// - Domain errors map onto `Validation` / `InvariantViolation` / `NotFound` / `Concurrency`
/// - Version mismatches on append map onto `Concurrency`
/// - Subscriber failures map onto `Publish`; the events stay committed
///
/// ## Generic Parameters
///
/// - `S`: event store implementation
/// - `B`: event bus implementation
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    commit: Mutex<()>,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            commit: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn enter_commit(&self) -> CommitGate<'_> {
        if COMMITTING.with(Cell::get) {
            return CommitGate { _guard: None };
        }
        let guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        COMMITTING.with(|c| c.set(true));
        CommitGate { _guard: Some(guard) }
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full event-sourcing pipeline.
    ///
    /// `make_aggregate` builds the empty instance to rehydrate (e.g.
    /// `|id| Product::empty(ProductId::new(id))`), keeping the dispatcher
    /// ignorant of aggregate construction.
    ///
    /// Returns the committed events with their assigned positions. An empty
    /// vector means the command was a no-op (nothing appended or published).
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: stockroom_events::Event + Serialize + DeserializeOwned,
    {
        let _gate = self.enter_commit();

        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Publish every committed event, even after a failure, so
        //    subscribers never see a gap in the stream.
        let mut failure = None;
        for stored in &committed {
            if let Err(e) = self.bus.publish(stored.to_envelope()) {
                tracing::warn!(
                    event_type = %stored.event_type,
                    aggregate_id = %stored.aggregate_id,
                    error = ?e,
                    "event publication failed"
                );
                failure.get_or_insert_with(|| format!("{e:?}"));
            }
        }

        match failure {
            Some(msg) => Err(DispatchError::Publish(msg)),
            None => Ok(committed),
        }
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::InvalidStream(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::InvalidStream(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event =
            serde_json::from_value(stored.payload.clone()).map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use chrono::Utc;
    use rust_decimal::Decimal;

    use stockroom_catalog::{
        CreateProduct, Product, ProductCommand, ProductDetails, ProductId, StockChange, PRODUCT_AGGREGATE_TYPE,
    };
    use stockroom_events::{EventSubscriber, InMemoryEventBus, SubscriberError};

    use super::*;
    use crate::event_store::InMemoryEventStore;

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<(u64, String)>>,
    }

    impl EventSubscriber<EventEnvelope<JsonValue>> for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
            self.seen
                .lock()
                .unwrap()
                .push((message.global_position(), message.aggregate_type().to_string()));
            Ok(())
        }
    }

    struct Failing;

    impl EventSubscriber<EventEnvelope<JsonValue>> for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn handle(&self, _message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
            Err(SubscriberError::new("failing", "boom"))
        }
    }

    fn setup() -> (CommandDispatcher<Arc<InMemoryEventStore>, Bus>, Arc<Recorder>) {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let recorder = Arc::new(Recorder::default());
        bus.subscribe(recorder.clone());
        (CommandDispatcher::new(store, bus), recorder)
    }

    fn create(product_id: ProductId, quantity: i64) -> ProductCommand {
        ProductCommand::Create(CreateProduct {
            product_id,
            details: ProductDetails {
                name: "Desk Lamp".to_string(),
                sku: Some("LAMP-1".to_string()),
                description: None,
                category: "Lighting".to_string(),
                quantity,
                min_stock_level: 2,
                price: Decimal::new(1999, 2),
            },
            performed_by: "admin".to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn issue(product_id: ProductId, quantity: i64) -> ProductCommand {
        ProductCommand::IssueStock(StockChange {
            product_id,
            quantity,
            reason: "sale".to_string(),
            performed_by: "staff".to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn dispatch(
        d: &CommandDispatcher<Arc<InMemoryEventStore>, Bus>,
        id: ProductId,
        cmd: ProductCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        d.dispatch::<Product>(id.0, PRODUCT_AGGREGATE_TYPE, cmd, |agg| Product::empty(ProductId::new(agg)))
    }

    #[test]
    fn commits_and_publishes_in_order() {
        let (d, recorder) = setup();
        let id = ProductId::new(AggregateId::new());

        let committed = dispatch(&d, id, create(id, 5)).unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(committed[1].sequence_number, 2);

        let committed = dispatch(&d, id, issue(id, 3)).unwrap();
        assert_eq!(committed[0].sequence_number, 3);

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(seen.iter().all(|(_, t)| t == PRODUCT_AGGREGATE_TYPE));
    }

    #[test]
    fn domain_errors_map_and_nothing_is_appended() {
        let (d, recorder) = setup();
        let id = ProductId::new(AggregateId::new());
        dispatch(&d, id, create(id, 1)).unwrap();

        let err = dispatch(&d, id, issue(id, 5)).unwrap_err();
        match err {
            DispatchError::InvariantViolation(msg) => assert_eq!(msg, "Insufficient stock. Available: 1"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(d.store().stream_version(id.0).unwrap(), 2);
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);

        let missing = ProductId::new(AggregateId::new());
        assert!(matches!(dispatch(&d, missing, issue(missing, 1)), Err(DispatchError::NotFound)));
    }

    #[test]
    fn subscriber_failure_surfaces_after_commit() {
        let (d, recorder) = setup();
        d.bus().subscribe(Arc::new(Failing));
        let id = ProductId::new(AggregateId::new());

        let err = dispatch(&d, id, create(id, 4)).unwrap_err();
        assert!(matches!(err, DispatchError::Publish(_)));
        // Committed, and the healthy subscriber saw both events.
        assert_eq!(d.store().stream_version(id.0).unwrap(), 2);
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn nested_dispatch_from_a_subscriber_does_not_block() {
        struct Echo {
            dispatcher: StdMutex<Option<Arc<CommandDispatcher<Arc<InMemoryEventStore>, Bus>>>>,
            target: ProductId,
        }

        impl EventSubscriber<EventEnvelope<JsonValue>> for Echo {
            fn name(&self) -> &'static str {
                "echo"
            }

            fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
                if message.aggregate_id() == self.target.0 {
                    return Ok(());
                }
                let d = self.dispatcher.lock().unwrap().clone();
                if let Some(d) = d {
                    if d.store().stream_version(self.target.0).unwrap() == 0 {
                        dispatch(&d, self.target, create(self.target, 0))
                            .map_err(|e| SubscriberError::new("echo", e.to_string()))?;
                    }
                }
                Ok(())
            }
        }

        let (d, _recorder) = setup();
        let d = Arc::new(d);
        let target = ProductId::new(AggregateId::new());
        let echo = Arc::new(Echo {
            dispatcher: StdMutex::new(Some(d.clone())),
            target,
        });
        d.bus().subscribe(echo.clone());

        let id = ProductId::new(AggregateId::new());
        dispatch(&d, id, create(id, 0)).unwrap();
        assert_eq!(d.store().stream_version(target.0).unwrap(), 1);

        *echo.dispatcher.lock().unwrap() = None;
    }
}
