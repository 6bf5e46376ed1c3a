//! Rebuilding read models from the event store.

use serde_json::Value as JsonValue;

use stockroom_events::{EventEnvelope, EventSubscriber, SubscriberError};

use crate::event_store::{EventStore, EventStoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("projection error at global position {position}: {source}")]
    Projection { position: u64, source: SubscriberError },
}

/// Feed every stored event, in global order, to one subscriber.
///
/// The subscriber should be cleared first; its cursors otherwise skip what it
/// has already seen. Returns the number of events replayed.
pub fn replay_all<S>(
    store: &S,
    subscriber: &dyn EventSubscriber<EventEnvelope<JsonValue>>,
) -> Result<usize, ReplayError>
where
    S: EventStore + ?Sized,
{
    let events = store.load_all()?;
    for stored in &events {
        subscriber
            .handle(&stored.to_envelope())
            .map_err(|source| ReplayError::Projection {
                position: stored.global_position,
                source,
            })?;
    }
    tracing::info!(subscriber = subscriber.name(), events = events.len(), "replay complete");
    Ok(events.len())
}
