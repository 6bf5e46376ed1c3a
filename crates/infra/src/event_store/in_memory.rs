use std::collections::HashMap;
use std::sync::RwLock;

use stockroom_core::{AggregateId, ExpectedVersion};

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<AggregateId, Vec<StoredEvent>>,
    log: Vec<StoredEvent>,
}

/// In-memory append-only event store.
///
/// Streams and the global log share one lock, so a batch becomes visible in
/// both at once.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> EventStoreError {
    EventStoreError::Unavailable("lock poisoned".to_string())
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(first) = events.first() else {
            return Ok(vec![]);
        };

        // All events must target the same stream.
        let aggregate_id = first.aggregate_id;
        let aggregate_type = first.aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        let mut inner = self.inner.write().map_err(poisoned)?;
        let Inner { streams, log } = &mut *inner;

        let stream = streams.entry(aggregate_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        let mut next = current + 1;
        let mut global = log.len() as u64 + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                global_position: global,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            global += 1;
            stream.push(stored.clone());
            log.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.log.clone())
    }

    fn stream_version(&self, aggregate_id: AggregateId) -> Result<u64, EventStoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner
            .streams
            .get(&aggregate_id)
            .map(|s| Self::current_version(s))
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn event(aggregate_id: AggregateId, aggregate_type: &str, n: u32) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "test.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: json!({ "n": n }),
        }
    }

    #[test]
    fn assigns_stream_and_global_positions() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let first = store
            .append(vec![event(a, "t", 1), event(a, "t", 2)], ExpectedVersion::Exact(0))
            .unwrap();
        let second = store.append(vec![event(b, "t", 3)], ExpectedVersion::Exact(0)).unwrap();
        let third = store.append(vec![event(a, "t", 4)], ExpectedVersion::Exact(2)).unwrap();

        assert_eq!(
            first.iter().map(|e| (e.sequence_number, e.global_position)).collect::<Vec<_>>(),
            vec![(1, 1), (2, 2)]
        );
        assert_eq!((second[0].sequence_number, second[0].global_position), (1, 3));
        assert_eq!((third[0].sequence_number, third[0].global_position), (3, 4));

        assert_eq!(store.stream_version(a).unwrap(), 3);
        assert_eq!(store.stream_version(b).unwrap(), 1);
        assert_eq!(store.stream_version(AggregateId::new()).unwrap(), 0);

        let all = store.load_all().unwrap();
        assert_eq!(all.iter().map(|e| e.global_position).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(store.load_stream(a).unwrap().len(), 3);
    }

    #[test]
    fn stale_expected_version_is_rejected_atomically() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        store.append(vec![event(a, "t", 1)], ExpectedVersion::Exact(0)).unwrap();

        let err = store
            .append(vec![event(a, "t", 2), event(a, "t", 3)], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.load_stream(a).unwrap().len(), 1);
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn mixed_batches_are_rejected() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let err = store
            .append(vec![event(a, "t", 1), event(b, "t", 2)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));

        let err = store
            .append(vec![event(a, "t", 1), event(a, "u", 2)], ExpectedVersion::Any)
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn stream_type_is_stable() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        store.append(vec![event(a, "t", 1)], ExpectedVersion::Any).unwrap();

        let err = store.append(vec![event(a, "u", 2)], ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = InMemoryEventStore::new();
        assert!(store.append(vec![], ExpectedVersion::Exact(7)).unwrap().is_empty());
        assert!(store.load_all().unwrap().is_empty());
    }
}
