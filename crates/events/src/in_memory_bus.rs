//! In-memory, synchronous event bus.

use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::bus::{EventBus, EventSubscriber, SubscriberError};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned.
    #[error("event bus lock poisoned")]
    Poisoned,

    /// One or more subscribers failed; every subscriber still saw the message.
    #[error("subscriber failures: {0:?}")]
    Subscribers(Vec<SubscriberError>),
}

/// Fan-out bus that calls every subscriber inline, in registration order.
///
/// The subscriber list is cloned out of the lock before delivery, so a
/// subscriber may itself cause further publications (the alert monitor does).
pub struct InMemoryEventBus<M> {
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber<M>>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }
}

impl<M> core::fmt::Debug for InMemoryEventBus<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Send + Sync + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let subscribers = self
            .subscribers
            .read()
            .map_err(|_| InMemoryBusError::Poisoned)?
            .clone();

        let failures: Vec<SubscriberError> = subscribers
            .iter()
            .filter_map(|s| s.handle(&message).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(InMemoryBusError::Subscribers(failures))
        }
    }

    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber<M>>) {
        if let Ok(mut subs) = self.subscribers.write() {
            subs.push(subscriber);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Mutex<Vec<u32>>,
        fail_on: Option<u32>,
    }

    impl Recorder {
        fn new(name: &'static str, fail_on: Option<u32>) -> Arc<Self> {
            Arc::new(Self {
                name,
                seen: Mutex::new(Vec::new()),
                fail_on,
            })
        }
    }

    impl EventSubscriber<u32> for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle(&self, message: &u32) -> Result<(), SubscriberError> {
            self.seen.lock().unwrap().push(*message);
            if self.fail_on == Some(*message) {
                return Err(SubscriberError::new(self.name, "boom"));
            }
            Ok(())
        }
    }

    #[test]
    fn delivers_synchronously_to_every_subscriber() {
        let bus = InMemoryEventBus::new();
        let a = Recorder::new("a", None);
        let b = Recorder::new("b", None);
        bus.subscribe(a.clone());
        bus.subscribe(b.clone());

        bus.publish(1).unwrap();
        bus.publish(2).unwrap();

        assert_eq!(*a.seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(*b.seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn failing_subscriber_does_not_starve_the_rest() {
        let bus = InMemoryEventBus::new();
        let failing = Recorder::new("failing", Some(7));
        let healthy = Recorder::new("healthy", None);
        bus.subscribe(failing.clone());
        bus.subscribe(healthy.clone());

        match bus.publish(7) {
            Err(InMemoryBusError::Subscribers(errs)) => {
                assert_eq!(errs.len(), 1);
                assert_eq!(errs[0].subscriber, "failing");
            }
            other => panic!("expected subscriber failure, got {other:?}"),
        }
        assert_eq!(*healthy.seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        assert!(bus.publish(1).is_ok());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
