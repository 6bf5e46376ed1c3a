//! Event publishing/subscription abstraction.
//!
//! The bus distributes events *after* they have been committed to the event
//! store. The store stays the source of truth; subscribers (projections, the
//! alert monitor) must tolerate redelivery of an envelope they already saw.
//!
//! ```text
//! Command → Event Store (append) → Event Bus (publish) → Subscribers
//!                                                          ├─ Projections
//!                                                          └─ Alert monitor
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a subscriber while handling one message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{subscriber}: {message}")]
pub struct SubscriberError {
    pub subscriber: &'static str,
    pub message: String,
}

impl SubscriberError {
    pub fn new(subscriber: &'static str, message: impl Into<String>) -> Self {
        Self {
            subscriber,
            message: message.into(),
        }
    }
}

/// Consumer of published messages.
pub trait EventSubscriber<M>: Send + Sync {
    /// Short stable name, used in logs and errors.
    fn name(&self) -> &'static str;

    fn handle(&self, message: &M) -> Result<(), SubscriberError>;
}

/// Publish/subscribe contract.
///
/// Delivery is at-least-once. Implementations decide whether `publish`
/// returns before or after subscribers ran; the in-memory bus delivers
/// synchronously so a command's read models are current when it returns.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber<M>>);
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self, subscriber: Arc<dyn EventSubscriber<M>>) {
        (**self).subscribe(subscriber)
    }
}
