//! Projection implementations (read model builders).
//!
//! Projections consume committed envelopes and build query-optimized views.
//! All projections are:
//! - **Rebuildable**: `clear()` then [`replay::replay_all`] from the store
//! - **Idempotent**: a per-stream cursor skips envelopes already applied
//! - **Synchronous**: they run inline on publish, so views are current once a
//!   command returns

use thiserror::Error;

use stockroom_events::SubscriberError;

pub mod alerts;
pub mod cursor;
pub mod fashion;
pub mod products;
pub mod replay;
pub mod stock_ledger;
pub mod users;

pub use alerts::{AlertView, AlertsProjection};
pub use fashion::{FashionProductView, FashionProjection, VariantView};
pub use products::{ProductView, ProductsProjection};
pub use stock_ledger::{EntityType, StockLedgerProjection, StockTransactionView};
pub use users::{StatusCounts, UserView, UsersProjection};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event: {0}")]
    Deserialize(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

    #[error("event does not belong to its stream: {0}")]
    StreamMismatch(String),

    /// An event referenced a view that does not exist (e.g. a variant that was never added).
    #[error("missing read model: {0}")]
    MissingView(String),
}

impl ProjectionError {
    pub(crate) fn into_subscriber_error(self, subscriber: &'static str) -> SubscriberError {
        tracing::warn!(projection = subscriber, error = %self, "projection failed");
        SubscriberError::new(subscriber, self.to_string())
    }
}

/// Newest first, by the global position of the creating event.
pub(crate) fn newest_first<T>(items: &mut [T], position: impl Fn(&T) -> u64) {
    items.sort_by_key(|item| std::cmp::Reverse(position(item)));
}
