//! Stock transaction ledger: one row per recorded movement, across regular
//! products and fashion variants.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockroom_catalog::{
    FASHION_PRODUCT_AGGREGATE_TYPE, FashionEvent, FashionProductId, MovementKind, PRODUCT_AGGREGATE_TYPE,
    ProductEvent, ProductId, VariantId,
};
use stockroom_core::AggregateId;
use stockroom_events::{EventEnvelope, EventSubscriber, SubscriberError};

use super::cursor::StreamCursors;
use super::{ProjectionError, newest_first};
use crate::read_model::{InMemoryStore, KeyedStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    RegularProduct,
    FashionProduct,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTransactionView {
    /// The id of the event that recorded the movement.
    pub id: Uuid,
    pub product_id: Option<ProductId>,
    pub fashion_product_id: Option<FashionProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub entity_name: String,
    pub entity_type: EntityType,
    /// "Size/Color" display names, for variant movements.
    pub variant_details: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: MovementKind,
    pub quantity: i64,
    pub reason: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub position: u64,
}

impl StockTransactionView {
    /// Stream id of the product the movement belongs to.
    pub fn product_stream(&self) -> Option<AggregateId> {
        self.product_id
            .map(|p| p.0)
            .or(self.fashion_product_id.map(|p| p.0))
    }
}

#[derive(Debug)]
pub struct StockLedgerProjection<S = InMemoryStore<Uuid, StockTransactionView>> {
    store: S,
    cursors: StreamCursors,
}

impl StockLedgerProjection {
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S> StockLedgerProjection<S>
where
    S: KeyedStore<Uuid, StockTransactionView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        let aggregate_type = envelope.aggregate_type();
        if aggregate_type != PRODUCT_AGGREGATE_TYPE && aggregate_type != FASHION_PRODUCT_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.admit(aggregate_id, seq)? {
            return Ok(());
        }

        let row = if aggregate_type == PRODUCT_AGGREGATE_TYPE {
            let ev: ProductEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            match ev {
                ProductEvent::StockMoved(e) => Some(StockTransactionView {
                    id: envelope.event_id(),
                    product_id: Some(e.product_id),
                    fashion_product_id: None,
                    variant_id: None,
                    product_name: e.product_name.clone(),
                    entity_name: e.product_name,
                    entity_type: EntityType::RegularProduct,
                    variant_details: None,
                    transaction_type: e.movement.kind,
                    quantity: e.movement.quantity,
                    reason: e.movement.reason,
                    username: e.movement.performed_by,
                    created_at: e.occurred_at,
                    position: envelope.global_position(),
                }),
                _ => None,
            }
        } else {
            let ev: FashionEvent = serde_json::from_value(envelope.payload().clone())
                .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
            match ev {
                FashionEvent::VariantStockMoved(e) => Some(StockTransactionView {
                    id: envelope.event_id(),
                    product_id: None,
                    fashion_product_id: Some(e.product_id),
                    variant_id: Some(e.variant_id),
                    product_name: e.product_name.clone(),
                    entity_name: e.product_name,
                    entity_type: EntityType::FashionProduct,
                    variant_details: Some(format!("{}/{}", e.size.display_name(), e.color.display_name())),
                    transaction_type: e.movement.kind,
                    quantity: e.movement.quantity,
                    reason: e.movement.reason,
                    username: e.movement.performed_by,
                    created_at: e.occurred_at,
                    position: envelope.global_position(),
                }),
                _ => None,
            }
        };

        if let Some(row) = row {
            self.store.upsert(row.id, row);
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    pub fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }

    pub fn get(&self, id: &Uuid) -> Option<StockTransactionView> {
        self.store.get(id)
    }

    /// Every transaction, newest first.
    pub fn all(&self) -> Vec<StockTransactionView> {
        self.filtered(|_| true)
    }

    pub fn count(&self) -> usize {
        self.store.list().len()
    }

    pub fn by_type(&self, kind: MovementKind) -> Vec<StockTransactionView> {
        self.filtered(|t| t.transaction_type == kind)
    }

    pub fn by_product(&self, product_id: ProductId) -> Vec<StockTransactionView> {
        self.filtered(|t| t.product_id == Some(product_id))
    }

    pub fn by_fashion_product(&self, product_id: FashionProductId) -> Vec<StockTransactionView> {
        self.filtered(|t| t.fashion_product_id == Some(product_id))
    }

    /// Transactions against either kind of product with this stream id.
    pub fn by_any_product(&self, product_stream: AggregateId) -> Vec<StockTransactionView> {
        self.filtered(|t| t.product_stream() == Some(product_stream))
    }

    /// The `limit` newest transactions.
    pub fn recent(&self, limit: usize) -> Vec<StockTransactionView> {
        let mut all = self.all();
        all.truncate(limit);
        all
    }

    /// Transactions with `start <= created_at <= end`.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<StockTransactionView> {
        self.filtered(|t| t.created_at >= start && t.created_at <= end)
    }

    pub fn since(&self, start: DateTime<Utc>) -> Vec<StockTransactionView> {
        self.filtered(|t| t.created_at >= start)
    }

    fn filtered(&self, keep: impl Fn(&StockTransactionView) -> bool) -> Vec<StockTransactionView> {
        let mut out: Vec<StockTransactionView> = self.store.list().into_iter().filter(|t| keep(t)).collect();
        newest_first(&mut out, |t| t.position);
        out
    }
}

impl<S> EventSubscriber<EventEnvelope<JsonValue>> for StockLedgerProjection<S>
where
    S: KeyedStore<Uuid, StockTransactionView>,
{
    fn name(&self) -> &'static str {
        "stock_ledger"
    }

    fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
        self.apply_envelope(message)
            .map_err(|e| e.into_subscriber_error(self.name()))
    }
}
