use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use stockroom_catalog::{PRODUCT_AGGREGATE_TYPE, ProductEvent, ProductId};
use stockroom_events::{EventEnvelope, EventSubscriber, SubscriberError};

use super::cursor::StreamCursors;
use super::{ProjectionError, newest_first};
use crate::read_model::{InMemoryStore, KeyedStore};

/// Queryable regular product read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: String,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub price: Decimal,
    pub low_stock: bool,
    pub out_of_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub position: u64,
}

impl ProductView {
    fn refresh(&mut self) {
        self.low_stock = self.quantity <= self.min_stock_level;
        self.out_of_stock = self.quantity == 0;
    }

    /// "Out of Stock", "Low Stock" or "In Stock".
    pub fn stock_status(&self) -> &'static str {
        if self.out_of_stock {
            "Out of Stock"
        } else if self.low_stock {
            "Low Stock"
        } else {
            "In Stock"
        }
    }
}

/// Live regular products. Deleted products are dropped.
#[derive(Debug)]
pub struct ProductsProjection<S = InMemoryStore<ProductId, ProductView>> {
    store: S,
    cursors: StreamCursors,
}

impl ProductsProjection {
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S> ProductsProjection<S>
where
    S: KeyedStore<ProductId, ProductView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != PRODUCT_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.admit(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let product_id = match &ev {
            ProductEvent::Created(e) => e.product_id,
            ProductEvent::Updated(e) => e.product_id,
            ProductEvent::StockMoved(e) => e.product_id,
            ProductEvent::Deleted(e) => e.product_id,
        };
        if product_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            ProductEvent::Created(e) => {
                let mut view = ProductView {
                    id: e.product_id,
                    name: e.name,
                    sku: e.sku,
                    description: e.description,
                    category: e.category,
                    quantity: 0,
                    min_stock_level: e.min_stock_level,
                    price: e.price,
                    low_stock: false,
                    out_of_stock: false,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                    position: envelope.global_position(),
                };
                view.refresh();
                self.store.upsert(product_id, view);
            }
            ProductEvent::Updated(e) => {
                let mut view = self.existing(&product_id)?;
                view.name = e.name;
                view.sku = e.sku;
                view.description = e.description;
                view.category = e.category;
                view.min_stock_level = e.min_stock_level;
                view.price = e.price;
                view.updated_at = e.occurred_at;
                view.refresh();
                self.store.upsert(product_id, view);
            }
            ProductEvent::StockMoved(e) => {
                let mut view = self.existing(&product_id)?;
                view.quantity = e.movement.quantity_after;
                view.updated_at = e.occurred_at;
                view.refresh();
                self.store.upsert(product_id, view);
            }
            ProductEvent::Deleted(_) => {
                self.store.remove(&product_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn existing(&self, product_id: &ProductId) -> Result<ProductView, ProjectionError> {
        self.store
            .get(product_id)
            .ok_or_else(|| ProjectionError::MissingView(format!("product {product_id}")))
    }

    /// Drop all views and cursors ahead of a replay.
    pub fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }

    pub fn get(&self, product_id: &ProductId) -> Option<ProductView> {
        self.store.get(product_id)
    }

    /// All products, newest first.
    pub fn list(&self) -> Vec<ProductView> {
        let mut all = self.store.list();
        newest_first(&mut all, |p| p.position);
        all
    }

    pub fn count(&self) -> usize {
        self.store.list().len()
    }

    pub fn by_sku(&self, sku: &str) -> Option<ProductView> {
        let sku = sku.trim();
        self.store.list().into_iter().find(|p| p.sku.eq_ignore_ascii_case(sku))
    }

    pub fn by_name(&self, name: &str) -> Option<ProductView> {
        let name = name.trim().to_lowercase();
        self.store.list().into_iter().find(|p| p.name.to_lowercase() == name)
    }

    pub fn by_category(&self, category: &str) -> Vec<ProductView> {
        let category = category.trim().to_lowercase();
        self.filtered(|p| p.category.to_lowercase() == category)
    }

    /// Case-insensitive match on name or SKU.
    pub fn search(&self, term: &str) -> Vec<ProductView> {
        let term = term.trim().to_lowercase();
        self.filtered(|p| p.name.to_lowercase().contains(&term) || p.sku.to_lowercase().contains(&term))
    }

    /// At or below the minimum level (includes out-of-stock products).
    pub fn low_stock(&self) -> Vec<ProductView> {
        self.filtered(|p| p.low_stock)
    }

    pub fn out_of_stock(&self) -> Vec<ProductView> {
        self.filtered(|p| p.out_of_stock)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.store.list().into_iter().map(|p| p.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    pub fn total_stock(&self) -> i64 {
        self.store.list().iter().map(|p| p.quantity).sum()
    }

    fn filtered(&self, keep: impl Fn(&ProductView) -> bool) -> Vec<ProductView> {
        let mut out: Vec<ProductView> = self.store.list().into_iter().filter(|p| keep(p)).collect();
        newest_first(&mut out, |p| p.position);
        out
    }
}

impl<S> EventSubscriber<EventEnvelope<JsonValue>> for ProductsProjection<S>
where
    S: KeyedStore<ProductId, ProductView>,
{
    fn name(&self) -> &'static str {
        "products"
    }

    fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
        self.apply_envelope(message)
            .map_err(|e| e.into_subscriber_error(self.name()))
    }
}
