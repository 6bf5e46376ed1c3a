use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use stockroom_catalog::{
    Color, FASHION_PRODUCT_AGGREGATE_TYPE, FashionCategory, FashionDetails, FashionEvent, FashionProductId, Gender,
    Season, Size, VariantId,
};
use stockroom_events::{EventEnvelope, EventSubscriber, SubscriberError};

use super::cursor::StreamCursors;
use super::{ProjectionError, newest_first};
use crate::read_model::{InMemoryStore, KeyedStore};

// ─────────────────────────────────────────────────────────────────────────────
// Read Models
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantView {
    pub id: VariantId,
    pub product_id: FashionProductId,
    pub product_name: String,
    pub size: Size,
    pub size_display_name: String,
    pub color: Color,
    pub color_display_name: String,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub price_adjustment: Decimal,
    pub final_price: Decimal,
    pub variant_sku: String,
    pub display_name: String,
    pub low_stock: bool,
    pub out_of_stock: bool,
}

impl VariantView {
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

/// Fashion product with its variants and product-level stock figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FashionProductView {
    pub id: FashionProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: FashionCategory,
    pub category_display_name: String,
    pub brand: String,
    pub base_price: Decimal,
    pub season: Option<Season>,
    pub season_display_name: Option<String>,
    pub target_gender: Option<Gender>,
    pub gender_display_name: Option<String>,
    pub material: Option<String>,
    pub care_instructions: Option<String>,
    pub total_stock: i64,
    pub total_min_stock: i64,
    pub low_stock: bool,
    pub out_of_stock: bool,
    pub variants: Vec<VariantView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub position: u64,
}

impl FashionProductView {
    fn set_details(&mut self, d: FashionDetails) {
        self.name = d.name;
        self.description = d.description;
        self.category = d.category;
        self.brand = d.brand;
        self.base_price = d.base_price;
        self.season = d.season;
        self.target_gender = d.target_gender;
        self.material = d.material;
        self.care_instructions = d.care_instructions;
    }

    /// Recompute every derived field from the stored ones.
    fn refresh(&mut self) {
        self.category_display_name = self.category.display_name().to_string();
        self.season_display_name = self.season.map(|s| s.display_name().to_string());
        self.gender_display_name = self.target_gender.map(|g| g.display_name().to_string());

        for v in &mut self.variants {
            v.product_name = self.name.clone();
            v.final_price = self.base_price + v.price_adjustment;
            v.display_name = format!("{} - {}/{}", self.name, v.size_display_name, v.color_display_name);
            v.low_stock = v.quantity <= v.min_stock_level;
            v.out_of_stock = v.quantity == 0;
        }

        self.total_stock = self.variants.iter().map(|v| v.quantity).sum();
        self.total_min_stock = self.variants.iter().map(|v| v.min_stock_level).sum();
        self.low_stock = self.total_stock <= self.total_min_stock;
        self.out_of_stock = self.total_stock == 0;
    }

    pub fn variant(&self, variant_id: VariantId) -> Option<&VariantView> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Projection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct FashionProjection<S = InMemoryStore<FashionProductId, FashionProductView>> {
    store: S,
    cursors: StreamCursors,
}

impl FashionProjection {
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S> FashionProjection<S>
where
    S: KeyedStore<FashionProductId, FashionProductView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != FASHION_PRODUCT_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.admit(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: FashionEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let product_id = match &ev {
            FashionEvent::Created(e) => e.product_id,
            FashionEvent::Updated(e) => e.product_id,
            FashionEvent::VariantAdded(e) => e.product_id,
            FashionEvent::VariantStockMoved(e) => e.product_id,
            FashionEvent::Deleted(e) => e.product_id,
        };
        if product_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            FashionEvent::Created(e) => {
                let mut view = FashionProductView {
                    id: e.product_id,
                    name: String::new(),
                    sku: e.sku,
                    description: None,
                    category: e.details.category,
                    category_display_name: String::new(),
                    brand: String::new(),
                    base_price: Decimal::ZERO,
                    season: None,
                    season_display_name: None,
                    target_gender: None,
                    gender_display_name: None,
                    material: None,
                    care_instructions: None,
                    total_stock: 0,
                    total_min_stock: 0,
                    low_stock: false,
                    out_of_stock: false,
                    variants: Vec::new(),
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                    position: envelope.global_position(),
                };
                view.set_details(e.details);
                view.refresh();
                self.store.upsert(product_id, view);
            }
            FashionEvent::Updated(e) => {
                let mut view = self.existing(&product_id)?;
                view.set_details(e.details);
                view.updated_at = e.occurred_at;
                view.refresh();
                self.store.upsert(product_id, view);
            }
            FashionEvent::VariantAdded(e) => {
                let mut view = self.existing(&product_id)?;
                view.variants.push(VariantView {
                    id: e.variant_id,
                    product_id,
                    product_name: String::new(),
                    size: e.size,
                    size_display_name: e.size.display_name().to_string(),
                    color: e.color,
                    color_display_name: e.color.display_name().to_string(),
                    quantity: 0,
                    min_stock_level: e.min_stock_level,
                    price_adjustment: e.price_adjustment,
                    final_price: Decimal::ZERO,
                    variant_sku: e.variant_sku,
                    display_name: String::new(),
                    low_stock: false,
                    out_of_stock: false,
                });
                view.updated_at = e.occurred_at;
                view.refresh();
                self.store.upsert(product_id, view);
            }
            FashionEvent::VariantStockMoved(e) => {
                let mut view = self.existing(&product_id)?;
                let variant = view
                    .variants
                    .iter_mut()
                    .find(|v| v.id == e.variant_id)
                    .ok_or_else(|| ProjectionError::MissingView(format!("variant {}", e.variant_id)))?;
                variant.quantity = e.movement.quantity_after;
                view.updated_at = e.occurred_at;
                view.refresh();
                self.store.upsert(product_id, view);
            }
            FashionEvent::Deleted(_) => {
                self.store.remove(&product_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    fn existing(&self, product_id: &FashionProductId) -> Result<FashionProductView, ProjectionError> {
        self.store
            .get(product_id)
            .ok_or_else(|| ProjectionError::MissingView(format!("fashion product {product_id}")))
    }

    pub fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get(&self, product_id: &FashionProductId) -> Option<FashionProductView> {
        self.store.get(product_id)
    }

    pub fn variant(&self, product_id: &FashionProductId, variant_id: VariantId) -> Option<VariantView> {
        self.store.get(product_id)?.variant(variant_id).cloned()
    }

    /// All products, newest first.
    pub fn list(&self) -> Vec<FashionProductView> {
        self.filtered(|_| true)
    }

    pub fn count(&self) -> usize {
        self.store.list().len()
    }

    pub fn total_stock(&self) -> i64 {
        self.store.list().iter().map(|p| p.total_stock).sum()
    }

    pub fn by_sku(&self, sku: &str) -> Option<FashionProductView> {
        let sku = sku.trim();
        self.store.list().into_iter().find(|p| p.sku.eq_ignore_ascii_case(sku))
    }

    pub fn by_category(&self, category: FashionCategory) -> Vec<FashionProductView> {
        self.filtered(|p| p.category == category)
    }

    pub fn by_brand(&self, brand: &str) -> Vec<FashionProductView> {
        let brand = brand.trim();
        self.filtered(|p| p.brand.eq_ignore_ascii_case(brand))
    }

    pub fn by_season(&self, season: Season) -> Vec<FashionProductView> {
        self.filtered(|p| p.season == Some(season))
    }

    /// Products for the season `month` (1-12) falls in, plus all-season ones.
    pub fn current_season(&self, month: u32) -> Vec<FashionProductView> {
        let current = Season::for_month(month);
        self.filtered(|p| p.season.is_some_and(|s| s.covers(current)))
    }

    pub fn by_gender(&self, gender: Gender) -> Vec<FashionProductView> {
        self.filtered(|p| p.target_gender == Some(gender))
    }

    /// Case-insensitive substring match on the name.
    pub fn search(&self, term: &str) -> Vec<FashionProductView> {
        let term = term.trim().to_lowercase();
        self.filtered(|p| p.name.to_lowercase().contains(&term))
    }

    /// Base price within `[min, max]`.
    pub fn price_range(&self, min: Decimal, max: Decimal) -> Vec<FashionProductView> {
        self.filtered(|p| p.base_price >= min && p.base_price <= max)
    }

    /// The `limit` newest products.
    pub fn trending(&self, limit: usize) -> Vec<FashionProductView> {
        let mut all = self.list();
        all.truncate(limit);
        all
    }

    /// Products with at least one variant at or below its minimum.
    pub fn low_stock(&self) -> Vec<FashionProductView> {
        self.filtered(|p| p.variants.iter().any(|v| v.low_stock))
    }

    /// Products with no variant in stock (including products without variants).
    pub fn out_of_stock(&self) -> Vec<FashionProductView> {
        self.filtered(|p| !p.variants.iter().any(|v| v.quantity > 0))
    }

    /// Sizes in stock, optionally restricted to one color, in catalog order.
    pub fn available_sizes(&self, product_id: &FashionProductId, color: Option<Color>) -> Vec<Size> {
        let Some(view) = self.store.get(product_id) else {
            return Vec::new();
        };
        Size::ALL
            .iter()
            .copied()
            .filter(|size| {
                view.variants
                    .iter()
                    .any(|v| v.size == *size && v.quantity > 0 && color.is_none_or(|c| v.color == c))
            })
            .collect()
    }

    /// Colors in stock, optionally restricted to one size, in catalog order.
    pub fn available_colors(&self, product_id: &FashionProductId, size: Option<Size>) -> Vec<Color> {
        let Some(view) = self.store.get(product_id) else {
            return Vec::new();
        };
        Color::ALL
            .iter()
            .copied()
            .filter(|color| {
                view.variants
                    .iter()
                    .any(|v| v.color == *color && v.quantity > 0 && size.is_none_or(|s| v.size == s))
            })
            .collect()
    }

    fn filtered(&self, keep: impl Fn(&FashionProductView) -> bool) -> Vec<FashionProductView> {
        let mut out: Vec<FashionProductView> = self.store.list().into_iter().filter(|p| keep(p)).collect();
        newest_first(&mut out, |p| p.position);
        out
    }
}

impl<S> EventSubscriber<EventEnvelope<JsonValue>> for FashionProjection<S>
where
    S: KeyedStore<FashionProductId, FashionProductView>,
{
    fn name(&self) -> &'static str {
        "fashion_products"
    }

    fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
        self.apply_envelope(message)
            .map_err(|e| e.into_subscriber_error(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;

    #[test]
    fn variants_and_totals_follow_stock_movements() {
        let h = Harness::new();
        let (tee, variants) = h.create_fashion(
            "Linen Shirt",
            FashionCategory::ClothingMens,
            Some(Season::Summer),
            &[(Size::M, Color::White, 4, 2), (Size::L, Color::Navy, 0, 2)],
        );

        let view = h.fashion.get(&tee).unwrap();
        assert_eq!(view.category_display_name, "Men's Clothing");
        assert_eq!(view.season_display_name.as_deref(), Some("Summer"));
        assert_eq!(view.total_stock, 4);
        assert_eq!(view.total_min_stock, 4);
        assert!(view.low_stock);
        assert!(!view.out_of_stock);

        let white = view.variant(variants[0]).unwrap();
        assert_eq!(white.display_name, "Linen Shirt - M/White");
        assert_eq!(white.final_price, view.base_price + white.price_adjustment);
        assert!(!white.low_stock);

        h.receive_variant(tee, variants[1], 5).unwrap();
        let view = h.fashion.get(&tee).unwrap();
        assert_eq!(view.total_stock, 9);
        assert!(!view.low_stock);
        assert_eq!(h.fashion.available_sizes(&tee, None), vec![Size::M, Size::L]);
        assert_eq!(h.fashion.available_sizes(&tee, Some(Color::Navy)), vec![Size::L]);
        assert_eq!(h.fashion.available_colors(&tee, Some(Size::M)), vec![Color::White]);

        h.issue_variant(tee, variants[0], 4).unwrap();
        assert_eq!(h.fashion.available_colors(&tee, None), vec![Color::Navy]);
        assert_eq!(h.fashion.low_stock().len(), 1);
        assert!(h.fashion.out_of_stock().is_empty());
    }

    #[test]
    fn catalog_queries() {
        let h = Harness::new();
        let (shirt, _) = h.create_fashion(
            "Linen Shirt",
            FashionCategory::ClothingMens,
            Some(Season::Summer),
            &[(Size::M, Color::White, 3, 1)],
        );
        let (scarf, _) = h.create_fashion(
            "Wool Scarf",
            FashionCategory::AccessoriesScarves,
            Some(Season::AllSeason),
            &[],
        );

        assert_eq!(h.fashion.list().iter().map(|p| p.id).collect::<Vec<_>>(), vec![scarf, shirt]);
        assert_eq!(h.fashion.by_category(FashionCategory::ClothingMens).len(), 1);
        assert_eq!(h.fashion.by_brand("ACME").len(), 2);
        assert_eq!(h.fashion.by_season(Season::Summer).len(), 1);
        // July is summer: the shirt plus the all-season scarf.
        assert_eq!(h.fashion.current_season(7).len(), 2);
        // January is winter: only the scarf.
        assert_eq!(h.fashion.current_season(1).iter().map(|p| p.id).collect::<Vec<_>>(), vec![scarf]);
        assert_eq!(h.fashion.search("LINEN").len(), 1);
        assert_eq!(h.fashion.trending(1).iter().map(|p| p.id).collect::<Vec<_>>(), vec![scarf]);
        assert_eq!(h.fashion.out_of_stock().iter().map(|p| p.id).collect::<Vec<_>>(), vec![scarf]);

        let shirt_sku = h.fashion.get(&shirt).unwrap().sku;
        assert!(shirt_sku.starts_with("CLO-LINEN-"));
        assert_eq!(h.fashion.by_sku(&shirt_sku.to_lowercase()).map(|p| p.id), Some(shirt));

        let base = h.fashion.get(&shirt).unwrap().base_price;
        assert_eq!(h.fashion.price_range(base, base).len(), 2);
        assert!(h.fashion.price_range(base + Decimal::ONE, base + Decimal::TEN).is_empty());
    }
}
