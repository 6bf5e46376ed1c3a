//! Fashion product aggregate: a catalog entry with size/color variants, each
//! holding its own stock level.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stockroom_events::Event;

use crate::attributes::{Color, FashionCategory, Gender, Season, Size};
use crate::sku::{fashion_sku, variant_sku};
use crate::stock::{MovementKind, StockMovement};

/// Stream type for fashion product aggregates.
pub const FASHION_PRODUCT_AGGREGATE_TYPE: &str = "catalog.fashion_product";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FashionProductId(pub AggregateId);

impl FashionProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for FashionProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for FashionProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Variant identifier, unique across all products.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub AggregateId);

impl VariantId {
    pub fn new() -> Self {
        Self(AggregateId::new())
    }
}

impl Default for VariantId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for VariantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for VariantId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub id: VariantId,
    pub size: Size,
    pub color: Color,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub price_adjustment: Decimal,
    pub variant_sku: String,
}

impl Variant {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_level
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }
}

/// Aggregate root: FashionProduct.
///
/// # Invariants
/// - `(size, color)` is unique among a product's variants.
/// - `base_price > 0`; every variant quantity stays `>= 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FashionProduct {
    id: FashionProductId,
    details: Option<FashionDetails>,
    sku: String,
    variants: Vec<Variant>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl FashionProduct {
    pub fn empty(id: FashionProductId) -> Self {
        Self {
            id,
            details: None,
            sku: String::new(),
            variants: Vec::new(),
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn details(&self) -> Option<&FashionDetails> {
        self.details.as_ref()
    }

    pub fn name(&self) -> &str {
        self.details.as_ref().map(|d| d.name.as_str()).unwrap_or_default()
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn total_stock(&self) -> i64 {
        self.variants.iter().map(|v| v.quantity).sum()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for FashionProduct {
    type Id = FashionProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Descriptive fields; replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FashionDetails {
    pub name: String,
    pub description: Option<String>,
    pub category: FashionCategory,
    pub brand: String,
    pub base_price: Decimal,
    pub season: Option<Season>,
    pub target_gender: Option<Gender>,
    pub material: Option<String>,
    pub care_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVariant {
    pub variant_id: VariantId,
    pub size: Size,
    pub color: Color,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub price_adjustment: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFashionProduct {
    pub product_id: FashionProductId,
    pub details: FashionDetails,
    pub variants: Vec<NewVariant>,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Replaces descriptive fields only; variants and SKU are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFashionProduct {
    pub product_id: FashionProductId,
    pub details: FashionDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddVariant {
    pub product_id: FashionProductId,
    pub variant: NewVariant,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStockChange {
    pub product_id: FashionProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub reason: String,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFashionProduct {
    pub product_id: FashionProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FashionCommand {
    Create(CreateFashionProduct),
    Update(UpdateFashionProduct),
    AddVariant(AddVariant),
    ReceiveVariantStock(VariantStockChange),
    IssueVariantStock(VariantStockChange),
    Delete(DeleteFashionProduct),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FashionProductCreated {
    pub product_id: FashionProductId,
    pub sku: String,
    pub details: FashionDetails,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FashionProductUpdated {
    pub product_id: FashionProductId,
    pub details: FashionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Variant registered with zero stock; initial stock follows as a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAdded {
    pub product_id: FashionProductId,
    pub variant_id: VariantId,
    pub size: Size,
    pub color: Color,
    pub min_stock_level: i64,
    pub price_adjustment: Decimal,
    pub variant_sku: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStockMoved {
    pub product_id: FashionProductId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub size: Size,
    pub color: Color,
    pub movement: StockMovement,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FashionProductDeleted {
    pub product_id: FashionProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FashionEvent {
    Created(FashionProductCreated),
    Updated(FashionProductUpdated),
    VariantAdded(VariantAdded),
    VariantStockMoved(VariantStockMoved),
    Deleted(FashionProductDeleted),
}

impl Event for FashionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FashionEvent::Created(_) => "catalog.fashion_product.created",
            FashionEvent::Updated(_) => "catalog.fashion_product.updated",
            FashionEvent::VariantAdded(_) => "catalog.fashion_product.variant_added",
            FashionEvent::VariantStockMoved(_) => "catalog.fashion_product.variant_stock_moved",
            FashionEvent::Deleted(_) => "catalog.fashion_product.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FashionEvent::Created(e) => e.occurred_at,
            FashionEvent::Updated(e) => e.occurred_at,
            FashionEvent::VariantAdded(e) => e.occurred_at,
            FashionEvent::VariantStockMoved(e) => e.occurred_at,
            FashionEvent::Deleted(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for FashionProduct {
    type Command = FashionCommand;
    type Event = FashionEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            FashionEvent::Created(e) => {
                self.id = e.product_id;
                self.sku = e.sku.clone();
                self.details = Some(e.details.clone());
                self.created = true;
            }
            FashionEvent::Updated(e) => {
                self.details = Some(e.details.clone());
            }
            FashionEvent::VariantAdded(e) => {
                self.variants.push(Variant {
                    id: e.variant_id,
                    size: e.size,
                    color: e.color,
                    quantity: 0,
                    min_stock_level: e.min_stock_level,
                    price_adjustment: e.price_adjustment,
                    variant_sku: e.variant_sku.clone(),
                });
            }
            FashionEvent::VariantStockMoved(e) => {
                if let Some(v) = self.variants.iter_mut().find(|v| v.id == e.variant_id) {
                    v.quantity = e.movement.quantity_after;
                }
            }
            FashionEvent::Deleted(_) => {
                self.deleted = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FashionCommand::Create(cmd) => self.handle_create(cmd),
            FashionCommand::Update(cmd) => self.handle_update(cmd),
            FashionCommand::AddVariant(cmd) => self.handle_add_variant(cmd),
            FashionCommand::ReceiveVariantStock(cmd) => self.handle_variant_stock(cmd, MovementKind::StockIn),
            FashionCommand::IssueVariantStock(cmd) => self.handle_variant_stock(cmd, MovementKind::StockOut),
            FashionCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

fn normalize_details(d: &FashionDetails) -> Result<FashionDetails, DomainError> {
    fn clean(v: &Option<String>) -> Option<String> {
        v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
    }

    if d.name.trim().is_empty() {
        return Err(DomainError::validation("Product name is required"));
    }
    if d.brand.trim().is_empty() {
        return Err(DomainError::validation("Brand is required"));
    }
    if d.base_price <= Decimal::ZERO {
        return Err(DomainError::validation("Base price must be greater than 0"));
    }

    Ok(FashionDetails {
        name: d.name.trim().to_string(),
        description: clean(&d.description),
        category: d.category,
        brand: d.brand.trim().to_string(),
        base_price: d.base_price,
        season: d.season,
        target_gender: d.target_gender,
        material: clean(&d.material),
        care_instructions: clean(&d.care_instructions),
    })
}

fn validate_variant(v: &NewVariant) -> Result<(), DomainError> {
    if v.quantity < 0 {
        return Err(DomainError::validation("Quantity cannot be negative"));
    }
    if v.min_stock_level < 0 {
        return Err(DomainError::validation("Minimum stock level cannot be negative"));
    }
    Ok(())
}

impl FashionProduct {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    /// Events registering one variant plus its initial stock, if any.
    fn variant_events(
        &self,
        product_id: FashionProductId,
        product_sku: &str,
        product_name: &str,
        v: &NewVariant,
        performed_by: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<FashionEvent>, DomainError> {
        validate_variant(v)?;
        let mut events = vec![FashionEvent::VariantAdded(VariantAdded {
            product_id,
            variant_id: v.variant_id,
            size: v.size,
            color: v.color,
            min_stock_level: v.min_stock_level,
            price_adjustment: v.price_adjustment.unwrap_or(Decimal::ZERO),
            variant_sku: variant_sku(product_sku, v.size, v.color),
            occurred_at,
        })];
        if v.quantity > 0 {
            let movement = StockMovement::plan(
                0,
                MovementKind::StockIn,
                v.quantity,
                format!("Initial stock - Variant created with {} units", v.quantity),
                performed_by,
            )?;
            events.push(FashionEvent::VariantStockMoved(VariantStockMoved {
                product_id,
                variant_id: v.variant_id,
                product_name: product_name.to_string(),
                size: v.size,
                color: v.color,
                movement,
                occurred_at,
            }));
        }
        Ok(events)
    }

    fn handle_create(&self, cmd: &CreateFashionProduct) -> Result<Vec<FashionEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("fashion product already exists"));
        }
        let details = normalize_details(&cmd.details)?;

        let mut seen = std::collections::HashSet::new();
        for v in &cmd.variants {
            if !seen.insert((v.size, v.color)) {
                return Err(DomainError::validation(format!(
                    "Duplicate variant {}/{}",
                    v.size.display_name(),
                    v.color.display_name()
                )));
            }
        }

        let sku = fashion_sku(&details.name, details.category, cmd.occurred_at);
        let name = details.name.clone();
        let mut events = vec![FashionEvent::Created(FashionProductCreated {
            product_id: cmd.product_id,
            sku: sku.clone(),
            details,
            occurred_at: cmd.occurred_at,
        })];
        for v in &cmd.variants {
            events.extend(self.variant_events(
                cmd.product_id,
                &sku,
                &name,
                v,
                &cmd.performed_by,
                cmd.occurred_at,
            )?);
        }
        Ok(events)
    }

    fn handle_update(&self, cmd: &UpdateFashionProduct) -> Result<Vec<FashionEvent>, DomainError> {
        self.ensure_live()?;
        Ok(vec![FashionEvent::Updated(FashionProductUpdated {
            product_id: cmd.product_id,
            details: normalize_details(&cmd.details)?,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_variant(&self, cmd: &AddVariant) -> Result<Vec<FashionEvent>, DomainError> {
        self.ensure_live()?;
        let v = &cmd.variant;
        if self.variants.iter().any(|x| x.size == v.size && x.color == v.color) {
            return Err(DomainError::conflict(format!(
                "Variant {}/{} already exists",
                v.size.display_name(),
                v.color.display_name()
            )));
        }
        if self.variants.iter().any(|x| x.id == v.variant_id) {
            return Err(DomainError::conflict("variant id already in use"));
        }
        self.variant_events(
            cmd.product_id,
            &self.sku,
            self.name(),
            v,
            &cmd.performed_by,
            cmd.occurred_at,
        )
    }

    fn handle_variant_stock(
        &self,
        cmd: &VariantStockChange,
        kind: MovementKind,
    ) -> Result<Vec<FashionEvent>, DomainError> {
        self.ensure_live()?;
        let variant = self.variant(cmd.variant_id).ok_or_else(DomainError::not_found)?;

        let movement = StockMovement::plan(
            variant.quantity,
            kind,
            cmd.quantity,
            cmd.reason.trim(),
            cmd.performed_by.clone(),
        )?;

        Ok(vec![FashionEvent::VariantStockMoved(VariantStockMoved {
            product_id: cmd.product_id,
            variant_id: variant.id,
            product_name: self.name().to_string(),
            size: variant.size,
            color: variant.color,
            movement,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteFashionProduct) -> Result<Vec<FashionEvent>, DomainError> {
        self.ensure_live()?;
        Ok(vec![FashionEvent::Deleted(FashionProductDeleted {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockroom_events::execute;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn details() -> FashionDetails {
        FashionDetails {
            name: "Classic Tee".to_string(),
            description: None,
            category: FashionCategory::ClothingMens,
            brand: "Acme".to_string(),
            base_price: Decimal::new(1999, 2),
            season: Some(Season::Summer),
            target_gender: Some(Gender::Male),
            material: Some("Cotton".to_string()),
            care_instructions: None,
        }
    }

    fn new_variant(size: Size, color: Color, quantity: i64) -> NewVariant {
        NewVariant {
            variant_id: VariantId::new(),
            size,
            color,
            quantity,
            min_stock_level: 2,
            price_adjustment: None,
        }
    }

    fn created(variants: Vec<NewVariant>) -> FashionProduct {
        let id = FashionProductId::new(AggregateId::new());
        let mut product = FashionProduct::empty(id);
        execute(
            &mut product,
            &FashionCommand::Create(CreateFashionProduct {
                product_id: id,
                details: details(),
                variants,
                performed_by: "mia".to_string(),
                occurred_at: now(),
            }),
        )
        .unwrap();
        product
    }

    fn change(product: &FashionProduct, variant_id: VariantId, quantity: i64) -> VariantStockChange {
        VariantStockChange {
            product_id: *product.id(),
            variant_id,
            quantity,
            reason: "sale".to_string(),
            performed_by: "sam".to_string(),
            occurred_at: now(),
        }
    }

    #[test]
    fn create_registers_variants_and_initial_stock() {
        let product = created(vec![
            new_variant(Size::M, Color::Black, 10),
            new_variant(Size::L, Color::Black, 0),
        ]);
        // created + 2 variant_added + 1 stock movement
        assert_eq!(product.version(), 4);
        assert_eq!(product.total_stock(), 10);
        assert!(product.sku().starts_with("CLO-CLASS-"));
        let m = &product.variants()[0];
        assert_eq!(m.variant_sku, format!("{}-M-BLA", product.sku()));
        assert_eq!(m.price_adjustment, Decimal::ZERO);
        assert!(product.variants()[1].is_out_of_stock());
    }

    #[test]
    fn duplicate_size_color_is_rejected() {
        let id = FashionProductId::new(AggregateId::new());
        let err = FashionProduct::empty(id)
            .handle(&FashionCommand::Create(CreateFashionProduct {
                product_id: id,
                details: details(),
                variants: vec![new_variant(Size::M, Color::Red, 1), new_variant(Size::M, Color::Red, 2)],
                performed_by: "mia".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let product = created(vec![new_variant(Size::M, Color::Red, 1)]);
        let err = product
            .handle(&FashionCommand::AddVariant(AddVariant {
                product_id: *product.id(),
                variant: new_variant(Size::M, Color::Red, 0),
                performed_by: "mia".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn base_price_must_be_positive() {
        let id = FashionProductId::new(AggregateId::new());
        let mut d = details();
        d.base_price = Decimal::ZERO;
        let err = FashionProduct::empty(id)
            .handle(&FashionCommand::Create(CreateFashionProduct {
                product_id: id,
                details: d,
                variants: vec![],
                performed_by: "mia".to_string(),
                occurred_at: now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("Base price must be greater than 0"));
    }

    #[test]
    fn update_keeps_variants_and_sku() {
        let mut product = created(vec![new_variant(Size::S, Color::White, 3)]);
        let sku = product.sku().to_string();
        let mut d = details();
        d.name = "Classic Tee v2".to_string();
        d.brand = "Acme Co".to_string();
        let product_id = *product.id();
        execute(
            &mut product,
            &FashionCommand::Update(UpdateFashionProduct { product_id, details: d, occurred_at: now() }),
        )
        .unwrap();
        assert_eq!(product.name(), "Classic Tee v2");
        assert_eq!(product.sku(), sku);
        assert_eq!(product.variants().len(), 1);
        assert_eq!(product.total_stock(), 3);
    }

    #[test]
    fn variant_stock_out_checks_availability() {
        let product = created(vec![new_variant(Size::S, Color::White, 3)]);
        let vid = product.variants()[0].id;
        let err = product
            .handle(&FashionCommand::IssueVariantStock(change(&product, vid, 4)))
            .unwrap_err();
        assert_eq!(err, DomainError::invariant("Insufficient stock. Available: 3"));
    }

    #[test]
    fn variant_stock_moves_carry_snapshot_labels() {
        let mut product = created(vec![new_variant(Size::Shoe9Half, Color::Navy, 3)]);
        let vid = product.variants()[0].id;
        let cmd = FashionCommand::IssueVariantStock(change(&product, vid, 3));
        let events = execute(&mut product, &cmd).unwrap();
        let FashionEvent::VariantStockMoved(e) = &events[0] else {
            panic!("expected variant stock movement");
        };
        assert_eq!(e.product_name, "Classic Tee");
        assert_eq!((e.size, e.color), (Size::Shoe9Half, Color::Navy));
        assert_eq!(e.movement.quantity_after, 0);
        assert!(product.variants()[0].is_out_of_stock());
    }

    #[test]
    fn unknown_variant_is_not_found() {
        let product = created(vec![]);
        let err = product
            .handle(&FashionCommand::ReceiveVariantStock(change(&product, VariantId::new(), 1)))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn deleted_product_rejects_stock() {
        let mut product = created(vec![new_variant(Size::S, Color::White, 3)]);
        let vid = product.variants()[0].id;
        let id = *product.id();
        execute(&mut product, &FashionCommand::Delete(DeleteFashionProduct { product_id: id, occurred_at: now() }))
            .unwrap();
        let err = product
            .handle(&FashionCommand::ReceiveVariantStock(change(&product, vid, 1)))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 300, ..ProptestConfig::default() })]

        #[test]
        fn total_stock_is_sum_of_variants(quantities in prop::collection::vec(0i64..500, 1..8)) {
            let variants: Vec<NewVariant> = quantities
                .iter()
                .zip(Size::ALL.iter())
                .map(|(q, s)| new_variant(*s, Color::Black, *q))
                .collect();
            let product = created(variants);
            prop_assert_eq!(product.total_stock(), quantities.iter().sum::<i64>());
        }
    }
}
