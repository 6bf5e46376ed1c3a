use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockroom_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use stockroom_events::Event;

use crate::sku::product_sku;
use crate::stock::{MovementKind, StockMovement};

/// Stream type for regular product aggregates.
pub const PRODUCT_AGGREGATE_TYPE: &str = "catalog.product";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Aggregate root: a regular (non-variant) product with a single stock level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    sku: String,
    description: Option<String>,
    category: String,
    quantity: i64,
    min_stock_level: i64,
    price: Decimal,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            sku: String::new(),
            description: None,
            category: String::new(),
            quantity: 0,
            min_stock_level: 0,
            price: Decimal::ZERO,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn min_stock_level(&self) -> i64 {
        self.min_stock_level
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_level
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Descriptive fields shared by create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    /// Blank or absent: generate on create, keep on update.
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: String,
    pub quantity: i64,
    pub min_stock_level: i64,
    pub price: Decimal,
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub product_id: ProductId,
    pub details: ProductDetails,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProduct. Overwrites every field, including the quantity;
/// a quantity change is recorded as a stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub details: ProductDetails,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command payload for ReceiveStock / IssueStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: ProductId,
    pub quantity: i64,
    pub reason: String,
    pub performed_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    Create(CreateProduct),
    Update(UpdateProduct),
    ReceiveStock(StockChange),
    IssueStock(StockChange),
    Delete(DeleteProduct),
}

/// Event: ProductCreated. Stock starts at zero; initial stock follows as a
/// separate `StockMoved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: String,
    pub min_stock_level: i64,
    pub price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category: String,
    pub min_stock_level: i64,
    pub price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockMoved. Carries the product name as of the movement so the
/// ledger stays readable after renames and deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMoved {
    pub product_id: ProductId,
    pub product_name: String,
    pub movement: StockMovement,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeleted {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    Created(ProductCreated),
    Updated(ProductUpdated),
    StockMoved(StockMoved),
    Deleted(ProductDeleted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::Created(_) => "catalog.product.created",
            ProductEvent::Updated(_) => "catalog.product.updated",
            ProductEvent::StockMoved(_) => "catalog.product.stock_moved",
            ProductEvent::Deleted(_) => "catalog.product.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::Created(e) => e.occurred_at,
            ProductEvent::Updated(e) => e.occurred_at,
            ProductEvent::StockMoved(e) => e.occurred_at,
            ProductEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::Created(e) => {
                self.id = e.product_id;
                self.name = e.name.clone();
                self.sku = e.sku.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.quantity = 0;
                self.min_stock_level = e.min_stock_level;
                self.price = e.price;
                self.created = true;
            }
            ProductEvent::Updated(e) => {
                self.name = e.name.clone();
                self.sku = e.sku.clone();
                self.description = e.description.clone();
                self.category = e.category.clone();
                self.min_stock_level = e.min_stock_level;
                self.price = e.price;
            }
            ProductEvent::StockMoved(e) => {
                self.quantity = e.movement.quantity_after;
            }
            ProductEvent::Deleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::Create(cmd) => self.handle_create(cmd),
            ProductCommand::Update(cmd) => self.handle_update(cmd),
            ProductCommand::ReceiveStock(cmd) => self.handle_stock(cmd, MovementKind::StockIn),
            ProductCommand::IssueStock(cmd) => self.handle_stock(cmd, MovementKind::StockOut),
            ProductCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

fn validate_details(details: &ProductDetails) -> Result<(), DomainError> {
    if details.name.trim().is_empty() {
        return Err(DomainError::validation("Product name is required"));
    }
    if details.category.trim().is_empty() {
        return Err(DomainError::validation("Category is required"));
    }
    if details.quantity < 0 {
        return Err(DomainError::validation("Quantity cannot be negative"));
    }
    if details.min_stock_level < 0 {
        return Err(DomainError::validation("Minimum stock level cannot be negative"));
    }
    if details.price.is_sign_negative() {
        return Err(DomainError::validation("Price cannot be negative"));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Product {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }
        let d = &cmd.details;
        validate_details(d)?;

        let name = d.name.trim().to_string();
        let sku = non_blank(&d.sku).unwrap_or_else(|| product_sku(&name, cmd.occurred_at));

        let mut events = vec![ProductEvent::Created(ProductCreated {
            product_id: cmd.product_id,
            name: name.clone(),
            sku,
            description: non_blank(&d.description),
            category: d.category.trim().to_string(),
            min_stock_level: d.min_stock_level,
            price: d.price,
            occurred_at: cmd.occurred_at,
        })];

        if d.quantity > 0 {
            let movement = StockMovement::plan(
                0,
                MovementKind::StockIn,
                d.quantity,
                format!("Initial stock - Product created with {} units", d.quantity),
                cmd.performed_by.clone(),
            )?;
            events.push(ProductEvent::StockMoved(StockMoved {
                product_id: cmd.product_id,
                product_name: name,
                movement,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;
        let d = &cmd.details;
        validate_details(d)?;

        let name = d.name.trim().to_string();
        let mut events = vec![ProductEvent::Updated(ProductUpdated {
            product_id: cmd.product_id,
            name: name.clone(),
            sku: non_blank(&d.sku).unwrap_or_else(|| self.sku.clone()),
            description: non_blank(&d.description),
            category: d.category.trim().to_string(),
            min_stock_level: d.min_stock_level,
            price: d.price,
            occurred_at: cmd.occurred_at,
        })];

        let direction = if d.quantity > self.quantity { "increased" } else { "decreased" };
        if let Some(movement) = StockMovement::between(
            self.quantity,
            d.quantity,
            format!("Product updated - Stock {direction} from {} to {}", self.quantity, d.quantity),
            cmd.performed_by.clone(),
        ) {
            events.push(ProductEvent::StockMoved(StockMoved {
                product_id: cmd.product_id,
                product_name: name,
                movement,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_stock(&self, cmd: &StockChange, kind: MovementKind) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;

        let movement = StockMovement::plan(
            self.quantity,
            kind,
            cmd.quantity,
            cmd.reason.trim(),
            cmd.performed_by.clone(),
        )?;

        Ok(vec![ProductEvent::StockMoved(StockMoved {
            product_id: cmd.product_id,
            product_name: self.name.clone(),
            movement,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;
        Ok(vec![ProductEvent::Deleted(ProductDeleted {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
