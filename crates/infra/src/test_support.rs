//! Fixture wiring for infra tests: a full in-memory stack plus short-hand
//! commands.

use std::ops::Deref;

use chrono::Utc;
use rust_decimal::Decimal;

use stockroom_alerts::{ALERT_AGGREGATE_TYPE, Alert, AlertCommand, AlertId, DeleteAlert, ResolveAlert};
use stockroom_auth::{RegisterUser, Role, USER_AGGREGATE_TYPE, User, UserCommand};
use stockroom_catalog::{
    Color, CreateFashionProduct, CreateProduct, DeleteProduct, FASHION_PRODUCT_AGGREGATE_TYPE, FashionCategory,
    FashionCommand, FashionDetails, FashionProduct, FashionProductId, NewVariant, PRODUCT_AGGREGATE_TYPE, Product,
    ProductCommand, ProductDetails, ProductId, Season, Size, StockChange, UpdateProduct, VariantId,
    VariantStockChange,
};
use stockroom_core::{AggregateId, UserId};

use crate::command_dispatcher::DispatchError;
use crate::event_store::StoredEvent;
use crate::wiring::Stockroom;

pub(crate) const STAFF: &str = "staff";

pub(crate) struct Harness {
    stockroom: Stockroom,
}

impl Deref for Harness {
    type Target = Stockroom;

    fn deref(&self) -> &Stockroom {
        &self.stockroom
    }
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            stockroom: Stockroom::in_memory(),
        }
    }

    fn product(&self, id: ProductId, command: ProductCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch::<Product>(id.0, PRODUCT_AGGREGATE_TYPE, command, |agg| Product::empty(ProductId::new(agg)))
    }

    fn fashion_cmd(&self, id: FashionProductId, command: FashionCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<FashionProduct>(id.0, FASHION_PRODUCT_AGGREGATE_TYPE, command, |agg| {
            FashionProduct::empty(FashionProductId::new(agg))
        })
    }

    fn alert(&self, id: AlertId, command: AlertCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher
            .dispatch::<Alert>(id.0, ALERT_AGGREGATE_TYPE, command, |agg| Alert::empty(AlertId::new(agg)))
    }

    fn details(name: &str, category: &str, quantity: i64, min_stock_level: i64) -> ProductDetails {
        ProductDetails {
            name: name.to_string(),
            sku: None,
            description: None,
            category: category.to_string(),
            quantity,
            min_stock_level,
            price: Decimal::new(1999, 2),
        }
    }

    pub(crate) fn create_product(&self, name: &str, category: &str, quantity: i64, min: i64) -> ProductId {
        let id = ProductId::new(AggregateId::new());
        self.product(
            id,
            ProductCommand::Create(CreateProduct {
                product_id: id,
                details: Self::details(name, category, quantity, min),
                performed_by: STAFF.to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .expect("create product");
        id
    }

    /// Overwrite quantity and minimum, keeping the rest of the product.
    pub(crate) fn update_product(&self, id: ProductId, quantity: i64, min: i64) -> Result<(), DispatchError> {
        let current = self.products.get(&id).ok_or(DispatchError::NotFound)?;
        let mut details = Self::details(&current.name, &current.category, quantity, min);
        details.sku = Some(current.sku);
        self.product(
            id,
            ProductCommand::Update(UpdateProduct {
                product_id: id,
                details,
                performed_by: STAFF.to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    fn stock_change(id: ProductId, quantity: i64) -> StockChange {
        StockChange {
            product_id: id,
            quantity,
            reason: "test".to_string(),
            performed_by: STAFF.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub(crate) fn receive_stock(&self, id: ProductId, quantity: i64) -> Result<(), DispatchError> {
        self.product(id, ProductCommand::ReceiveStock(Self::stock_change(id, quantity)))
            .map(|_| ())
    }

    pub(crate) fn issue_stock(&self, id: ProductId, quantity: i64) -> Result<(), DispatchError> {
        self.product(id, ProductCommand::IssueStock(Self::stock_change(id, quantity)))
            .map(|_| ())
    }

    pub(crate) fn delete_product(&self, id: ProductId) -> Result<(), DispatchError> {
        self.product(
            id,
            ProductCommand::Delete(DeleteProduct {
                product_id: id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    /// Fashion product by "ACME" at 49.99, one variant per `(size, color, quantity, min)`.
    pub(crate) fn create_fashion(
        &self,
        name: &str,
        category: FashionCategory,
        season: Option<Season>,
        variants: &[(Size, Color, i64, i64)],
    ) -> (FashionProductId, Vec<VariantId>) {
        let id = FashionProductId::new(AggregateId::new());
        let variants: Vec<NewVariant> = variants
            .iter()
            .map(|&(size, color, quantity, min_stock_level)| NewVariant {
                variant_id: VariantId::new(),
                size,
                color,
                quantity,
                min_stock_level,
                price_adjustment: None,
            })
            .collect();
        let ids = variants.iter().map(|v| v.variant_id).collect();

        self.fashion_cmd(
            id,
            FashionCommand::Create(CreateFashionProduct {
                product_id: id,
                details: FashionDetails {
                    name: name.to_string(),
                    description: None,
                    category,
                    brand: "ACME".to_string(),
                    base_price: Decimal::new(4999, 2),
                    season,
                    target_gender: None,
                    material: None,
                    care_instructions: None,
                },
                variants,
                performed_by: STAFF.to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .expect("create fashion product");
        (id, ids)
    }

    fn variant_change(id: FashionProductId, variant_id: VariantId, quantity: i64) -> VariantStockChange {
        VariantStockChange {
            product_id: id,
            variant_id,
            quantity,
            reason: "test".to_string(),
            performed_by: STAFF.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub(crate) fn receive_variant(
        &self,
        id: FashionProductId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<(), DispatchError> {
        self.fashion_cmd(id, FashionCommand::ReceiveVariantStock(Self::variant_change(id, variant_id, quantity)))
            .map(|_| ())
    }

    pub(crate) fn issue_variant(
        &self,
        id: FashionProductId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<(), DispatchError> {
        self.fashion_cmd(id, FashionCommand::IssueVariantStock(Self::variant_change(id, variant_id, quantity)))
            .map(|_| ())
    }

    pub(crate) fn resolve_alert(&self, id: AlertId) -> Result<(), DispatchError> {
        self.alert(
            id,
            AlertCommand::Resolve(ResolveAlert {
                alert_id: id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    pub(crate) fn delete_alert(&self, id: AlertId) -> Result<(), DispatchError> {
        self.alert(
            id,
            AlertCommand::Delete(DeleteAlert {
                alert_id: id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    /// Registers with a placeholder hash; these tests never log in.
    pub(crate) fn register_user(&self, username: &str, email: &str, role: Role) -> Result<UserId, DispatchError> {
        let user_id = UserId::new();
        let stream = AggregateId::from_uuid(*user_id.as_uuid());
        self.dispatcher
            .dispatch::<User>(
                stream,
                USER_AGGREGATE_TYPE,
                UserCommand::Register(RegisterUser {
                    user_id,
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash: "$argon2id$placeholder".to_string(),
                    role,
                    allow_admin: false,
                    occurred_at: Utc::now(),
                }),
                |_| User::empty(user_id),
            )
            .map(|_| user_id)
    }
}
