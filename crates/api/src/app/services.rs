//! Application services: the in-memory stockroom plus the command helpers the
//! routes share (uniqueness checks, stock movements, alert housekeeping).

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use stockroom_alerts::{ALERT_AGGREGATE_TYPE, Alert, AlertCommand, AlertId, AlertSubject, DeleteAlert, ResolveAlert};
use stockroom_auth::{
    ChangePassword, ChangeUserStatus, DeleteUser, Hs256JwtIssuer, JwtClaims, OtpPolicy, RegisterUser, Role,
    TokenError, USER_AGGREGATE_TYPE, User, UserCommand, UserStatus,
};
use stockroom_catalog::{
    AddVariant, CreateFashionProduct, CreateProduct, DeleteFashionProduct, DeleteProduct,
    FASHION_PRODUCT_AGGREGATE_TYPE, FashionCommand, FashionDetails, FashionProduct, FashionProductId, MovementKind,
    NewVariant, PRODUCT_AGGREGATE_TYPE, Product, ProductCommand, ProductDetails, ProductId, StockChange,
    UpdateFashionProduct, UpdateProduct, VariantId, VariantStockChange,
};
use stockroom_core::{AggregateId, UserId};
use stockroom_infra::command_dispatcher::DispatchError;
use stockroom_infra::event_store::StoredEvent;
use stockroom_infra::projections::{AlertView, FashionProductView, ProductView, StockTransactionView, UserView};
use stockroom_infra::{OtpNotifier, OtpStore, Stockroom};

use crate::config::Settings;

/// What a stock movement is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget {
    Product(ProductId),
    Variant(FashionProductId, VariantId),
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub allow_admin: bool,
}

pub struct AppServices {
    stockroom: Stockroom,
    otp: OtpStore,
    notifier: Arc<dyn OtpNotifier>,
    issuer: Hs256JwtIssuer,
    token_ttl: Duration,
    /// Serializes username/email uniqueness checks with the registration.
    registration: Mutex<()>,
    /// Same for product name/SKU uniqueness.
    catalog: Mutex<()>,
}

impl AppServices {
    pub fn new(settings: &Settings, notifier: Arc<dyn OtpNotifier>) -> Self {
        let policy = OtpPolicy {
            expiry: Duration::minutes(settings.otp.expiry_minutes),
            max_attempts: settings.otp.max_attempts,
            max_daily_requests: settings.otp.max_daily_requests,
        };
        Self {
            stockroom: Stockroom::in_memory(),
            otp: OtpStore::new(policy),
            notifier,
            issuer: Hs256JwtIssuer::new(settings.jwt_secret().as_bytes()),
            token_ttl: Duration::minutes(settings.auth.token_ttl_minutes),
            registration: Mutex::new(()),
            catalog: Mutex::new(()),
        }
    }

    pub fn stockroom(&self) -> &Stockroom {
        &self.stockroom
    }

    pub fn otp(&self) -> &OtpStore {
        &self.otp
    }

    pub fn notifier(&self) -> &dyn OtpNotifier {
        self.notifier.as_ref()
    }

    pub fn issue_token(&self, user: &UserView, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.issuer.issue(&JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            issued_at: now,
            expires_at: now + self.token_ttl,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    fn dispatch_product(&self, id: ProductId, command: ProductCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.stockroom
            .dispatcher
            .dispatch::<Product>(id.0, PRODUCT_AGGREGATE_TYPE, command, |agg| Product::empty(ProductId::new(agg)))
    }

    fn dispatch_fashion(
        &self,
        id: FashionProductId,
        command: FashionCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.stockroom
            .dispatcher
            .dispatch::<FashionProduct>(id.0, FASHION_PRODUCT_AGGREGATE_TYPE, command, |agg| {
                FashionProduct::empty(FashionProductId::new(agg))
            })
    }

    fn dispatch_alert(&self, id: AlertId, command: AlertCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.stockroom
            .dispatcher
            .dispatch::<Alert>(id.0, ALERT_AGGREGATE_TYPE, command, |agg| Alert::empty(AlertId::new(agg)))
    }

    fn dispatch_user(&self, id: UserId, command: UserCommand) -> Result<Vec<StoredEvent>, DispatchError> {
        self.stockroom
            .dispatcher
            .dispatch::<User>(AggregateId::from(id), USER_AGGREGATE_TYPE, command, |_| User::empty(id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_user(&self, new_user: NewUser) -> Result<UserView, DispatchError> {
        let _guard = self.registration.lock().unwrap_or_else(PoisonError::into_inner);
        let users = &self.stockroom.users;

        if users.by_username(&new_user.username).is_some() {
            return Err(DispatchError::Concurrency("Username is already taken!".to_string()));
        }
        if users.by_email(&new_user.email).is_some() {
            return Err(DispatchError::Concurrency("Email is already in use!".to_string()));
        }

        let user_id = UserId::new();
        self.dispatch_user(
            user_id,
            UserCommand::Register(RegisterUser {
                user_id,
                username: new_user.username,
                email: new_user.email,
                password_hash: new_user.password_hash,
                role: new_user.role,
                allow_admin: new_user.allow_admin,
                occurred_at: Utc::now(),
            }),
        )?;
        users.get(&user_id).ok_or(DispatchError::NotFound)
    }

    pub fn change_user_status(&self, user_id: UserId, status: UserStatus) -> Result<UserView, DispatchError> {
        self.dispatch_user(
            user_id,
            UserCommand::ChangeStatus(ChangeUserStatus {
                user_id,
                status,
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.users.get(&user_id).ok_or(DispatchError::NotFound)
    }

    pub fn delete_user(&self, user_id: UserId) -> Result<(), DispatchError> {
        self.dispatch_user(
            user_id,
            UserCommand::Delete(DeleteUser {
                user_id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    pub fn change_password(&self, user_id: UserId, password_hash: String) -> Result<(), DispatchError> {
        self.dispatch_user(
            user_id,
            UserCommand::ChangePassword(ChangePassword {
                user_id,
                password_hash,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Regular products
    // ─────────────────────────────────────────────────────────────────────────

    /// Name and SKU must not belong to a product other than `except`.
    fn check_product_unique(&self, details: &ProductDetails, except: Option<ProductId>) -> Result<(), DispatchError> {
        let products = &self.stockroom.products;
        let taken_by_other = |found: Option<ProductView>| found.is_some_and(|p| Some(p.id) != except);

        if taken_by_other(products.by_name(&details.name)) {
            return Err(DispatchError::Concurrency("Product with this name already exists".to_string()));
        }
        if let Some(sku) = details.sku.as_deref().filter(|s| !s.trim().is_empty()) {
            if taken_by_other(products.by_sku(sku)) {
                return Err(DispatchError::Concurrency(format!("Product with SKU '{sku}' already exists")));
            }
        }
        Ok(())
    }

    pub fn create_product(&self, details: ProductDetails, performed_by: &str) -> Result<ProductView, DispatchError> {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_product_unique(&details, None)?;

        let product_id = ProductId::new(AggregateId::new());
        self.dispatch_product(
            product_id,
            ProductCommand::Create(CreateProduct {
                product_id,
                details,
                performed_by: performed_by.to_string(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.products.get(&product_id).ok_or(DispatchError::NotFound)
    }

    pub fn update_product(
        &self,
        product_id: ProductId,
        details: ProductDetails,
        performed_by: &str,
    ) -> Result<ProductView, DispatchError> {
        let _guard = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);
        if self.stockroom.products.get(&product_id).is_none() {
            return Err(DispatchError::NotFound);
        }
        self.check_product_unique(&details, Some(product_id))?;

        self.dispatch_product(
            product_id,
            ProductCommand::Update(UpdateProduct {
                product_id,
                details,
                performed_by: performed_by.to_string(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.products.get(&product_id).ok_or(DispatchError::NotFound)
    }

    pub fn delete_product(&self, product_id: ProductId) -> Result<(), DispatchError> {
        self.dispatch_product(
            product_id,
            ProductCommand::Delete(DeleteProduct {
                product_id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fashion products
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_fashion_product(
        &self,
        details: FashionDetails,
        variants: Vec<NewVariant>,
        performed_by: &str,
    ) -> Result<FashionProductView, DispatchError> {
        let product_id = FashionProductId::new(AggregateId::new());
        self.dispatch_fashion(
            product_id,
            FashionCommand::Create(CreateFashionProduct {
                product_id,
                details,
                variants,
                performed_by: performed_by.to_string(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.fashion.get(&product_id).ok_or(DispatchError::NotFound)
    }

    pub fn update_fashion_product(
        &self,
        product_id: FashionProductId,
        details: FashionDetails,
    ) -> Result<FashionProductView, DispatchError> {
        self.dispatch_fashion(
            product_id,
            FashionCommand::Update(UpdateFashionProduct {
                product_id,
                details,
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.fashion.get(&product_id).ok_or(DispatchError::NotFound)
    }

    pub fn add_variant(
        &self,
        product_id: FashionProductId,
        variant: NewVariant,
        performed_by: &str,
    ) -> Result<FashionProductView, DispatchError> {
        self.dispatch_fashion(
            product_id,
            FashionCommand::AddVariant(AddVariant {
                product_id,
                variant,
                performed_by: performed_by.to_string(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.fashion.get(&product_id).ok_or(DispatchError::NotFound)
    }

    pub fn delete_fashion_product(&self, product_id: FashionProductId) -> Result<(), DispatchError> {
        self.dispatch_fashion(
            product_id,
            FashionCommand::Delete(DeleteFashionProduct {
                product_id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stock
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a stock in/out and return the resulting ledger entry.
    pub fn record_movement(
        &self,
        target: StockTarget,
        kind: MovementKind,
        quantity: i64,
        reason: String,
        performed_by: &str,
    ) -> Result<StockTransactionView, DispatchError> {
        let occurred_at = Utc::now();
        let committed = match target {
            StockTarget::Product(product_id) => {
                let change = StockChange {
                    product_id,
                    quantity,
                    reason,
                    performed_by: performed_by.to_string(),
                    occurred_at,
                };
                let command = match kind {
                    MovementKind::StockIn => ProductCommand::ReceiveStock(change),
                    MovementKind::StockOut => ProductCommand::IssueStock(change),
                };
                self.dispatch_product(product_id, command)?
            }
            StockTarget::Variant(product_id, variant_id) => {
                let change = VariantStockChange {
                    product_id,
                    variant_id,
                    quantity,
                    reason,
                    performed_by: performed_by.to_string(),
                    occurred_at,
                };
                let command = match kind {
                    MovementKind::StockIn => FashionCommand::ReceiveVariantStock(change),
                    MovementKind::StockOut => FashionCommand::IssueVariantStock(change),
                };
                self.dispatch_fashion(product_id, command)?
            }
        };

        committed
            .iter()
            .find_map(|event| self.stockroom.ledger.get(&event.event_id))
            .ok_or_else(|| DispatchError::Publish("stock movement missing from the ledger".to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Alerts
    // ─────────────────────────────────────────────────────────────────────────

    /// The product (or fashion product) the alert refers to no longer exists.
    pub fn is_orphaned(&self, alert: &AlertView) -> bool {
        match alert.subject {
            AlertSubject::Product { product_id } => self.stockroom.products.get(&product_id).is_none(),
            AlertSubject::Variant { product_id, .. } => self.stockroom.fashion.get(&product_id).is_none(),
        }
    }

    pub fn active_alerts(&self) -> Vec<AlertView> {
        self.stockroom
            .alerts
            .active()
            .into_iter()
            .filter(|a| !self.is_orphaned(a))
            .collect()
    }

    pub fn resolve_alert(&self, alert_id: AlertId) -> Result<AlertView, DispatchError> {
        self.dispatch_alert(
            alert_id,
            AlertCommand::Resolve(ResolveAlert {
                alert_id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.stockroom.alerts.get(&alert_id).ok_or(DispatchError::NotFound)
    }

    pub fn delete_alert(&self, alert_id: AlertId) -> Result<(), DispatchError> {
        self.dispatch_alert(
            alert_id,
            AlertCommand::Delete(DeleteAlert {
                alert_id,
                occurred_at: Utc::now(),
            }),
        )
        .map(|_| ())
    }

    /// Resolve every active alert; returns how many were resolved.
    pub fn resolve_all_alerts(&self) -> Result<usize, DispatchError> {
        let active = self.stockroom.alerts.active();
        for alert in &active {
            self.resolve_alert(alert.id)?;
        }
        Ok(active.len())
    }

    /// Delete alerts whose product is gone; returns how many were deleted.
    pub fn cleanup_orphaned_alerts(&self) -> Result<usize, DispatchError> {
        let orphans: Vec<AlertView> = self
            .stockroom
            .alerts
            .all()
            .into_iter()
            .filter(|a| self.is_orphaned(a))
            .collect();
        for alert in &orphans {
            self.delete_alert(alert.id)?;
        }
        Ok(orphans.len())
    }
}
