//! Role dashboards. Each one lists the fashion catalog with stock counters;
//! the manager and admin views add transactions and alerts.

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    routing::get,
};
use serde_json::{Value as JsonValue, json};

use crate::app::dto;
use crate::app::errors::ApiResult;
use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::authz::perms;
use crate::context::PrincipalContext;

const RECENT_LIMIT: usize = 10;

pub fn router() -> Router {
    Router::new()
        .route("/staff", get(staff))
        .route("/manager", get(manager))
        .route("/admin", get(admin))
}

/// `{products, stats}` with the catalog counters every dashboard shares.
fn catalog_overview(services: &AppServices) -> (JsonValue, serde_json::Map<String, JsonValue>) {
    let fashion = &services.stockroom().fashion;
    let products = fashion.list();

    let mut stats = serde_json::Map::new();
    stats.insert("totalProducts".to_string(), json!(products.len()));
    stats.insert("lowStockProducts".to_string(), json!(fashion.low_stock().len()));
    stats.insert("outOfStockProducts".to_string(), json!(fashion.out_of_stock().len()));
    (json!(products), stats)
}

pub async fn staff(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::DASHBOARD_STAFF)?;
    let (products, stats) = catalog_overview(&services);
    Ok(dto::ok_json(json!({ "products": products, "stats": stats })))
}

pub async fn manager(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::DASHBOARD_MANAGER)?;
    let (products, mut stats) = catalog_overview(&services);
    let alerts = services.active_alerts();
    stats.insert("activeAlerts".to_string(), json!(alerts.len()));

    Ok(dto::ok_json(json!({
        "products": products,
        "recentTransactions": services.stockroom().ledger.recent(RECENT_LIMIT),
        "alerts": alerts,
        "stats": stats,
    })))
}

pub async fn admin(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ADMIN_STATS)?;
    let stockroom = services.stockroom();
    let (products, mut stats) = catalog_overview(&services);
    stats.insert("activeAlerts".to_string(), json!(services.active_alerts().len()));
    stats.insert("totalTransactions".to_string(), json!(stockroom.ledger.count()));

    Ok(dto::ok_json(json!({
        "products": products,
        "recentTransactions": stockroom.ledger.recent(RECENT_LIMIT),
        "alerts": stockroom.alerts.recent(RECENT_LIMIT),
        "stats": stats,
    })))
}
