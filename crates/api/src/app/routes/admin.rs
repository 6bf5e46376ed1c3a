//! Admin routes: user approval, statistics and spreadsheet exports.
//!
//! Admin accounts themselves cannot be re-statused or deleted; the `User`
//! aggregate refuses and the refusal surfaces as 422.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::{get, patch},
};
use chrono::{Duration, Utc};
use serde_json::json;

use stockroom_auth::UserStatus;
use stockroom_core::UserId;
use stockroom_infra::export;

use crate::app::dto::{self, ExportQuery, StatusRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{CmdAuth, guard};
use crate::app::routes::stock_transactions::transactions_download;
use crate::app::services::AppServices;
use crate::authz::perms;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/pending-users", get(pending_users))
        .route("/users", get(list_users))
        .route("/users/:id/status", patch(update_status))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/stats", get(stats))
        .route("/transactions/export", get(export_transactions))
        .route("/products/export", get(export_products))
        .route("/fashion-products/export", get(export_fashion_products))
}

pub async fn pending_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ADMIN_USERS)?;
    Ok(dto::ok_json(json!({ "users": services.stockroom().users.pending() })))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ADMIN_USERS)?;
    Ok(dto::ok_json(json!({ "users": services.stockroom().users.list() })))
}

/// PATCH /admin/users/:id/status - approve or reject
pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult {
    let (id, body) = CmdAuth {
        inner: (id, body),
        required: vec![perms::ADMIN_USERS],
    }
    .authorized(&principal)?;
    let user_id: UserId = errors::parse(&id, "user id")?;
    let status: UserStatus = errors::parse(&body.status, "status")?;

    let user = services
        .change_user_status(user_id, status)
        .map_err(errors::dispatch_error_to_response)?;
    tracing::info!(user_id = %user.id, status = %user.status, admin = principal.username(), "user status changed");
    Ok(dto::api_response(
        format!("User {} successfully", status.as_str().to_lowercase()),
        user,
    ))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = CmdAuth {
        inner: id,
        required: vec![perms::ADMIN_USERS],
    }
    .authorized(&principal)?;
    let user_id: UserId = errors::parse(&id, "user id")?;

    services
        .delete_user(user_id)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::api_message("User deleted successfully"))
}

pub async fn stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ADMIN_STATS)?;
    let stockroom = services.stockroom();
    let week_ago = Utc::now() - Duration::days(7);

    Ok(dto::ok_json(json!({
        "users": stockroom.users.count_by_status(),
        "products": {
            "totalProducts": stockroom.products.count(),
            "totalStock": stockroom.products.total_stock(),
            "lowStockCount": stockroom.products.low_stock().len(),
            "outOfStockCount": stockroom.products.out_of_stock().len(),
        },
        "recentTransactions": stockroom.ledger.since(week_ago).len(),
        "activeAlerts": stockroom.alerts.count_active(),
    })))
}

pub async fn export_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ExportQuery>,
) -> ApiResult {
    guard(&principal, &perms::ADMIN_STATS)?;
    Ok(transactions_download(&services, &query))
}

pub async fn export_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::REPORTS_EXPORT)?;
    let csv = export::products_csv(&services.stockroom().products.list());
    Ok(dto::csv_attachment(
        &format!("products_{}.csv", Utc::now().date_naive()),
        csv,
    ))
}

pub async fn export_fashion_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::REPORTS_EXPORT)?;
    let csv = export::fashion_products_csv(&services.stockroom().fashion.list());
    Ok(dto::csv_attachment(
        &format!("fashion_products_{}.csv", Utc::now().date_naive()),
        csv,
    ))
}
