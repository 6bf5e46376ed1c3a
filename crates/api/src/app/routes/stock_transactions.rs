use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::get,
};
use chrono::Utc;

use stockroom_catalog::{FashionProductId, MovementKind, ProductId, VariantId};
use stockroom_core::AggregateId;
use stockroom_infra::export;

use crate::app::dto::{self, ExportQuery, StockRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{CmdAuth, guard};
use crate::app::services::{AppServices, StockTarget};
use crate::authz::perms;
use crate::context::PrincipalContext;

const RECENT_LIMIT: usize = 10;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/type/:kind", get(by_type))
        .route("/product/:product_id", get(by_product))
        .route("/recent", get(recent))
        .route("/export", get(export_csv))
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_AUDIT)?;
    Ok(dto::ok_json(services.stockroom().ledger.all()))
}

fn target(body: &StockRequest) -> Result<StockTarget, axum::response::Response> {
    if let Some(raw) = body.product_id.as_deref() {
        let product_id: ProductId = errors::parse(raw, "product id")?;
        return Ok(StockTarget::Product(product_id));
    }
    match (body.fashion_product_id.as_deref(), body.variant_id.as_deref()) {
        (Some(product), Some(variant)) => {
            let product_id: FashionProductId = errors::parse(product, "fashion product id")?;
            let variant_id: VariantId = errors::parse(variant, "variant id")?;
            Ok(StockTarget::Variant(product_id, variant_id))
        }
        _ => Err(errors::bad_request(
            "Either productId or (fashionProductId + variantId) must be provided",
        )),
    }
}

/// POST /stock-transactions - stock in/out against a product or a variant
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<StockRequest>,
) -> ApiResult {
    let body = CmdAuth {
        inner: body,
        required: vec![perms::STOCK_WRITE],
    }
    .authorized(&principal)?;
    let target = target(&body)?;
    let kind: MovementKind = errors::parse(&body.kind, "transaction type")?;

    let transaction = services
        .record_movement(target, kind, body.quantity, body.reason.unwrap_or_default(), principal.username())
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::created_json(transaction))
}

pub async fn by_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_READ)?;
    let kind: MovementKind = errors::parse(&kind, "transaction type")?;
    Ok(dto::ok_json(services.stockroom().ledger.by_type(kind)))
}

/// Ledger for a regular or fashion product id.
pub async fn by_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(product_id): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_READ)?;
    let stream: AggregateId = errors::parse(&product_id, "product id")?;
    Ok(dto::ok_json(services.stockroom().ledger.by_any_product(stream)))
}

pub async fn recent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_READ)?;
    Ok(dto::ok_json(services.stockroom().ledger.recent(RECENT_LIMIT)))
}

/// GET /stock-transactions/export?startDate=yyyy-MM-dd&endDate=yyyy-MM-dd
pub async fn export_csv(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ExportQuery>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_EXPORT)?;
    Ok(transactions_download(&services, &query))
}

/// Shared with the admin export: all transactions, or the whole days in range.
pub(crate) fn transactions_download(services: &AppServices, query: &ExportQuery) -> axum::response::Response {
    let ledger = &services.stockroom().ledger;
    let (rows, filename) = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => {
            let (from, until) = export::day_bounds(start, end);
            (ledger.between(from, until), format!("transactions_{start}_to_{end}.csv"))
        }
        _ => (ledger.all(), format!("transactions_{}.csv", Utc::now().date_naive())),
    };
    dto::csv_attachment(&filename, export::transactions_csv(&rows))
}
