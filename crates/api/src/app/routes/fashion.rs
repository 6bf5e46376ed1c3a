//! Fashion products: catalog reads, variant management and variant stock.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Datelike, Utc};

use stockroom_catalog::{Color, FashionCategory, FashionProductId, Gender, MovementKind, Season, Size, VariantId};

use crate::app::dto::{self, ColorQuery, FashionProductRequest, PriceRangeQuery, SearchQuery, SizeQuery, StockRequest, VariantRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{CmdAuth, guard};
use crate::app::services::{AppServices, StockTarget};
use crate::authz::perms;
use crate::context::PrincipalContext;

const TRENDING_LIMIT: usize = 20;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/sku/:sku", get(by_sku))
        .route("/category/:category", get(by_category))
        .route("/brand/:brand", get(by_brand))
        .route("/season/:season", get(by_season))
        .route("/current-season", get(current_season))
        .route("/gender/:gender", get(by_gender))
        .route("/search", get(search))
        .route("/price-range", get(price_range))
        .route("/trending", get(trending))
        .route("/low-stock", get(low_stock))
        .route("/out-of-stock", get(out_of_stock))
        .route("/:id", get(get_one).put(update).delete(remove))
        .route("/:id/variants", post(add_variant))
        .route("/:id/variants/:variant_id/stock", post(variant_stock))
        .route("/:id/transactions", get(transactions))
        .route("/:id/sizes", get(sizes))
        .route("/:id/colors", get(colors))
        .route("/:id/colors-by-size", get(colors_by_size))
        .route("/:id/sizes-by-color", get(sizes_by_color))
}

fn fashion_not_found(id: &FashionProductId) -> axum::response::Response {
    errors::not_found(format!("Fashion product not found with ID: {id}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().fashion.list()))
}

pub async fn get_one(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let product_id: FashionProductId = errors::parse(&id, "fashion product id")?;
    services
        .stockroom()
        .fashion
        .get(&product_id)
        .map(dto::ok_json)
        .ok_or_else(|| fashion_not_found(&product_id))
}

pub async fn by_sku(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(sku): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    services
        .stockroom()
        .fashion
        .by_sku(&sku)
        .map(dto::ok_json)
        .ok_or_else(|| errors::not_found(format!("Fashion product not found with SKU: {sku}")))
}

pub async fn by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(category): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let category: FashionCategory = errors::parse(&category, "category")?;
    Ok(dto::ok_json(services.stockroom().fashion.by_category(category)))
}

pub async fn by_brand(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(brand): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().fashion.by_brand(&brand)))
}

pub async fn by_season(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(season): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let season: Season = errors::parse(&season, "season")?;
    Ok(dto::ok_json(services.stockroom().fashion.by_season(season)))
}

pub async fn current_season(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let month = Utc::now().month();
    Ok(dto::ok_json(services.stockroom().fashion.current_season(month)))
}

pub async fn by_gender(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(gender): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let gender: Gender = errors::parse(&gender, "gender")?;
    Ok(dto::ok_json(services.stockroom().fashion.by_gender(gender)))
}

pub async fn search(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<SearchQuery>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let term = query.q.or(query.name).unwrap_or_default();
    Ok(dto::ok_json(services.stockroom().fashion.search(&term)))
}

pub async fn price_range(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<PriceRangeQuery>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    if query.min_price > query.max_price {
        return Err(errors::bad_request("minPrice must not exceed maxPrice"));
    }
    Ok(dto::ok_json(
        services
            .stockroom()
            .fashion
            .price_range(query.min_price, query.max_price),
    ))
}

pub async fn trending(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().fashion.trending(TRENDING_LIMIT)))
}

pub async fn sizes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let product_id = existing(&services, &id)?;
    Ok(dto::ok_json(services.stockroom().fashion.available_sizes(&product_id, None)))
}

pub async fn colors(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let product_id = existing(&services, &id)?;
    Ok(dto::ok_json(services.stockroom().fashion.available_colors(&product_id, None)))
}

pub async fn colors_by_size(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<SizeQuery>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let size: Size = errors::parse(&query.size, "size")?;
    let product_id = existing(&services, &id)?;
    Ok(dto::ok_json(
        services
            .stockroom()
            .fashion
            .available_colors(&product_id, Some(size)),
    ))
}

pub async fn sizes_by_color(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Query(query): Query<ColorQuery>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let color: Color = errors::parse(&query.color, "color")?;
    let product_id = existing(&services, &id)?;
    Ok(dto::ok_json(
        services
            .stockroom()
            .fashion
            .available_sizes(&product_id, Some(color)),
    ))
}

fn existing(services: &AppServices, raw_id: &str) -> Result<FashionProductId, axum::response::Response> {
    let product_id: FashionProductId = errors::parse(raw_id, "fashion product id")?;
    match services.stockroom().fashion.get(&product_id) {
        Some(_) => Ok(product_id),
        None => Err(fashion_not_found(&product_id)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────────────────────────

/// POST /fashion-products - create with initial variants
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<FashionProductRequest>,
) -> ApiResult {
    let (details, variants) = CmdAuth {
        inner: body.into_parts(),
        required: vec![perms::FASHION_WRITE],
    }
    .authorized(&principal)?;

    let view = services
        .create_fashion_product(details, variants, principal.username())
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::created_json(view))
}

/// PUT /fashion-products/:id - descriptive fields only; variants in the body are ignored
pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<FashionProductRequest>,
) -> ApiResult {
    let (details, _) = CmdAuth {
        inner: body.into_parts(),
        required: vec![perms::FASHION_WRITE],
    }
    .authorized(&principal)?;
    let product_id: FashionProductId = errors::parse(&id, "fashion product id")?;

    let view = services
        .update_fashion_product(product_id, details)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::ok_json(view))
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = CmdAuth {
        inner: id,
        required: vec![perms::FASHION_DELETE],
    }
    .authorized(&principal)?;
    let product_id: FashionProductId = errors::parse(&id, "fashion product id")?;

    services
        .delete_fashion_product(product_id)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn add_variant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<VariantRequest>,
) -> ApiResult {
    let variant = CmdAuth {
        inner: body.into_new_variant(),
        required: vec![perms::FASHION_WRITE],
    }
    .authorized(&principal)?;
    let product_id: FashionProductId = errors::parse(&id, "fashion product id")?;

    let view = services
        .add_variant(product_id, variant, principal.username())
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::created_json(view))
}

// ─────────────────────────────────────────────────────────────────────────────
// Stock
// ─────────────────────────────────────────────────────────────────────────────

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_AUDIT)?;
    Ok(dto::ok_json(services.stockroom().fashion.low_stock()))
}

pub async fn out_of_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_AUDIT)?;
    Ok(dto::ok_json(services.stockroom().fashion.out_of_stock()))
}

/// POST /fashion-products/:id/variants/:variant_id/stock
pub async fn variant_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, variant_id)): Path<(String, String)>,
    Json(body): Json<StockRequest>,
) -> ApiResult {
    let (id, variant_id, body) = CmdAuth {
        inner: (id, variant_id, body),
        required: vec![perms::STOCK_WRITE],
    }
    .authorized(&principal)?;
    let product_id: FashionProductId = errors::parse(&id, "fashion product id")?;
    let variant_id: VariantId = errors::parse(&variant_id, "variant id")?;
    let kind: MovementKind = errors::parse(&body.kind, "transaction type")?;
    let target = StockTarget::Variant(product_id, variant_id);

    let transaction = services
        .record_movement(target, kind, body.quantity, body.reason.unwrap_or_default(), principal.username())
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::ok_json(transaction))
}

pub async fn transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::STOCK_AUDIT)?;
    let product_id: FashionProductId = errors::parse(&id, "fashion product id")?;
    Ok(dto::ok_json(services.stockroom().ledger.by_fashion_product(product_id)))
}
