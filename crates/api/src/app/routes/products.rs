use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    routing::get,
};

use stockroom_catalog::ProductId;

use crate::app::dto::{self, ProductQuery, ProductRequest};
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{CmdAuth, guard};
use crate::app::services::AppServices;
use crate::authz::perms;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(low_stock))
        .route("/out-of-stock", get(out_of_stock))
        .route("/meta/categories", get(categories))
        .route("/category/:category", get(by_category))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ProductQuery>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let products = &services.stockroom().products;

    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let category = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let items = match (search, category) {
        (Some(term), Some(category)) => products
            .search(term)
            .into_iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect(),
        (Some(term), None) => products.search(term),
        (None, Some(category)) => products.by_category(category),
        (None, None) => products.list(),
    };
    Ok(dto::ok_json(items))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    let product_id: ProductId = errors::parse(&id, "product id")?;
    match services.stockroom().products.get(&product_id) {
        Some(view) => Ok(dto::ok_json(view)),
        None => Err(errors::not_found("Product not found")),
    }
}

/// POST /products - create a regular product (admin)
pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<ProductRequest>,
) -> ApiResult {
    let details = CmdAuth {
        inner: body.into_details(),
        required: vec![perms::PRODUCTS_WRITE],
    }
    .authorized(&principal)?;

    let view = services
        .create_product(details, principal.username())
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::created_json(view))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<ProductRequest>,
) -> ApiResult {
    let details = CmdAuth {
        inner: body.into_details(),
        required: vec![perms::PRODUCTS_WRITE],
    }
    .authorized(&principal)?;
    let product_id: ProductId = errors::parse(&id, "product id")?;

    let view = services
        .update_product(product_id, details, principal.username())
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::ok_json(view))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = CmdAuth {
        inner: id,
        required: vec![perms::PRODUCTS_WRITE],
    }
    .authorized(&principal)?;
    let product_id: ProductId = errors::parse(&id, "product id")?;

    services
        .delete_product(product_id)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::api_message("Product deleted successfully"))
}

pub async fn low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().products.low_stock()))
}

pub async fn out_of_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().products.out_of_stock()))
}

pub async fn by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(category): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().products.by_category(&category)))
}

pub async fn categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::CATALOG_READ)?;
    Ok(dto::ok_json(services.stockroom().products.categories()))
}
