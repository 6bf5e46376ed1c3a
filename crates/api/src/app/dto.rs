use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use stockroom_catalog::{
    Color, FashionCategory, FashionDetails, Gender, NewVariant, ProductDetails, Season, Size, VariantId,
};

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

// -------------------------
// Catalog
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    pub price: Decimal,
}

impl ProductRequest {
    pub fn into_details(self) -> ProductDetails {
        ProductDetails {
            name: self.name,
            sku: self.sku.filter(|s| !s.trim().is_empty()),
            description: self.description,
            category: self.category,
            quantity: self.quantity,
            min_stock_level: self.min_stock_level,
            price: self.price,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRequest {
    pub size: Size,
    pub color: Color,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    pub price_adjustment: Option<Decimal>,
}

impl VariantRequest {
    pub fn into_new_variant(self) -> NewVariant {
        NewVariant {
            variant_id: VariantId::new(),
            size: self.size,
            color: self.color,
            quantity: self.quantity,
            min_stock_level: self.min_stock_level,
            price_adjustment: self.price_adjustment,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FashionProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: FashionCategory,
    pub brand: String,
    pub base_price: Decimal,
    pub season: Option<Season>,
    pub target_gender: Option<Gender>,
    pub material: Option<String>,
    pub care_instructions: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantRequest>,
}

impl FashionProductRequest {
    /// Split into the descriptive fields and the initial variants.
    pub fn into_parts(self) -> (FashionDetails, Vec<NewVariant>) {
        let details = FashionDetails {
            name: self.name,
            description: self.description,
            category: self.category,
            brand: self.brand,
            base_price: self.base_price,
            season: self.season,
            target_gender: self.target_gender,
            material: self.material,
            care_instructions: self.care_instructions,
        };
        let variants = self.variants.into_iter().map(VariantRequest::into_new_variant).collect();
        (details, variants)
    }
}

/// Body of both stock endpoints; the variant route fills the ids from its path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRequest {
    pub product_id: Option<String>,
    pub fashion_product_id: Option<String>,
    pub variant_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRangeQuery {
    pub min_price: Decimal,
    pub max_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SizeQuery {
    pub size: String,
}

#[derive(Debug, Deserialize)]
pub struct ColorQuery {
    pub color: String,
}

/// `yyyy-MM-dd` bounds for CSV downloads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// ISO date-time bounds, e.g. `2024-03-01T00:00:00`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: String,
    pub end_date: String,
}

// -------------------------
// Responses
// -------------------------

/// `{success: true, message, data}` envelope used by the auth, alert and
/// transaction endpoints.
pub fn api_response(message: impl Into<String>, data: impl Serialize) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message.into(),
            "data": data,
        })),
    )
        .into_response()
}

pub fn api_message(message: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn ok_json(value: impl Serialize) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

pub fn created_json(value: impl Serialize) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

/// `text/csv` attachment.
pub fn csv_attachment(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (axum::http::header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                axum::http::header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
