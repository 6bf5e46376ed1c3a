//! CSV renderings of the read models, for spreadsheet download.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::projections::{FashionProductView, ProductView, StockTransactionView};

const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";

pub const TRANSACTIONS_HEADER: &str =
    "Date,Product Name,Product Details,Transaction Type,Quantity,User,Reason,Product ID,Transaction ID";
pub const PRODUCTS_HEADER: &str =
    "Product Name,SKU,Description,Category,Current Stock,Min Stock Level,Price,Stock Status,Created Date,Last Updated";
pub const FASHION_PRODUCTS_HEADER: &str = "Product Name,SKU,Brand,Category,Season,Gender,Base Price,Variant SKU,Size,Color,Quantity,Min Stock Level,Final Price,Stock Status";

/// Quote a field containing a comma, quote or line break; embedded quotes are doubled.
pub fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(fields: &[String]) -> String {
    let mut line = fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format(DATE_TIME).to_string()
}

/// `[start 00:00:00, end 23:59:59.999…]` covering both whole days. An `end`
/// on the last representable date runs to the end of time.
pub fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = match end.succ_opt() {
        Some(next) => next.and_time(NaiveTime::MIN).and_utc() - Duration::nanoseconds(1),
        None => NaiveDateTime::MAX.and_utc(),
    };
    (from, until)
}

pub fn transactions_csv(transactions: &[StockTransactionView]) -> String {
    let mut out = format!("{TRANSACTIONS_HEADER}\n");
    for t in transactions {
        let details = t
            .variant_details
            .clone()
            .unwrap_or_else(|| "Regular Product".to_string());
        let product_id = t.product_stream().map(|id| id.to_string()).unwrap_or_default();
        out.push_str(&row(&[
            timestamp(&t.created_at),
            t.entity_name.clone(),
            details,
            t.transaction_type.to_string(),
            t.quantity.to_string(),
            t.username.clone(),
            t.reason.clone(),
            product_id,
            t.id.to_string(),
        ]));
    }
    out
}

pub fn products_csv(products: &[ProductView]) -> String {
    let mut out = format!("{PRODUCTS_HEADER}\n");
    for p in products {
        out.push_str(&row(&[
            p.name.clone(),
            p.sku.clone(),
            p.description.clone().unwrap_or_default(),
            p.category.clone(),
            p.quantity.to_string(),
            p.min_stock_level.to_string(),
            p.price.to_string(),
            p.stock_status().to_string(),
            timestamp(&p.created_at),
            timestamp(&p.updated_at),
        ]));
    }
    out
}

/// One row per variant; a product without variants still gets a row.
pub fn fashion_products_csv(products: &[FashionProductView]) -> String {
    let mut out = format!("{FASHION_PRODUCTS_HEADER}\n");
    for p in products {
        let head = [
            p.name.clone(),
            p.sku.clone(),
            p.brand.clone(),
            p.category.display_name().to_string(),
            p.season.map(|s| s.display_name().to_string()).unwrap_or_default(),
            p.target_gender.map(|g| g.display_name().to_string()).unwrap_or_default(),
            p.base_price.to_string(),
        ];

        if p.variants.is_empty() {
            let mut fields = head.to_vec();
            fields.extend(std::iter::repeat_n(String::new(), 7));
            out.push_str(&row(&fields));
            continue;
        }

        for v in &p.variants {
            let mut fields = head.to_vec();
            fields.extend([
                v.variant_sku.clone(),
                v.size_display_name.clone(),
                v.color_display_name.clone(),
                v.quantity.to_string(),
                v.min_stock_level.to_string(),
                v.final_price.to_string(),
                v.stock_status().to_string(),
            ]);
            out.push_str(&row(&fields));
        }
    }
    out
}
