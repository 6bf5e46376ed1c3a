//! Read-only transaction history for the reporting pages.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path, Query},
    routing::get,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use stockroom_catalog::MovementKind;
use stockroom_infra::projections::StockTransactionView;

use crate::app::dto::{self, DateRangeQuery};
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::authz::perms;
use crate::context::PrincipalContext;

const RECENT_LIMIT: usize = 100;
const CHART_DAYS: i64 = 7;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/type/:kind", get(by_type))
        .route("/date-range", get(date_range))
        .route("/recent", get(recent))
        .route("/statistics", get(statistics))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMovements {
    pub date: NaiveDate,
    pub stock_in: usize,
    pub stock_out: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatistics {
    pub total_transactions: usize,
    pub stock_in: usize,
    pub stock_out: usize,
    pub quantity_in: i64,
    pub quantity_out: i64,
    /// Oldest day first, ending with `today`.
    pub daily: Vec<DailyMovements>,
}

impl TransactionStatistics {
    pub fn compute(transactions: &[StockTransactionView], today: NaiveDate) -> Self {
        let mut stats = Self {
            total_transactions: transactions.len(),
            stock_in: 0,
            stock_out: 0,
            quantity_in: 0,
            quantity_out: 0,
            daily: (0..CHART_DAYS)
                .rev()
                .map(|back| DailyMovements {
                    date: today - Duration::days(back),
                    stock_in: 0,
                    stock_out: 0,
                })
                .collect(),
        };

        for t in transactions {
            let day = stats.daily.iter_mut().find(|d| d.date == t.created_at.date_naive());
            match t.transaction_type {
                MovementKind::StockIn => {
                    stats.stock_in += 1;
                    stats.quantity_in += t.quantity;
                    if let Some(day) = day {
                        day.stock_in += 1;
                    }
                }
                MovementKind::StockOut => {
                    stats.stock_out += 1;
                    stats.quantity_out += t.quantity;
                    if let Some(day) = day {
                        day.stock_out += 1;
                    }
                }
            }
        }
        stats
    }
}

/// RFC 3339, a zone-less ISO date-time, or a bare date (midnight).
fn parse_instant(raw: &str) -> Result<DateTime<Utc>, axum::response::Response> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(at.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day.and_time(NaiveTime::MIN).and_utc());
    }
    Err(errors::bad_request(format!("invalid date-time: {raw}")))
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::TRANSACTIONS_READ)?;
    Ok(dto::api_response(
        "Transactions fetched successfully",
        services.stockroom().ledger.all(),
    ))
}

pub async fn by_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::TRANSACTIONS_READ)?;
    let kind: MovementKind = errors::parse(&kind, "transaction type")?;
    Ok(dto::api_response(
        format!("Transactions of type {kind} fetched successfully"),
        services.stockroom().ledger.by_type(kind),
    ))
}

pub async fn date_range(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<DateRangeQuery>,
) -> ApiResult {
    guard(&principal, &perms::TRANSACTIONS_READ)?;
    let start = parse_instant(&query.start_date)?;
    let end = parse_instant(&query.end_date)?;
    Ok(dto::api_response(
        "Transactions in date range fetched successfully",
        services.stockroom().ledger.between(start, end),
    ))
}

pub async fn recent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::TRANSACTIONS_READ)?;
    Ok(dto::api_response(
        "Recent transactions fetched successfully",
        services.stockroom().ledger.recent(RECENT_LIMIT),
    ))
}

pub async fn statistics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::TRANSACTIONS_READ)?;
    let stats = TransactionStatistics::compute(&services.stockroom().ledger.all(), Utc::now().date_naive());
    Ok(dto::api_response("Statistics fetched successfully", stats))
}
