use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{delete, get, put},
};
use serde_json::json;

use stockroom_alerts::{AlertId, AlertType};

use crate::app::dto;
use crate::app::errors::{self, ApiResult};
use crate::app::routes::common::{CmdAuth, guard};
use crate::app::services::AppServices;
use crate::authz::perms;
use crate::context::PrincipalContext;

const RECENT_LIMIT: usize = 10;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/active", get(active))
        .route("/recent", get(recent))
        .route("/type/:kind", get(by_type))
        .route("/mark-all-resolved", put(mark_all_resolved))
        .route("/cleanup-orphaned", delete(cleanup_orphaned))
        .route("/:id/resolve", put(resolve))
        .route("/:id", delete(remove))
}

pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ALERTS_READ)?;
    Ok(dto::api_response(
        "All alerts fetched successfully",
        services.stockroom().alerts.all(),
    ))
}

/// Active alerts whose product still exists.
pub async fn active(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ALERTS_READ)?;
    Ok(dto::api_response("Active alerts fetched successfully", services.active_alerts()))
}

pub async fn recent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ALERTS_READ)?;
    Ok(dto::api_response(
        "Recent alerts fetched successfully",
        services.stockroom().alerts.recent(RECENT_LIMIT),
    ))
}

pub async fn by_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
) -> ApiResult {
    guard(&principal, &perms::ALERTS_READ)?;
    let alert_type: AlertType = errors::parse(&kind, "alert type")?;
    Ok(dto::api_response(
        format!("Alerts of type {} fetched successfully", alert_type.as_str()),
        services.stockroom().alerts.by_type(alert_type),
    ))
}

pub async fn resolve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = CmdAuth {
        inner: id,
        required: vec![perms::ALERTS_RESOLVE],
    }
    .authorized(&principal)?;
    let alert_id: AlertId = errors::parse(&id, "alert id")?;

    let alert = services
        .resolve_alert(alert_id)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::api_response("Alert resolved successfully", alert))
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let id = CmdAuth {
        inner: id,
        required: vec![perms::ALERTS_DELETE],
    }
    .authorized(&principal)?;
    let alert_id: AlertId = errors::parse(&id, "alert id")?;

    services
        .delete_alert(alert_id)
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::api_message("Alert deleted successfully"))
}

pub async fn mark_all_resolved(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ALERTS_RESOLVE)?;
    let resolved = services
        .resolve_all_alerts()
        .map_err(errors::dispatch_error_to_response)?;
    Ok(dto::ok_json(json!({
        "success": true,
        "message": "All alerts marked as resolved successfully",
        "resolved": resolved,
    })))
}

pub async fn cleanup_orphaned(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult {
    guard(&principal, &perms::ALERTS_CLEANUP)?;
    let deleted = services
        .cleanup_orphaned_alerts()
        .map_err(errors::dispatch_error_to_response)?;
    tracing::info!(deleted, "orphaned alerts cleaned up");
    Ok(dto::ok_json(json!({
        "success": true,
        "message": format!("Cleaned up {deleted} orphaned alerts successfully"),
        "deleted": deleted,
    })))
}
