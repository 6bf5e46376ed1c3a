use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use stockroom_alerts::{ALERT_AGGREGATE_TYPE, AlertEvent, AlertId, AlertStatus, AlertSubject, AlertType};
use stockroom_catalog::VariantId;
use stockroom_core::AggregateId;
use stockroom_events::{EventEnvelope, EventSubscriber, SubscriberError};

use super::cursor::StreamCursors;
use super::{ProjectionError, newest_first};
use crate::read_model::{InMemoryStore, KeyedStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub id: AlertId,
    /// Stream id of the regular or fashion product.
    pub product_id: AggregateId,
    pub variant_id: Option<VariantId>,
    #[serde(skip)]
    pub subject: AlertSubject,
    pub product_name: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub position: u64,
}

impl AlertView {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

/// Alerts that have not been deleted, resolved ones included.
#[derive(Debug)]
pub struct AlertsProjection<S = InMemoryStore<AlertId, AlertView>> {
    store: S,
    cursors: StreamCursors,
}

impl AlertsProjection {
    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }
}

impl<S> AlertsProjection<S>
where
    S: KeyedStore<AlertId, AlertView>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != ALERT_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.admit(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: AlertEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let alert_id = match &ev {
            AlertEvent::Raised(e) => e.alert_id,
            AlertEvent::Resolved(e) => e.alert_id,
            AlertEvent::Deleted(e) => e.alert_id,
        };
        if alert_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event alert_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            AlertEvent::Raised(e) => {
                self.store.upsert(
                    alert_id,
                    AlertView {
                        id: alert_id,
                        product_id: e.subject.product_stream(),
                        variant_id: e.subject.variant_id(),
                        subject: e.subject,
                        product_name: e.product_name,
                        alert_type: e.alert_type,
                        message: e.message,
                        status: AlertStatus::Active,
                        created_at: e.occurred_at,
                        resolved_at: None,
                        position: envelope.global_position(),
                    },
                );
            }
            AlertEvent::Resolved(e) => {
                let mut view = self
                    .store
                    .get(&alert_id)
                    .ok_or_else(|| ProjectionError::MissingView(format!("alert {alert_id}")))?;
                view.status = AlertStatus::Resolved;
                view.resolved_at = Some(e.occurred_at);
                self.store.upsert(alert_id, view);
            }
            AlertEvent::Deleted(_) => {
                self.store.remove(&alert_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    pub fn clear(&self) {
        self.store.clear();
        self.cursors.clear();
    }

    pub fn get(&self, alert_id: &AlertId) -> Option<AlertView> {
        self.store.get(alert_id)
    }

    /// All alerts, newest first.
    pub fn all(&self) -> Vec<AlertView> {
        self.filtered(|_| true)
    }

    pub fn active(&self) -> Vec<AlertView> {
        self.filtered(AlertView::is_active)
    }

    pub fn recent(&self, limit: usize) -> Vec<AlertView> {
        let mut all = self.all();
        all.truncate(limit);
        all
    }

    pub fn by_type(&self, alert_type: AlertType) -> Vec<AlertView> {
        self.filtered(|a| a.alert_type == alert_type)
    }

    /// The active alert of `alert_type` for the same product/variant, if any.
    pub fn find_active(&self, subject: &AlertSubject, alert_type: AlertType) -> Option<AlertView> {
        self.filtered(|a| a.is_active() && a.alert_type == alert_type && a.subject.same_target(subject))
            .into_iter()
            .next()
    }

    pub fn active_for(&self, subject: &AlertSubject) -> Vec<AlertView> {
        self.filtered(|a| a.is_active() && a.subject.same_target(subject))
    }

    pub fn count_active(&self) -> usize {
        self.store.list().iter().filter(|a| a.is_active()).count()
    }

    fn filtered(&self, keep: impl Fn(&AlertView) -> bool) -> Vec<AlertView> {
        let mut out: Vec<AlertView> = self.store.list().into_iter().filter(|a| keep(a)).collect();
        newest_first(&mut out, |a| a.position);
        out
    }
}

impl<S> EventSubscriber<EventEnvelope<JsonValue>> for AlertsProjection<S>
where
    S: KeyedStore<AlertId, AlertView>,
{
    fn name(&self) -> &'static str {
        "alerts"
    }

    fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
        self.apply_envelope(message)
            .map_err(|e| e.into_subscriber_error(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use stockroom_catalog::ProductId;

    use super::*;
    use crate::test_support::Harness;

    #[test]
    fn serializes_product_id_and_type() {
        let h = Harness::new();
        let lamp = h.create_product("Desk Lamp", "Lighting", 2, 5);

        let alert = h.alerts.active().pop().unwrap();
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["productId"], serde_json::json!(lamp.0.to_string()));
        assert_eq!(json["type"], "LOW_STOCK");
        assert_eq!(json["status"], "ACTIVE");
        assert!(json["variantId"].is_null());
        assert!(json.get("subject").is_none());
    }

    #[test]
    fn resolve_and_delete_are_reflected() {
        let h = Harness::new();
        let lamp = h.create_product("Desk Lamp", "Lighting", 2, 5);
        let subject = AlertSubject::Product { product_id: lamp };
        let alert = h.alerts.find_active(&subject, AlertType::LowStock).unwrap();

        h.resolve_alert(alert.id).unwrap();
        let resolved = h.alerts.get(&alert.id).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(resolved.resolved_at.is_some());
        assert!(h.alerts.find_active(&subject, AlertType::LowStock).is_none());
        assert_eq!(h.alerts.all().len(), 1);

        h.delete_alert(alert.id).unwrap();
        assert!(h.alerts.get(&alert.id).is_none());
    }

    #[test]
    fn lookups_ignore_other_products() {
        let h = Harness::new();
        h.create_product("Desk Lamp", "Lighting", 0, 5);
        let other = AlertSubject::Product { product_id: ProductId::new(AggregateId::new()) };
        assert!(h.alerts.find_active(&other, AlertType::OutOfStock).is_none());
        assert!(h.alerts.active_for(&other).is_empty());
        assert_eq!(h.alerts.by_type(AlertType::OutOfStock).len(), 1);
        assert_eq!(h.alerts.count_active(), 1);
    }
}
