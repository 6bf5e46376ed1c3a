//! Raises and resolves stock alerts as catalog stock levels change.
//!
//! The monitor watches catalog envelopes and remembers which product or
//! variants a command touched. On the last envelope of the command's batch it
//! reads the settled levels from the catalog projections and dispatches
//! `RaiseAlert` / `ResolveAlert` commands. Evaluating per batch keeps a
//! freshly created product (registered at zero, then stocked) from raising a
//! spurious out-of-stock alert.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use chrono::Utc;
use serde_json::Value as JsonValue;

use stockroom_alerts::{
    ALERT_AGGREGATE_TYPE, Alert, AlertCommand, AlertId, AlertSubject, AlertType, RaiseAlert, ResolveAlert,
    StockAlertDecision, alert_message, evaluate,
};
use stockroom_catalog::{
    FASHION_PRODUCT_AGGREGATE_TYPE, FashionEvent, FashionProductId, PRODUCT_AGGREGATE_TYPE, ProductEvent, ProductId,
    VariantId,
};
use stockroom_core::AggregateId;
use stockroom_events::{EventBus, EventEnvelope, EventSubscriber, SubscriberError};

use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::event_store::EventStore;
use crate::projections::{AlertsProjection, FashionProjection, ProductsProjection};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Touched {
    Product,
    Variants(BTreeSet<VariantId>),
}

/// One level check: who, under what name, at what level.
#[derive(Debug, Clone)]
struct Reading {
    subject: AlertSubject,
    product_name: String,
    quantity: i64,
    min_stock_level: i64,
}

pub struct AlertMonitor<S, B> {
    products: Arc<ProductsProjection>,
    fashion: Arc<FashionProjection>,
    alerts: Arc<AlertsProjection>,
    dispatcher: OnceLock<Weak<CommandDispatcher<S, B>>>,
    pending: Mutex<HashMap<AggregateId, Touched>>,
}

impl<S, B> AlertMonitor<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(
        products: Arc<ProductsProjection>,
        fashion: Arc<FashionProjection>,
        alerts: Arc<AlertsProjection>,
    ) -> Self {
        Self {
            products,
            fashion,
            alerts,
            dispatcher: OnceLock::new(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the dispatcher used for alert commands. Later calls are ignored.
    pub fn attach(&self, dispatcher: &Arc<CommandDispatcher<S, B>>) {
        let _ = self.dispatcher.set(Arc::downgrade(dispatcher));
    }

    fn on_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), String> {
        let aggregate_type = envelope.aggregate_type();
        let aggregate_id = envelope.aggregate_id();

        if aggregate_type == PRODUCT_AGGREGATE_TYPE {
            let ev: ProductEvent = serde_json::from_value(envelope.payload().clone()).map_err(|e| e.to_string())?;
            match ev {
                ProductEvent::Created(_) | ProductEvent::Updated(_) | ProductEvent::StockMoved(_) => {
                    self.touch(aggregate_id, None);
                }
                ProductEvent::Deleted(_) => self.forget(aggregate_id),
            }
        } else if aggregate_type == FASHION_PRODUCT_AGGREGATE_TYPE {
            let ev: FashionEvent = serde_json::from_value(envelope.payload().clone()).map_err(|e| e.to_string())?;
            match ev {
                FashionEvent::VariantAdded(e) => self.touch(aggregate_id, Some(e.variant_id)),
                FashionEvent::VariantStockMoved(e) => self.touch(aggregate_id, Some(e.variant_id)),
                FashionEvent::Deleted(_) => self.forget(aggregate_id),
                FashionEvent::Created(_) | FashionEvent::Updated(_) => {}
            }
        } else {
            return Ok(());
        }

        let Some(dispatcher) = self.dispatcher.get().and_then(Weak::upgrade) else {
            return Ok(());
        };

        let last_in_batch = dispatcher
            .store()
            .stream_version(aggregate_id)
            .map_err(|e| e.to_string())?;
        if envelope.sequence_number() < last_in_batch {
            return Ok(());
        }

        let touched = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&aggregate_id);

        let readings: Vec<Reading> = match touched {
            None => return Ok(()),
            Some(Touched::Product) => self.product_reading(ProductId::new(aggregate_id)).into_iter().collect(),
            Some(Touched::Variants(ids)) => {
                let product_id = FashionProductId::new(aggregate_id);
                ids.into_iter()
                    .filter_map(|vid| self.variant_reading(product_id, vid))
                    .collect()
            }
        };

        let mut failure = None;
        for reading in readings {
            if let Err(e) = self.check(&dispatcher, reading) {
                failure.get_or_insert(e.to_string());
            }
        }
        match failure {
            Some(msg) => Err(msg),
            None => Ok(()),
        }
    }

    fn touch(&self, aggregate_id: AggregateId, variant: Option<VariantId>) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match variant {
            None => {
                pending.insert(aggregate_id, Touched::Product);
            }
            Some(vid) => {
                let entry = pending
                    .entry(aggregate_id)
                    .or_insert_with(|| Touched::Variants(BTreeSet::new()));
                if let Touched::Variants(ids) = entry {
                    ids.insert(vid);
                }
            }
        }
    }

    fn forget(&self, aggregate_id: AggregateId) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&aggregate_id);
    }

    fn product_reading(&self, product_id: ProductId) -> Option<Reading> {
        let view = self.products.get(&product_id)?;
        Some(Reading {
            subject: AlertSubject::Product { product_id },
            product_name: view.name,
            quantity: view.quantity,
            min_stock_level: view.min_stock_level,
        })
    }

    fn variant_reading(&self, product_id: FashionProductId, variant_id: VariantId) -> Option<Reading> {
        let product = self.fashion.get(&product_id)?;
        let variant = product.variant(variant_id)?;
        Some(Reading {
            subject: AlertSubject::Variant {
                product_id,
                variant_id,
                size: variant.size,
                color: variant.color,
            },
            product_name: product.name.clone(),
            quantity: variant.quantity,
            min_stock_level: variant.min_stock_level,
        })
    }

    fn check(&self, dispatcher: &CommandDispatcher<S, B>, reading: Reading) -> Result<(), DispatchError> {
        match evaluate(reading.quantity, reading.min_stock_level) {
            StockAlertDecision::Raise(alert_type) => self.raise(dispatcher, &reading, alert_type),
            StockAlertDecision::Clear => {
                for alert in self.alerts.active_for(&reading.subject) {
                    dispatch_alert(
                        dispatcher,
                        alert.id,
                        AlertCommand::Resolve(ResolveAlert {
                            alert_id: alert.id,
                            occurred_at: Utc::now(),
                        }),
                    )?;
                }
                Ok(())
            }
        }
    }

    fn raise(
        &self,
        dispatcher: &CommandDispatcher<S, B>,
        reading: &Reading,
        alert_type: AlertType,
    ) -> Result<(), DispatchError> {
        if self.alerts.find_active(&reading.subject, alert_type).is_some() {
            return Ok(());
        }
        let alert_id = AlertId::new(AggregateId::new());
        let message = alert_message(
            alert_type,
            &reading.product_name,
            &reading.subject,
            reading.quantity,
            reading.min_stock_level,
        );
        dispatch_alert(
            dispatcher,
            alert_id,
            AlertCommand::Raise(RaiseAlert {
                alert_id,
                subject: reading.subject,
                product_name: reading.product_name.clone(),
                alert_type,
                message,
                occurred_at: Utc::now(),
            }),
        )
    }
}

fn dispatch_alert<S, B>(
    dispatcher: &CommandDispatcher<S, B>,
    alert_id: AlertId,
    command: AlertCommand,
) -> Result<(), DispatchError>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    dispatcher
        .dispatch::<Alert>(alert_id.0, ALERT_AGGREGATE_TYPE, command, |id| Alert::empty(AlertId::new(id)))
        .map(|_| ())
}

impl<S, B> EventSubscriber<EventEnvelope<JsonValue>> for AlertMonitor<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn name(&self) -> &'static str {
        "alert_monitor"
    }

    /// Alert failures never fail the catalog command that triggered them.
    fn handle(&self, message: &EventEnvelope<JsonValue>) -> Result<(), SubscriberError> {
        if let Err(error) = self.on_envelope(message) {
            tracing::warn!(
                aggregate_id = %message.aggregate_id(),
                sequence_number = message.sequence_number(),
                error = %error,
                "alert evaluation failed"
            );
        }
        Ok(())
    }
}
