//! In-memory composition: store, bus, dispatcher, projections and the alert
//! monitor, subscribed in the order reads depend on.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use stockroom_events::{EventBus, EventEnvelope, InMemoryEventBus};

use crate::alert_monitor::AlertMonitor;
use crate::command_dispatcher::CommandDispatcher;
use crate::event_store::InMemoryEventStore;
use crate::projections::replay::{ReplayError, replay_all};
use crate::projections::{
    AlertsProjection, FashionProjection, ProductsProjection, StockLedgerProjection, UsersProjection,
};

pub type InMemoryBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

pub type InMemoryDispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryBus>>;

#[derive(Clone)]
pub struct Stockroom {
    pub store: Arc<InMemoryEventStore>,
    pub bus: Arc<InMemoryBus>,
    pub dispatcher: Arc<InMemoryDispatcher>,
    pub products: Arc<ProductsProjection>,
    pub fashion: Arc<FashionProjection>,
    pub ledger: Arc<StockLedgerProjection>,
    pub alerts: Arc<AlertsProjection>,
    pub users: Arc<UsersProjection>,
}

impl Stockroom {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Arc<InMemoryBus> = Arc::new(InMemoryEventBus::new());
        let dispatcher = Arc::new(CommandDispatcher::new(store.clone(), bus.clone()));

        let products = Arc::new(ProductsProjection::in_memory());
        let fashion = Arc::new(FashionProjection::in_memory());
        let ledger = Arc::new(StockLedgerProjection::in_memory());
        let alerts = Arc::new(AlertsProjection::in_memory());
        let users = Arc::new(UsersProjection::in_memory());

        let monitor: Arc<AlertMonitor<_, _>> =
            Arc::new(AlertMonitor::new(products.clone(), fashion.clone(), alerts.clone()));
        monitor.attach(&dispatcher);

        // The monitor reads the catalog and alert views, so it goes last.
        bus.subscribe(products.clone());
        bus.subscribe(fashion.clone());
        bus.subscribe(ledger.clone());
        bus.subscribe(alerts.clone());
        bus.subscribe(users.clone());
        bus.subscribe(monitor);

        Self {
            store,
            bus,
            dispatcher,
            products,
            fashion,
            ledger,
            alerts,
            users,
        }
    }

    /// Rebuild every projection from the event log.
    pub fn rebuild_read_models(&self) -> Result<usize, ReplayError> {
        self.products.clear();
        self.fashion.clear();
        self.ledger.clear();
        self.alerts.clear();
        self.users.clear();

        let mut applied = 0;
        applied += replay_all(&self.store, self.products.as_ref())?;
        applied += replay_all(&self.store, self.fashion.as_ref())?;
        applied += replay_all(&self.store, self.ledger.as_ref())?;
        applied += replay_all(&self.store, self.alerts.as_ref())?;
        applied += replay_all(&self.store, self.users.as_ref())?;
        Ok(applied)
    }
}

impl core::fmt::Debug for Stockroom {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Stockroom")
            .field("products", &self.products.count())
            .field("fashion_products", &self.fashion.count())
            .field("transactions", &self.ledger.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use stockroom_auth::Role;

    use crate::test_support::Harness;

    #[test]
    fn read_models_rebuild_to_the_same_state() {
        let h = Harness::new();
        let lamp = h.create_product("Lamp", "Lighting", 10, 5);
        h.issue_stock(lamp, 8).unwrap();
        h.register_user("staff", "staff@example.com", Role::Staff).unwrap();

        let products = h.products.list();
        let ledger = h.ledger.all();
        let alerts = h.alerts.all();
        let users = h.users.list();
        assert_eq!(alerts.len(), 1);

        let applied = h.rebuild_read_models().unwrap();
        assert!(applied >= 4);
        assert_eq!(h.products.list(), products);
        assert_eq!(h.ledger.all(), ledger);
        assert_eq!(h.alerts.all(), alerts);
        assert_eq!(h.users.list(), users);
    }
}
