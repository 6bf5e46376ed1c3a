//! Stock alerts: the `Alert` aggregate and the policy deciding when one is due.

pub mod alert;
pub mod policy;

pub use alert::{
    ALERT_AGGREGATE_TYPE, Alert, AlertCommand, AlertDeleted, AlertEvent, AlertId, AlertRaised, AlertResolved,
    AlertStatus, AlertSubject, AlertType, DeleteAlert, RaiseAlert, ResolveAlert,
};
pub use policy::{StockAlertDecision, alert_message, evaluate};
