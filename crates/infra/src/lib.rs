//! Infrastructure layer: event store, command dispatch, read models and the
//! services built on them (alert monitor, OTP store, CSV export).

pub mod alert_monitor;
pub mod command_dispatcher;
pub mod event_store;
pub mod export;
pub mod otp_store;
pub mod projections;
pub mod read_model;
pub mod wiring;

#[cfg(test)]
mod test_support;

pub use alert_monitor::AlertMonitor;
pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use otp_store::{LoggingNotifier, OtpNotifier, OtpStore};
pub use wiring::{InMemoryBus, InMemoryDispatcher, Stockroom};
