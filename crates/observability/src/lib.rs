//! Process-wide logging setup shared by the binary and the test suites.

pub mod subscriber;

pub use subscriber::{DEFAULT_FILTER, init, init_for_tests, init_with_default};
