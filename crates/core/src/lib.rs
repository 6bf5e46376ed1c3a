//! `stockroom-core`: domain building blocks shared by every stockroom crate.
//!
//! Nothing in here touches IO: aggregates, identifiers and the domain error type.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId};
