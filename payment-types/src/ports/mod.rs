//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The payment engine depends on these traits, not concrete implementations.

mod dispatcher;
mod repository;

pub use dispatcher::EventDispatcher;
pub use repository::{PaymentRepository, commit_with_compensation};
