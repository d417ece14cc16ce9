//! # Payment Types
//!
//! Domain types and port traits for the payment settlement service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Wallet, Payment, PaymentEvent)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain, repository, dispatch and engine error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    INSUFFICIENT_FUNDS, Money, OrderId, OutboxEvent, OutboxStatus, Payment, PaymentEvent,
    PaymentId, PaymentStatus, UserId, Wallet, WalletId,
};
pub use dto::*;
pub use error::{DispatchError, DomainError, PaymentError, RepoError};
pub use ports::{EventDispatcher, PaymentRepository};
