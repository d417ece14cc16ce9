//! # Payment Hex
//!
//! Payment engine and HTTP adapter for the settlement service.
//!
//! ## Architecture
//!
//! - `service` - Payment engine (orchestrates wallets, payments and events)
//! - `locks` - Per-wallet mutual exclusion used by settlement
//! - `inbound/` - HTTP adapter (Axum server)
//! - `openapi` - OpenAPI document served next to the API
//!
//! The engine is generic over `R: PaymentRepository` and
//! `D: EventDispatcher`, so any store and event sink can be injected.

pub mod inbound;
pub mod locks;
pub mod openapi;
pub mod service;


pub use locks::WalletLocks;
pub use service::PaymentService;
