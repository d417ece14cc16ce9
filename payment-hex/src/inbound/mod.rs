//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the payment engine.

pub(crate) mod handlers;
mod server;

pub use handlers::ApiError;
pub use server::HttpServer;
