//! Domain models for the payment service.

pub mod event;
pub mod ids;
pub mod money;
pub mod outbox;
pub mod payment;
pub mod wallet;

pub use event::PaymentEvent;
pub use ids::{OrderId, PaymentId, UserId, WalletId};
pub use money::Money;
pub use outbox::{OutboxEvent, OutboxStatus};
pub use payment::{INSUFFICIENT_FUNDS, Payment, PaymentStatus};
pub use wallet::Wallet;
