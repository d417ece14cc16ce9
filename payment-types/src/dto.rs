//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Amounts cross the API boundary as integers in minor units (cents).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{OrderId, Payment, PaymentId, PaymentStatus, UserId, Wallet, WalletId};

// ─────────────────────────────────────────────────────────────────────────────
// Wallet DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to open a wallet for a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    /// Owning user
    pub user_id: UserId,
    /// Opening balance in minor units (cents); must not be negative
    #[schema(example = 20000)]
    pub initial_balance: i64,
}

/// Wallet as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub id: WalletId,
    pub user_id: UserId,
    /// Current balance in minor units
    #[schema(example = 10001)]
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id,
            user_id: wallet.user_id,
            balance: wallet.balance.minor_units(),
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to initiate a payment for an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub order_id: OrderId,
    /// Payer; must already have a wallet
    pub user_id: UserId,
    /// Amount in minor units; must be positive
    #[schema(example = 9999)]
    pub amount: i64,
}

/// Payment as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    /// Amount in minor units
    #[schema(example = 9999)]
    pub amount: i64,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "insufficient funds")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount: payment.amount.minor_units(),
            status: payment.status,
            failure_reason: payment.failure_reason,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

/// Outcome of settling a payment.
///
/// `FAILED` is a successful call: the payer lacked funds.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProcessPaymentResponse {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
}
