//! Error types for the payment service.

use crate::domain::{Money, PaymentId, PaymentStatus, UserId};

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Amount cannot be negative")]
    NegativeAmount,

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("Wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A settlement write failed and undoing the wallet debit failed too.
    #[error("Compensation failed: {0}")]
    CompensationFailed(String),
}

/// Event sink failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Event sink error: {0}")]
    Sink(String),

    #[error("Event serialization error: {0}")]
    Serialization(String),
}

/// Errors returned by the payment engine.
///
/// Insufficient funds is deliberately absent: it is a normal settlement
/// outcome, not an error.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Wallet not found for user {0}")]
    WalletNotFound(UserId),

    #[error("Wallet already exists for user {0}")]
    WalletAlreadyExists(UserId),

    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    #[error("Payment {0} has already been processed")]
    AlreadyProcessed(PaymentId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: RepoError,
    },

    #[error("failed to dispatch {event_type}: {source}")]
    Dispatch {
        event_type: &'static str,
        #[source]
        source: DispatchError,
    },

    #[error("Settlement of payment {payment_id} left inconsistent state: {reason}")]
    SettlementIncomplete { payment_id: PaymentId, reason: String },
}

impl PaymentError {
    /// Lifts a repository error into the engine taxonomy, keeping not-found
    /// cases structured and wrapping everything else with `context`.
    pub fn from_repo(context: &'static str, err: RepoError) -> Self {
        match err {
            RepoError::PaymentNotFound(id) => PaymentError::PaymentNotFound(id),
            RepoError::WalletNotFound(user_id) => PaymentError::WalletNotFound(user_id),
            RepoError::Domain(e) => PaymentError::Domain(e),
            other => PaymentError::Store {
                context,
                source: other,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PaymentError::PaymentNotFound(_) | PaymentError::WalletNotFound(_)
        )
    }
}
