//! Payment domain model and its one-way status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{OrderId, PaymentId, UserId};
use super::money::Money;
use crate::error::DomainError;

/// Failure reason recorded when the payer's wallet cannot cover the amount.
pub const INSUFFICIENT_FUNDS: &str = "insufficient funds";

/// Status of a payment.
///
/// `Pending` is the only non-terminal state. The integer codes are the
/// persisted representation and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    /// Returns the persisted integer code (`0=Pending, 1=Completed, 2=Failed`).
    pub fn code(self) -> i16 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::Completed => 1,
            PaymentStatus::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl TryFrom<i16> for PaymentStatus {
    type Error = DomainError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PaymentStatus::Pending),
            1 => Ok(PaymentStatus::Completed),
            2 => Ok(PaymentStatus::Failed),
            other => Err(DomainError::Validation(format!(
                "unknown payment status code {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Completed => write!(f, "COMPLETED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// A single money-movement intent tied to an order and a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Order being paid for
    pub order_id: OrderId,
    /// Payer; their wallet is debited on settlement
    pub user_id: UserId,
    /// Strictly positive amount
    pub amount: Money,
    pub status: PaymentStatus,
    /// Set only when the payment failed
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new pending payment.
    ///
    /// # Validation
    /// - Amount must be greater than zero
    pub fn new(
        id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
    ) -> Result<Self, DomainError> {
        if amount.is_zero() {
            return Err(DomainError::NonPositiveAmount);
        }

        let now = Utc::now();
        Ok(Self {
            id,
            order_id,
            user_id,
            amount,
            status: PaymentStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstructs a payment from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        status: PaymentStatus,
        failure_reason: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            order_id,
            user_id,
            amount,
            status,
            failure_reason,
            created_at,
            updated_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Marks the payment as settled.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Completed)
    }

    /// Marks the payment as failed with the given reason.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), DomainError> {
        self.transition(PaymentStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn transition(&mut self, to: PaymentStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(minor: i64) -> Payment {
        Payment::new(
            PaymentId::new(),
            OrderId::new(),
            UserId::new(),
            Money::from_minor(minor).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_payment_is_pending() {
        let payment = pending(9999);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.failure_reason.is_none());
        assert_eq!(payment.created_at, payment.updated_at);
    }

    #[test]
    fn test_zero_amount_fails() {
        let result = Payment::new(PaymentId::new(), OrderId::new(), UserId::new(), Money::ZERO);
        assert!(matches!(result, Err(DomainError::NonPositiveAmount)));
    }

    #[test]
    fn test_complete_from_pending() {
        let mut payment = pending(100);
        payment.complete().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_fail_records_reason() {
        let mut payment = pending(100);
        payment.fail(INSUFFICIENT_FUNDS).unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason.as_deref(), Some("insufficient funds"));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut completed = pending(100);
        completed.complete().unwrap();
        assert!(matches!(
            completed.fail("late"),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert!(completed.complete().is_err());
        assert!(completed.failure_reason.is_none());

        let mut failed = pending(100);
        failed.fail(INSUFFICIENT_FUNDS).unwrap();
        assert!(failed.complete().is_err());
        assert_eq!(failed.status, PaymentStatus::Failed);
    }

    #[test]
    fn test_status_codes_are_stable() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::try_from(status.code()).unwrap(), status);
        }
        assert_eq!(PaymentStatus::Completed.code(), 1);
        assert!(PaymentStatus::try_from(7).is_err());
    }
}
