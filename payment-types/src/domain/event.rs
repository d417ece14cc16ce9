//! Domain events emitted by the payment engine.

use serde::{Deserialize, Serialize};

use super::ids::{OrderId, PaymentId, UserId};
use super::money::Money;
use super::payment::Payment;

/// Closed set of payment lifecycle events.
///
/// Serialized with an internal `type` tag whose value is the stable event
/// name consumed downstream (`"PaymentInitiated"`, `"PaymentCompleted"`,
/// `"PaymentFailed"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    #[serde(rename = "PaymentInitiated")]
    Initiated {
        payment_id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
    },
    #[serde(rename = "PaymentCompleted")]
    Completed {
        payment_id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
    },
    #[serde(rename = "PaymentFailed")]
    Failed {
        payment_id: PaymentId,
        order_id: OrderId,
        user_id: UserId,
        failure_reason: String,
    },
}

impl PaymentEvent {
    pub const INITIATED: &'static str = "PaymentInitiated";
    pub const COMPLETED: &'static str = "PaymentCompleted";
    pub const FAILED: &'static str = "PaymentFailed";

    pub fn initiated(payment: &Payment) -> Self {
        PaymentEvent::Initiated {
            payment_id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount: payment.amount,
        }
    }

    pub fn completed(payment: &Payment) -> Self {
        PaymentEvent::Completed {
            payment_id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
        }
    }

    pub fn failed(payment: &Payment, reason: impl Into<String>) -> Self {
        PaymentEvent::Failed {
            payment_id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
            failure_reason: reason.into(),
        }
    }

    /// Stable type tag used by consumers for routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::Initiated { .. } => Self::INITIATED,
            PaymentEvent::Completed { .. } => Self::COMPLETED,
            PaymentEvent::Failed { .. } => Self::FAILED,
        }
    }

    pub fn payment_id(&self) -> PaymentId {
        match self {
            PaymentEvent::Initiated { payment_id, .. }
            | PaymentEvent::Completed { payment_id, .. }
            | PaymentEvent::Failed { payment_id, .. } => *payment_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::INSUFFICIENT_FUNDS;

    fn payment() -> Payment {
        Payment::new(
            PaymentId::new(),
            OrderId::new(),
            UserId::new(),
            Money::from_minor(9999).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_type_tags_are_stable() {
        let payment = payment();
        assert_eq!(
            PaymentEvent::initiated(&payment).event_type(),
            "PaymentInitiated"
        );
        assert_eq!(
            PaymentEvent::completed(&payment).event_type(),
            "PaymentCompleted"
        );
        assert_eq!(
            PaymentEvent::failed(&payment, INSUFFICIENT_FUNDS).event_type(),
            "PaymentFailed"
        );
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let payment = payment();
        let event = PaymentEvent::failed(&payment, INSUFFICIENT_FUNDS);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["failure_reason"], "insufficient funds");
        assert_eq!(json["payment_id"], payment.id.to_string());
    }

    #[test]
    fn test_initiated_carries_amount() {
        let payment = payment();
        let json = serde_json::to_value(PaymentEvent::initiated(&payment)).unwrap();
        assert_eq!(json["amount"], 9999);

        let back: PaymentEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.payment_id(), payment.id);
    }
}
