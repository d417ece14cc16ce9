//! In-memory repository adapter.
//!
//! Keeps everything in process memory. Used for `memory://` deployments,
//! demos and engine tests that want a real adapter without a database.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use payment_types::{
    DispatchError, EventDispatcher, OrderId, OutboxEvent, OutboxStatus, Payment, PaymentEvent,
    PaymentId, PaymentRepository, RepoError, UserId, Wallet,
};

/// Finished outbox events kept for inspection; older ones are dropped.
pub const OUTBOX_HISTORY_LIMIT: usize = 1024;

/// In-memory store and outbox.
///
/// Wallets are indexed by owner, mirroring the `UNIQUE (user_id)`
/// constraint of the SQL schemas.
#[derive(Default)]
pub struct InMemoryRepo {
    payments: DashMap<PaymentId, Payment>,
    wallets: DashMap<UserId, Wallet>,
    outbox: Mutex<Outbox>,
}

/// Pending events in dispatch order, plus a bounded tail of finished ones.
#[derive(Default)]
struct Outbox {
    pending: VecDeque<OutboxEvent>,
    finished: VecDeque<OutboxEvent>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest undelivered events first.
    pub async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, RepoError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let outbox = self.outbox.lock().await;

        Ok(outbox.pending.iter().take(limit).cloned().collect())
    }

    /// Records a delivery outcome and moves the event out of the pending queue.
    pub async fn mark_event(
        &self,
        id: Uuid,
        status: OutboxStatus,
        last_error: Option<String>,
    ) -> Result<(), RepoError> {
        let mut outbox = self.outbox.lock().await;
        let Some(index) = outbox.pending.iter().position(|e| e.id == id) else {
            return Ok(());
        };
        let Some(mut event) = outbox.pending.remove(index) else {
            return Ok(());
        };

        event.status = status;
        event.processed_at = Some(Utc::now());
        event.last_error = last_error;
        event.attempts += 1;

        if event.status == OutboxStatus::Pending {
            outbox.pending.insert(index, event);
            return Ok(());
        }

        outbox.finished.push_back(event);
        while outbox.finished.len() > OUTBOX_HISTORY_LIMIT {
            outbox.finished.pop_front();
        }
        Ok(())
    }

    /// Retained finished events, then the pending ones.
    pub async fn events(&self) -> Vec<OutboxEvent> {
        let outbox = self.outbox.lock().await;
        outbox
            .finished
            .iter()
            .chain(outbox.pending.iter())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepo {
    fn next_id(&self) -> Result<Uuid, RepoError> {
        Ok(Uuid::now_v7())
    }

    async fn store_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_payment(&self, id: PaymentId) -> Result<Payment, RepoError> {
        self.payments
            .get(&id)
            .map(|p| p.value().clone())
            .ok_or(RepoError::PaymentNotFound(id))
    }

    async fn find_payments_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, RepoError> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .map(|p| p.value().clone())
            .collect();

        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(payments)
    }

    async fn settle_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        let mut stored = self
            .payments
            .get_mut(&payment.id)
            .ok_or(RepoError::PaymentNotFound(payment.id))?;

        if !stored.is_pending() {
            return Err(RepoError::Conflict(format!(
                "payment {} is no longer pending",
                payment.id
            )));
        }
        *stored = payment.clone();
        Ok(())
    }

    async fn store_wallet(&self, wallet: &Wallet) -> Result<(), RepoError> {
        match self.wallets.entry(wallet.user_id) {
            dashmap::mapref::entry::Entry::Occupied(mut existing) => {
                if existing.get().id != wallet.id {
                    return Err(RepoError::Conflict(format!(
                        "user {} already has a wallet",
                        wallet.user_id
                    )));
                }
                existing.insert(wallet.clone());
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(wallet.clone());
            }
        }
        Ok(())
    }

    async fn find_wallet_by_user_id(&self, user_id: UserId) -> Result<Wallet, RepoError> {
        self.wallets
            .get(&user_id)
            .map(|w| w.value().clone())
            .ok_or(RepoError::WalletNotFound(user_id))
    }
}

#[async_trait]
impl EventDispatcher for InMemoryRepo {
    async fn dispatch(&self, event: &PaymentEvent) -> Result<(), DispatchError> {
        let record = OutboxEvent::from_event(event)?;
        self.outbox.lock().await.pending.push_back(record);
        Ok(())
    }
}
