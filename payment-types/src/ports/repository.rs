//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, InMemory) implement this trait.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{OrderId, Payment, PaymentId, UserId, Wallet};
use crate::error::RepoError;

/// Persistence for wallets and payments.
///
/// Stores hold no business logic; the payment engine is the only writer.
#[async_trait::async_trait]
pub trait PaymentRepository: Send + Sync + 'static {
    /// Generates a fresh, time-ordered identifier.
    fn next_id(&self) -> Result<Uuid, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts or updates a payment by id.
    async fn store_payment(&self, payment: &Payment) -> Result<(), RepoError>;

    /// Fails with `RepoError::PaymentNotFound` if absent.
    async fn find_payment(&self, id: PaymentId) -> Result<Payment, RepoError>;

    /// Lists payments for an order, newest first.
    async fn find_payments_by_order_id(&self, order_id: OrderId)
    -> Result<Vec<Payment>, RepoError>;

    /// Writes a terminal payment only while the stored one is still pending.
    ///
    /// Fails with `RepoError::Conflict` if the payment was already settled.
    async fn settle_payment(&self, payment: &Payment) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Wallets
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts or updates a wallet by id.
    async fn store_wallet(&self, wallet: &Wallet) -> Result<(), RepoError>;

    /// Fails with `RepoError::WalletNotFound` if absent.
    async fn find_wallet_by_user_id(&self, user_id: UserId) -> Result<Wallet, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Settlement (MUST NOT lose a debit)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persists a debited wallet together with its completed payment.
    ///
    /// Adapters shared between processes must reject a payment that is no
    /// longer pending (`RepoError::Conflict`) and debit `payment.amount`
    /// against the balance they hold rather than writing `wallet.balance`,
    /// failing with `DomainError::InsufficientFunds` when it no longer
    /// covers the amount.
    ///
    /// The default is [`commit_with_compensation`]: it relies on the caller
    /// serialising settlements per wallet.
    async fn commit_settlement(&self, wallet: &Wallet, payment: &Payment) -> Result<(), RepoError> {
        commit_with_compensation(self, wallet, payment).await
    }
}

/// Writes the wallet, then the payment. If the payment write fails the
/// debit is credited back before the error is returned.
pub async fn commit_with_compensation<R: PaymentRepository + ?Sized>(
    repo: &R,
    wallet: &Wallet,
    payment: &Payment,
) -> Result<(), RepoError> {
    repo.store_wallet(wallet).await?;

    let Err(payment_err) = repo.store_payment(payment).await else {
        return Ok(());
    };

    let mut restored = wallet.clone();
    restored.credit(payment.amount)?;

    match repo.store_wallet(&restored).await {
        Ok(()) => {
            tracing::warn!(
                payment_id = %payment.id,
                wallet_id = %wallet.id,
                "payment write failed after debit, credited {} back",
                payment.amount
            );
            Err(payment_err)
        }
        Err(credit_err) => {
            tracing::error!(
                payment_id = %payment.id,
                wallet_id = %wallet.id,
                "credit-back failed after payment write failure: {}; {}",
                payment_err,
                credit_err
            );
            Err(RepoError::CompensationFailed(format!(
                "payment write failed ({}) and credit-back of {} to wallet {} failed ({})",
                payment_err, payment.amount, wallet.id, credit_err
            )))
        }
    }
}

#[async_trait::async_trait]
impl<T: PaymentRepository + ?Sized> PaymentRepository for Arc<T> {
    fn next_id(&self) -> Result<Uuid, RepoError> {
        (**self).next_id()
    }

    async fn store_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        (**self).store_payment(payment).await
    }

    async fn find_payment(&self, id: PaymentId) -> Result<Payment, RepoError> {
        (**self).find_payment(id).await
    }

    async fn find_payments_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, RepoError> {
        (**self).find_payments_by_order_id(order_id).await
    }

    async fn settle_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        (**self).settle_payment(payment).await
    }

    async fn store_wallet(&self, wallet: &Wallet) -> Result<(), RepoError> {
        (**self).store_wallet(wallet).await
    }

    async fn find_wallet_by_user_id(&self, user_id: UserId) -> Result<Wallet, RepoError> {
        (**self).find_wallet_by_user_id(user_id).await
    }

    async fn commit_settlement(&self, wallet: &Wallet, payment: &Payment) -> Result<(), RepoError> {
        (**self).commit_settlement(wallet, payment).await
    }
}
