//! Payment Application Service
//!
//! Orchestrates wallet creation, payment initiation and settlement through
//! the repository and event dispatcher ports.
//! Contains NO infrastructure logic - pure business orchestration.

use payment_types::{
    DomainError, EventDispatcher, INSUFFICIENT_FUNDS, Money, OrderId, Payment, PaymentError,
    PaymentEvent, PaymentId, PaymentRepository, PaymentStatus, RepoError, UserId, Wallet, WalletId,
};

use crate::locks::WalletLocks;

/// The payment engine.
///
/// Generic over `R: PaymentRepository` and `D: EventDispatcher` - adapters
/// are injected at compile time. Every state-changing call emits exactly one
/// event; rejected calls emit none.
pub struct PaymentService<R: PaymentRepository, D: EventDispatcher> {
    repo: R,
    dispatcher: D,
    wallet_locks: WalletLocks,
}

impl<R: PaymentRepository, D: EventDispatcher> PaymentService<R, D> {
    /// Creates a new payment service with the given adapters.
    pub fn new(repo: R, dispatcher: D) -> Self {
        Self {
            repo,
            dispatcher,
            wallet_locks: WalletLocks::new(),
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns a reference to the event dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Wallet Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens a wallet for `user_id` with `initial_balance` minor units.
    ///
    /// No event is emitted for wallet creation.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn create_wallet(
        &self,
        user_id: UserId,
        initial_balance: i64,
    ) -> Result<WalletId, PaymentError> {
        let opening = Money::from_minor(initial_balance)
            .map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;

        // Serialise with settlements and other opens for the same user.
        let _guard = self.wallet_locks.acquire(user_id).await;

        match self.repo.find_wallet_by_user_id(user_id).await {
            Ok(_) => return Err(PaymentError::WalletAlreadyExists(user_id)),
            Err(RepoError::WalletNotFound(_)) => {}
            Err(e) => return Err(PaymentError::from_repo("failed to look up wallet", e)),
        }

        let wallet_id = self
            .repo
            .next_id()
            .map(WalletId::from_uuid)
            .map_err(|e| PaymentError::from_repo("failed to allocate wallet id", e))?;

        let wallet = Wallet::new(wallet_id, user_id, opening);
        self.repo.store_wallet(&wallet).await.map_err(|e| match e {
            // Opened concurrently by another process.
            RepoError::Conflict(_) => PaymentError::WalletAlreadyExists(user_id),
            other => PaymentError::from_repo("failed to store wallet", other),
        })?;

        tracing::info!(wallet_id = %wallet_id, balance = %opening, "wallet created");
        Ok(wallet_id)
    }

    /// Gets the wallet owned by `user_id`.
    pub async fn get_wallet(&self, user_id: UserId) -> Result<Wallet, PaymentError> {
        self.repo
            .find_wallet_by_user_id(user_id)
            .await
            .map_err(|e| PaymentError::from_repo("failed to load wallet", e))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Records a pending payment of `amount` minor units for an order.
    ///
    /// Funds are not checked or reserved here; sufficiency is decided at
    /// settlement.
    #[tracing::instrument(skip(self), fields(order_id = %order_id, user_id = %user_id))]
    pub async fn initiate_payment(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: i64,
    ) -> Result<PaymentId, PaymentError> {
        if amount <= 0 {
            return Err(PaymentError::InvalidAmount(
                "Amount must be positive".into(),
            ));
        }
        let amount = Money::from_minor(amount)?;

        self.repo
            .find_wallet_by_user_id(user_id)
            .await
            .map_err(|e| PaymentError::from_repo("failed to look up payer wallet", e))?;

        let payment_id = self
            .repo
            .next_id()
            .map(PaymentId::from_uuid)
            .map_err(|e| PaymentError::from_repo("failed to allocate payment id", e))?;

        let payment = Payment::new(payment_id, order_id, user_id, amount)?;
        self.repo
            .store_payment(&payment)
            .await
            .map_err(|e| PaymentError::from_repo("failed to store payment", e))?;

        tracing::info!(payment_id = %payment_id, amount = %amount, "payment initiated");
        self.emit(PaymentEvent::initiated(&payment)).await?;

        Ok(payment_id)
    }

    /// Settles a pending payment against the payer's wallet.
    ///
    /// Returns the terminal status. `Failed` means the wallet could not
    /// cover the amount; that is an outcome, not an error.
    #[tracing::instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn process_payment(&self, payment_id: PaymentId) -> Result<PaymentStatus, PaymentError> {
        let payer = self.load_payment(payment_id).await?.user_id;
        let _guard = self.wallet_locks.acquire(payer).await;

        // Reload under the lock: a concurrent settlement may have finished first.
        let mut payment = self.load_payment(payment_id).await?;
        if !payment.is_pending() {
            tracing::info!(status = %payment.status, "payment already processed");
            return Err(PaymentError::AlreadyProcessed(payment_id));
        }

        let mut wallet = self
            .repo
            .find_wallet_by_user_id(payment.user_id)
            .await
            .map_err(|e| PaymentError::from_repo("failed to load payer wallet", e))?;

        let mut available = wallet.balance;
        if wallet.has_sufficient_funds(payment.amount) {
            let mut completed = payment.clone();
            wallet.debit(payment.amount)?;
            completed.complete()?;

            match self.repo.commit_settlement(&wallet, &completed).await {
                Ok(()) => {
                    tracing::info!(balance = %wallet.balance, "payment completed");
                    self.emit(PaymentEvent::completed(&completed)).await?;
                    return Ok(PaymentStatus::Completed);
                }
                // Another process spent from the wallet after it was read.
                Err(RepoError::Domain(DomainError::InsufficientFunds { available: stored, .. })) => {
                    available = stored;
                }
                Err(e) => {
                    return Err(settlement_error(payment_id, "failed to commit settlement", e));
                }
            }
        }

        payment.fail(INSUFFICIENT_FUNDS)?;
        self.repo
            .settle_payment(&payment)
            .await
            .map_err(|e| settlement_error(payment_id, "failed to store failed payment", e))?;

        tracing::info!(
            balance = %available,
            amount = %payment.amount,
            "payment failed: insufficient funds"
        );
        self.emit(PaymentEvent::failed(&payment, INSUFFICIENT_FUNDS))
            .await?;
        Ok(PaymentStatus::Failed)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Payment History
    // ─────────────────────────────────────────────────────────────────────────────

    /// Gets a payment by ID.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, PaymentError> {
        self.load_payment(id).await
    }

    /// Lists payments recorded for an order, newest first.
    pub async fn list_payments_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, PaymentError> {
        self.repo
            .find_payments_by_order_id(order_id)
            .await
            .map_err(|e| PaymentError::from_repo("failed to list payments", e))
    }

    async fn load_payment(&self, id: PaymentId) -> Result<Payment, PaymentError> {
        self.repo
            .find_payment(id)
            .await
            .map_err(|e| PaymentError::from_repo("failed to load payment", e))
    }

    async fn emit(&self, event: PaymentEvent) -> Result<(), PaymentError> {
        self.dispatcher.dispatch(&event).await.map_err(|source| {
            tracing::error!(
                payment_id = %event.payment_id(),
                "failed to dispatch {}: {}",
                event.event_type(),
                source
            );
            PaymentError::Dispatch {
                event_type: event.event_type(),
                source,
            }
        })
    }
}

/// Maps store failures on the settlement writes into engine errors.
fn settlement_error(payment_id: PaymentId, context: &'static str, err: RepoError) -> PaymentError {
    match err {
        RepoError::Conflict(_) => PaymentError::AlreadyProcessed(payment_id),
        RepoError::CompensationFailed(reason) => PaymentError::SettlementIncomplete {
            payment_id,
            reason,
        },
        other => PaymentError::from_repo(context, other),
    }
}
