//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use payment_types::{
        DomainError, EventDispatcher, Money, OrderId, OutboxStatus, Payment, PaymentEvent, PaymentId,
        PaymentRepository, PaymentStatus, RepoError, UserId, Wallet, WalletId,
    };

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:").await.unwrap()
    }

    fn money(minor: i64) -> Money {
        Money::from_minor(minor).unwrap()
    }

    async fn seed_wallet(repo: &SqliteRepo, balance: i64) -> Wallet {
        let wallet = Wallet::new(WalletId::new(), UserId::new(), money(balance));
        repo.store_wallet(&wallet).await.unwrap();
        wallet
    }

    async fn seed_payment(repo: &SqliteRepo, user_id: UserId, amount: i64) -> Payment {
        let payment = Payment::new(PaymentId::new(), OrderId::new(), user_id, money(amount)).unwrap();
        repo.store_payment(&payment).await.unwrap();
        payment
    }

    #[tokio::test]
    async fn test_next_id_is_time_ordered() {
        let repo = setup_repo().await;

        let a = repo.next_id().unwrap();
        let b = repo.next_id().unwrap();

        assert_eq!(a.get_version_num(), 7);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_wallet_round_trip() {
        let repo = setup_repo().await;
        let wallet = seed_wallet(&repo, 20000).await;

        let fetched = repo.find_wallet_by_user_id(wallet.user_id).await.unwrap();

        assert_eq!(fetched.id, wallet.id);
        assert_eq!(fetched.balance, money(20000));
        assert_eq!(
            fetched.created_at.timestamp_micros(),
            wallet.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_wallet_upsert_updates_balance() {
        let repo = setup_repo().await;
        let mut wallet = seed_wallet(&repo, 20000).await;

        wallet.debit(money(9999)).unwrap();
        repo.store_wallet(&wallet).await.unwrap();

        let fetched = repo.find_wallet_by_user_id(wallet.user_id).await.unwrap();
        assert_eq!(fetched.balance, money(10001));
    }

    #[tokio::test]
    async fn test_second_wallet_for_user_conflicts() {
        let repo = setup_repo().await;
        let wallet = seed_wallet(&repo, 100).await;

        let duplicate = Wallet::new(WalletId::new(), wallet.user_id, money(500));
        let result = repo.store_wallet(&duplicate).await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_wallet_not_found() {
        let repo = setup_repo().await;
        let user = UserId::new();

        let result = repo.find_wallet_by_user_id(user).await;

        assert!(matches!(result, Err(RepoError::WalletNotFound(id)) if id == user));
    }

    #[tokio::test]
    async fn test_payment_round_trip_and_status_update() {
        let repo = setup_repo().await;
        let mut payment = seed_payment(&repo, UserId::new(), 9999).await;

        let fetched = repo.find_payment(payment.id).await.unwrap();
        assert_eq!(fetched.status, PaymentStatus::Pending);
        assert_eq!(fetched.amount, money(9999));
        assert_eq!(fetched.failure_reason, None);

        payment.fail("insufficient funds").unwrap();
        repo.store_payment(&payment).await.unwrap();

        let fetched = repo.find_payment(payment.id).await.unwrap();
        assert_eq!(fetched.status, PaymentStatus::Failed);
        assert_eq!(fetched.failure_reason.as_deref(), Some("insufficient funds"));
    }

    #[tokio::test]
    async fn test_payment_not_found() {
        let repo = setup_repo().await;
        let id = PaymentId::new();

        let result = repo.find_payment(id).await;

        assert!(matches!(result, Err(RepoError::PaymentNotFound(p)) if p == id));
    }

    #[tokio::test]
    async fn test_payments_by_order_newest_first() {
        let repo = setup_repo().await;
        let (order, user) = (OrderId::new(), UserId::new());

        let first = Payment::new(PaymentId::new(), order, user, money(100)).unwrap();
        let mut second = Payment::new(PaymentId::new(), order, user, money(200)).unwrap();
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        repo.store_payment(&first).await.unwrap();
        repo.store_payment(&second).await.unwrap();
        seed_payment(&repo, user, 300).await;

        let ids: Vec<_> = repo
            .find_payments_by_order_id(order)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_commit_settlement_writes_both_records() {
        let repo = setup_repo().await;
        let mut wallet = seed_wallet(&repo, 20000).await;
        let mut payment = seed_payment(&repo, wallet.user_id, 9999).await;

        wallet.debit(payment.amount).unwrap();
        payment.complete().unwrap();
        repo.commit_settlement(&wallet, &payment).await.unwrap();

        let stored_wallet = repo.find_wallet_by_user_id(wallet.user_id).await.unwrap();
        let stored_payment = repo.find_payment(payment.id).await.unwrap();
        assert_eq!(stored_wallet.balance, money(10001));
        assert_eq!(stored_payment.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn test_commit_settlement_rejects_settled_payment_and_rolls_back() {
        let repo = setup_repo().await;
        let wallet = seed_wallet(&repo, 20000).await;
        let mut payment = seed_payment(&repo, wallet.user_id, 9999).await;

        let mut debited = wallet.clone();
        debited.debit(payment.amount).unwrap();
        payment.complete().unwrap();
        repo.commit_settlement(&debited, &payment).await.unwrap();

        // A second settlement computed from the stale pre-debit wallet.
        let mut stale = wallet.clone();
        stale.debit(payment.amount).unwrap();
        let result = repo.commit_settlement(&stale, &payment).await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
        let stored = repo.find_wallet_by_user_id(wallet.user_id).await.unwrap();
        assert_eq!(stored.balance, money(10001));
    }

    #[tokio::test]
    async fn test_commit_settlement_for_unknown_payment_rolls_back() {
        let repo = setup_repo().await;
        let mut wallet = seed_wallet(&repo, 20000).await;
        let mut payment =
            Payment::new(PaymentId::new(), OrderId::new(), wallet.user_id, money(9999)).unwrap();

        wallet.debit(payment.amount).unwrap();
        payment.complete().unwrap();
        let result = repo.commit_settlement(&wallet, &payment).await;

        assert!(result.is_err());
        let stored = repo.find_wallet_by_user_id(wallet.user_id).await.unwrap();
        assert_eq!(stored.balance, money(20000));
    }

    #[tokio::test]
    async fn test_commit_settlement_debits_the_stored_balance() {
        let repo = setup_repo().await;
        let wallet = seed_wallet(&repo, 10000).await;
        let mut first = seed_payment(&repo, wallet.user_id, 6000).await;
        let mut second = seed_payment(&repo, wallet.user_id, 6000).await;

        // Two engines read the same wallet and each debits its own copy.
        let mut seen_by_first = wallet.clone();
        let mut seen_by_second = wallet.clone();
        seen_by_first.debit(first.amount).unwrap();
        seen_by_second.debit(second.amount).unwrap();
        first.complete().unwrap();
        second.complete().unwrap();

        repo.commit_settlement(&seen_by_first, &first).await.unwrap();
        let result = repo.commit_settlement(&seen_by_second, &second).await;

        assert!(matches!(
            result,
            Err(RepoError::Domain(DomainError::InsufficientFunds { available, requested }))
                if available == money(4000) && requested == money(6000)
        ));
        let stored = repo.find_wallet_by_user_id(wallet.user_id).await.unwrap();
        assert_eq!(stored.balance, money(4000));
        assert_eq!(
            repo.find_payment(second.id).await.unwrap().status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_settle_payment_keeps_completed_payment() {
        let repo = setup_repo().await;
        let mut wallet = seed_wallet(&repo, 20000).await;
        let pending = seed_payment(&repo, wallet.user_id, 9999).await;

        let mut completed = pending.clone();
        completed.complete().unwrap();
        wallet.debit(completed.amount).unwrap();
        repo.commit_settlement(&wallet, &completed).await.unwrap();

        let mut failed = pending.clone();
        failed.fail("insufficient funds").unwrap();
        let result = repo.settle_payment(&failed).await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
        let stored = repo.find_payment(pending.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert_eq!(stored.failure_reason, None);
    }

    #[tokio::test]
    async fn test_settle_payment_marks_pending_payment_failed() {
        let repo = setup_repo().await;
        let mut payment = seed_payment(&repo, UserId::new(), 9999).await;

        payment.fail("insufficient funds").unwrap();
        repo.settle_payment(&payment).await.unwrap();

        let stored = repo.find_payment(payment.id).await.unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert_eq!(stored.failure_reason.as_deref(), Some("insufficient funds"));

        let mut unknown =
            Payment::new(PaymentId::new(), OrderId::new(), UserId::new(), money(1)).unwrap();
        unknown.fail("insufficient funds").unwrap();
        assert!(matches!(
            repo.settle_payment(&unknown).await,
            Err(RepoError::PaymentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_outbox_pending_and_mark() {
        let repo = setup_repo().await;
        let payment = seed_payment(&repo, UserId::new(), 9999).await;

        repo.dispatch(&PaymentEvent::initiated(&payment)).await.unwrap();
        repo.dispatch(&PaymentEvent::completed(&payment)).await.unwrap();

        let pending = repo.pending_events(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].event_type, "PaymentInitiated");
        assert_eq!(pending[0].status, OutboxStatus::Pending);
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(pending[0].payload["amount"], 9999);
        assert_eq!(pending[1].event_type, "PaymentCompleted");

        repo.mark_event(pending[0].id, OutboxStatus::Delivered, None)
            .await
            .unwrap();
        repo.mark_event(pending[1].id, OutboxStatus::Failed, Some("HTTP 500".into()))
            .await
            .unwrap();

        assert!(repo.pending_events(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_events_respects_limit() {
        let repo = setup_repo().await;
        let payment = seed_payment(&repo, UserId::new(), 100).await;

        for _ in 0..5 {
            repo.dispatch(&PaymentEvent::initiated(&payment)).await.unwrap();
        }

        assert_eq!(repo.pending_events(3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let repo = setup_repo().await;
        repo.create_schema().await.unwrap();
    }
}
