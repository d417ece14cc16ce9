//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use payment_types::{
    DispatchError, DomainError, EventDispatcher, Money, OrderId, OutboxEvent, OutboxStatus,
    Payment, PaymentEvent, PaymentId, PaymentRepository, PaymentStatus, RepoError, UserId, Wallet,
};

use crate::types::sqlite::{DbOutboxEvent, DbPayment, DbWallet, format_time};

const PAYMENT_COLUMNS: &str =
    "id, order_id, user_id, amount, status, failure_reason, created_at, updated_at";
const WALLET_COLUMNS: &str = "id, user_id, balance, created_at, updated_at";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens its own empty database, so
        // keep exactly one and never recycle it.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let ddl_events = include_str!("../migrations/0002_create_payment_events.sql");
        sqlx::query(ddl_events)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PaymentRepository for SqliteRepo {
    fn next_id(&self) -> Result<Uuid, RepoError> {
        Ok(Uuid::now_v7())
    }

    async fn store_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO payments (id, order_id, user_id, amount, status, failure_reason, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   amount = excluded.amount,
                   status = excluded.status,
                   failure_reason = excluded.failure_reason,
                   updated_at = excluded.updated_at"#,
        )
        .bind(payment.id.to_string())
        .bind(payment.order_id.to_string())
        .bind(payment.user_id.to_string())
        .bind(payment.amount.minor_units())
        .bind(payment.status.code())
        .bind(&payment.failure_reason)
        .bind(format_time(payment.created_at))
        .bind(format_time(payment.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_payment(&self, id: PaymentId) -> Result<Payment, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::PaymentNotFound(id))?.into_domain()
    }

    async fn find_payments_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, RepoError> {
        let rows: Vec<DbPayment> = sqlx::query_as(&format!(
            "SELECT {} FROM payments WHERE order_id = ? ORDER BY created_at DESC, id DESC",
            PAYMENT_COLUMNS
        ))
        .bind(order_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn store_wallet(&self, wallet: &Wallet) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO wallets (id, user_id, balance, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   balance = excluded.balance,
                   updated_at = excluded.updated_at"#,
        )
        .bind(wallet.id.to_string())
        .bind(wallet.user_id.to_string())
        .bind(wallet.balance.minor_units())
        .bind(format_time(wallet.created_at))
        .bind(format_time(wallet.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(format!(
                "user {} already has a wallet",
                wallet.user_id
            )),
            e => RepoError::Database(e.to_string()),
        })?;

        Ok(())
    }

    async fn find_wallet_by_user_id(&self, user_id: UserId) -> Result<Wallet, RepoError> {
        let row: Option<DbWallet> = sqlx::query_as(&format!(
            "SELECT {} FROM wallets WHERE user_id = ?",
            WALLET_COLUMNS
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::WalletNotFound(user_id))?.into_domain()
    }

    async fn settle_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        settle_pending(&mut conn, payment).await
    }

    async fn commit_settlement(&self, wallet: &Wallet, payment: &Payment) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        // Writing first takes SQLite's write lock for the rest of the transaction.
        settle_pending(&mut db_tx, payment).await?;

        // Debit the stored balance; another process may have spent from it.
        let result = sqlx::query(
            r#"UPDATE wallets SET balance = balance - ?, updated_at = ?
               WHERE id = ? AND balance >= ?"#,
        )
        .bind(payment.amount.minor_units())
        .bind(format_time(wallet.updated_at))
        .bind(wallet.id.to_string())
        .bind(payment.amount.minor_units())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            let balance: Option<i64> = sqlx::query_scalar("SELECT balance FROM wallets WHERE id = ?")
                .bind(wallet.id.to_string())
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(|e| RepoError::Database(e.to_string()))?;

            return Err(match balance {
                None => RepoError::WalletNotFound(wallet.user_id),
                Some(available) => RepoError::Domain(DomainError::InsufficientFunds {
                    available: Money::from_minor(available)?,
                    requested: payment.amount,
                }),
            });
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        Ok(())
    }
}

/// Moves a payment out of `Pending`; `Conflict` if it already left it.
async fn settle_pending(conn: &mut SqliteConnection, payment: &Payment) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"UPDATE payments SET status = ?, failure_reason = ?, updated_at = ?
           WHERE id = ? AND status = ?"#,
    )
    .bind(payment.status.code())
    .bind(&payment.failure_reason)
    .bind(format_time(payment.updated_at))
    .bind(payment.id.to_string())
    .bind(PaymentStatus::Pending.code())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM payments WHERE id = ?")
        .bind(payment.id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

    match exists {
        None => Err(RepoError::PaymentNotFound(payment.id)),
        Some(_) => Err(RepoError::Conflict(format!(
            "payment {} is no longer pending",
            payment.id
        ))),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbox
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl EventDispatcher for SqliteRepo {
    async fn dispatch(&self, event: &PaymentEvent) -> Result<(), DispatchError> {
        let record = OutboxEvent::from_event(event)?;

        sqlx::query(
            r#"INSERT INTO payment_events (id, event_type, payload, status, created_at, attempts)
               VALUES (?, ?, ?, ?, ?, 0)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.event_type)
        .bind(record.payload.to_string())
        .bind(record.status.as_ref())
        .bind(format_time(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| DispatchError::Sink(e.to_string()))?;

        Ok(())
    }
}

impl SqliteRepo {
    /// Oldest undelivered events first.
    pub async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, RepoError> {
        let rows = sqlx::query_as::<_, DbOutboxEvent>(
            r#"
            SELECT id, event_type, payload, status, created_at, processed_at, attempts, last_error
            FROM payment_events
            WHERE status = ?
            ORDER BY created_at ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(OutboxStatus::Pending.as_ref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbOutboxEvent::into_domain).collect()
    }

    pub async fn mark_event(
        &self,
        id: Uuid,
        status: OutboxStatus,
        last_error: Option<String>,
    ) -> Result<(), RepoError> {
        let now = format_time(chrono::Utc::now());

        sqlx::query(
            r#"
            UPDATE payment_events
            SET status = ?, processed_at = ?, last_error = ?, attempts = attempts + 1
            WHERE id = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(now)
        .bind(last_error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}
