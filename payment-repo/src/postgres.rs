//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use payment_types::{
    DispatchError, DomainError, EventDispatcher, Money, OrderId, OutboxEvent, OutboxStatus,
    Payment, PaymentEvent, PaymentId, PaymentRepository, PaymentStatus, RepoError, UserId, Wallet,
};

use crate::types::postgres::{DbOutboxEvent, DbPayment, DbWallet};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository; settlement commits in a single transaction.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_tables_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payment_events_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PaymentRepository for PostgresRepo {
    fn next_id(&self) -> Result<Uuid, RepoError> {
        Ok(Uuid::now_v7())
    }

    async fn store_payment(&self, payment: &Payment) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO payments (id, order_id, user_id, amount, status, failure_reason, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT (id) DO UPDATE SET
                   amount = EXCLUDED.amount,
                   status = EXCLUDED.status,
                   failure_reason = EXCLUDED.failure_reason,
                   updated_at = EXCLUDED.updated_at"#,
        )
        .bind(payment.id.into_uuid())
        .bind(payment.order_id.into_uuid())
        .bind(payment.user_id.into_uuid())
        .bind(payment.amount.minor_units())
        .bind(payment.status.code())
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }

    async fn find_payment(&self, id: PaymentId) -> Result<Payment, RepoError> {
        let row: Option<DbPayment> = sqlx::query_as(
            r#"SELECT id, order_id, user_id, amount, status, failure_reason, created_at, updated_at
               FROM payments WHERE id = $1"#,
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.ok_or(RepoError::PaymentNotFound(id))?.into_domain()
    }

    async fn find_payments_by_order_id(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<Payment>, RepoError> {
        let rows: Vec<DbPayment> = sqlx::query_as(
            r#"SELECT id, order_id, user_id, amount, status, failure_reason, created_at, updated_at
               FROM payments WHERE order_id = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(order_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbPayment::into_domain).collect()
    }

    async fn store_wallet(&self, wallet: &Wallet) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO wallets (id, user_id, balance, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE SET
                   balance = EXCLUDED.balance,
                   updated_at = EXCLUDED.updated_at"#,
        )
        .bind(wallet.id.into_uuid())
        .bind(wallet.user_id.into_uuid())
        .bind(wallet.balance.minor_units())
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
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
        let row: Option<DbWallet> = sqlx::query_as(
            r#"SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1"#,
        )
        .bind(user_id.into_uuid())
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

        settle_pending(&mut db_tx, payment).await?;

        // The guard is re-checked against the committed row once its lock is
        // released, so settlements from other processes cannot overdraw.
        let result = sqlx::query(
            r#"UPDATE wallets SET balance = balance - $1, updated_at = $2
               WHERE id = $3 AND balance >= $1"#,
        )
        .bind(payment.amount.minor_units())
        .bind(wallet.updated_at)
        .bind(wallet.id.into_uuid())
        .execute(&mut *db_tx)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            let balance: Option<i64> =
                sqlx::query_scalar(r#"SELECT balance FROM wallets WHERE id = $1"#)
                    .bind(wallet.id.into_uuid())
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
async fn settle_pending(conn: &mut PgConnection, payment: &Payment) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"UPDATE payments SET status = $1, failure_reason = $2, updated_at = $3
           WHERE id = $4 AND status = $5"#,
    )
    .bind(payment.status.code())
    .bind(&payment.failure_reason)
    .bind(payment.updated_at)
    .bind(payment.id.into_uuid())
    .bind(PaymentStatus::Pending.code())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepoError::Database(e.to_string()))?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let exists: Option<i32> = sqlx::query_scalar(r#"SELECT 1 FROM payments WHERE id = $1"#)
        .bind(payment.id.into_uuid())
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
impl EventDispatcher for PostgresRepo {
    async fn dispatch(&self, event: &PaymentEvent) -> Result<(), DispatchError> {
        let record = OutboxEvent::from_event(event)?;

        sqlx::query(
            r#"INSERT INTO payment_events (id, event_type, payload, status, created_at, attempts)
               VALUES ($1, $2, $3, $4, $5, 0)"#,
        )
        .bind(record.id)
        .bind(&record.event_type)
        .bind(&record.payload)
        .bind(record.status.as_ref())
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DispatchError::Sink(e.to_string()))?;

        Ok(())
    }
}

impl PostgresRepo {
    /// Oldest undelivered events first.
    pub async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, RepoError> {
        let rows = sqlx::query_as::<_, DbOutboxEvent>(
            r#"
            SELECT id, event_type, payload, status, created_at, processed_at, attempts, last_error
            FROM payment_events
            WHERE status = $1
            ORDER BY created_at ASC, id ASC
            LIMIT $2
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
        sqlx::query(
            r#"
            UPDATE payment_events
            SET status = $1, processed_at = $2, last_error = $3, attempts = attempts + 1
            WHERE id = $4
            "#,
        )
        .bind(status.as_ref())
        .bind(Utc::now())
        .bind(last_error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}
