//! Database row types for the SQL adapters.
//!
//! SQLite stores UUIDs and timestamps as text; PostgreSQL stores them
//! natively. Each backend gets its own row structs so both can be compiled
//! into the same binary.

use payment_types::{
    Money, OrderId, OutboxEvent, OutboxStatus, Payment, PaymentId, PaymentStatus, RepoError,
    UserId, Wallet, WalletId,
};

fn decode_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(format!("failed to decode row: {}", e))
}

fn outbox_status(raw: &str) -> Result<OutboxStatus, RepoError> {
    raw.parse().map_err(decode_err)
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite rows (TEXT ids, RFC 3339 timestamps, TEXT JSON)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
pub mod sqlite {
    use chrono::{DateTime, SecondsFormat, Utc};
    use sqlx::FromRow;
    use uuid::Uuid;

    use super::*;

    /// Fixed-width RFC 3339 so text ordering matches time ordering.
    pub fn format_time(t: DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_time(raw: &str) -> Result<DateTime<Utc>, RepoError> {
        Ok(DateTime::parse_from_rfc3339(raw)
            .map_err(decode_err)?
            .with_timezone(&Utc))
    }

    fn parse_uuid(raw: &str) -> Result<Uuid, RepoError> {
        Uuid::parse_str(raw).map_err(decode_err)
    }

    /// Wallet row from database.
    #[derive(FromRow)]
    pub struct DbWallet {
        pub id: String,
        pub user_id: String,
        pub balance: i64,
        pub created_at: String,
        pub updated_at: String,
    }

    impl DbWallet {
        pub fn into_domain(self) -> Result<Wallet, RepoError> {
            Ok(Wallet::from_parts(
                WalletId::from_uuid(parse_uuid(&self.id)?),
                UserId::from_uuid(parse_uuid(&self.user_id)?),
                Money::from_minor(self.balance)?,
                parse_time(&self.created_at)?,
                parse_time(&self.updated_at)?,
            ))
        }
    }

    /// Payment row from database.
    #[derive(FromRow)]
    pub struct DbPayment {
        pub id: String,
        pub order_id: String,
        pub user_id: String,
        pub amount: i64,
        pub status: i16,
        pub failure_reason: Option<String>,
        pub created_at: String,
        pub updated_at: String,
    }

    impl DbPayment {
        pub fn into_domain(self) -> Result<Payment, RepoError> {
            Ok(Payment::from_parts(
                PaymentId::from_uuid(parse_uuid(&self.id)?),
                OrderId::from_uuid(parse_uuid(&self.order_id)?),
                UserId::from_uuid(parse_uuid(&self.user_id)?),
                Money::from_minor(self.amount)?,
                PaymentStatus::try_from(self.status)?,
                self.failure_reason,
                parse_time(&self.created_at)?,
                parse_time(&self.updated_at)?,
            ))
        }
    }

    /// Outbox row from database.
    #[derive(FromRow)]
    pub struct DbOutboxEvent {
        pub id: String,
        pub event_type: String,
        pub payload: String,
        pub status: String,
        pub created_at: String,
        pub processed_at: Option<String>,
        pub attempts: i32,
        pub last_error: Option<String>,
    }

    impl DbOutboxEvent {
        pub fn into_domain(self) -> Result<OutboxEvent, RepoError> {
            let processed_at = match self.processed_at {
                Some(s) => Some(parse_time(&s)?),
                None => None,
            };

            Ok(OutboxEvent {
                id: parse_uuid(&self.id)?,
                event_type: self.event_type,
                payload: serde_json::from_str(&self.payload).map_err(decode_err)?,
                status: outbox_status(&self.status)?,
                created_at: parse_time(&self.created_at)?,
                processed_at,
                attempts: self.attempts,
                last_error: self.last_error,
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL rows (native UUID, TIMESTAMPTZ, JSONB)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
pub mod postgres {
    use chrono::{DateTime, Utc};
    use sqlx::FromRow;
    use uuid::Uuid;

    use super::*;

    /// Wallet row from database.
    #[derive(FromRow)]
    pub struct DbWallet {
        pub id: Uuid,
        pub user_id: Uuid,
        pub balance: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl DbWallet {
        pub fn into_domain(self) -> Result<Wallet, RepoError> {
            Ok(Wallet::from_parts(
                WalletId::from_uuid(self.id),
                UserId::from_uuid(self.user_id),
                Money::from_minor(self.balance)?,
                self.created_at,
                self.updated_at,
            ))
        }
    }

    /// Payment row from database.
    #[derive(FromRow)]
    pub struct DbPayment {
        pub id: Uuid,
        pub order_id: Uuid,
        pub user_id: Uuid,
        pub amount: i64,
        pub status: i16,
        pub failure_reason: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl DbPayment {
        pub fn into_domain(self) -> Result<Payment, RepoError> {
            Ok(Payment::from_parts(
                PaymentId::from_uuid(self.id),
                OrderId::from_uuid(self.order_id),
                UserId::from_uuid(self.user_id),
                Money::from_minor(self.amount)?,
                PaymentStatus::try_from(self.status)?,
                self.failure_reason,
                self.created_at,
                self.updated_at,
            ))
        }
    }

    /// Outbox row from database.
    #[derive(FromRow)]
    pub struct DbOutboxEvent {
        pub id: Uuid,
        pub event_type: String,
        pub payload: serde_json::Value,
        pub status: String,
        pub created_at: DateTime<Utc>,
        pub processed_at: Option<DateTime<Utc>>,
        pub attempts: i32,
        pub last_error: Option<String>,
    }

    impl DbOutboxEvent {
        pub fn into_domain(self) -> Result<OutboxEvent, RepoError> {
            Ok(OutboxEvent {
                id: self.id,
                event_type: self.event_type,
                payload: self.payload,
                status: outbox_status(&self.status)?,
                created_at: self.created_at,
                processed_at: self.processed_at,
                attempts: self.attempts,
                last_error: self.last_error,
            })
        }
    }
}
