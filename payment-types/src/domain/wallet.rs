//! Wallet domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{UserId, WalletId};
use super::money::Money;
use crate::error::DomainError;

/// A user's spendable balance. One wallet per user.
///
/// The balance is a [`Money`], so it can never be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Unique identifier
    pub id: WalletId,
    /// Owning user
    pub user_id: UserId,
    /// Current balance
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Opens a wallet with the given balance.
    pub fn new(id: WalletId, user_id: UserId, opening_balance: Money) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            balance: opening_balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a wallet with all fields specified (for database reconstruction).
    pub fn from_parts(
        id: WalletId,
        user_id: UserId,
        balance: Money,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            balance,
            created_at,
            updated_at,
        }
    }

    /// Checks if the wallet can cover a debit of `amount`.
    pub fn has_sufficient_funds(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    /// Debits (subtracts) money from the wallet.
    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_sub(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Credits (adds) money to the wallet.
    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.balance = self.balance.checked_add(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(minor: i64) -> Wallet {
        Wallet::new(
            WalletId::new(),
            UserId::new(),
            Money::from_minor(minor).unwrap(),
        )
    }

    #[test]
    fn test_wallet_debit() {
        let mut wallet = wallet(20000);
        wallet.debit(Money::from_minor(9999).unwrap()).unwrap();
        assert_eq!(wallet.balance.minor_units(), 10001);
    }

    #[test]
    fn test_debit_whole_balance() {
        let mut wallet = wallet(5000);
        assert!(wallet.has_sufficient_funds(Money::from_minor(5000).unwrap()));
        wallet.debit(Money::from_minor(5000).unwrap()).unwrap();
        assert!(wallet.balance.is_zero());
    }

    #[test]
    fn test_insufficient_funds_leaves_balance() {
        let mut wallet = wallet(5000);
        let amount = Money::from_minor(9999).unwrap();
        assert!(!wallet.has_sufficient_funds(amount));
        let result = wallet.debit(amount);
        assert!(matches!(result, Err(DomainError::InsufficientFunds { .. })));
        assert_eq!(wallet.balance.minor_units(), 5000);
    }

    #[test]
    fn test_wallet_credit() {
        let mut wallet = wallet(100);
        wallet.credit(Money::from_minor(50).unwrap()).unwrap();
        assert_eq!(wallet.balance.minor_units(), 150);
    }
}
