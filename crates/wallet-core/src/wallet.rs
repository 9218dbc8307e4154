//! Wallet types.
//!
//! A wallet holds the monetary balance of exactly one user. Balances are
//! `rust_decimal::Decimal` values with at most [`MONEY_SCALE`] fractional
//! digits, matching the `NUMERIC(20, 2)` columns they are stored in.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};
use crate::{UserId, WalletId};

/// Number of fractional digits a monetary amount may carry.
pub const MONEY_SCALE: u32 = 2;

/// A user's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// The wallet ID.
    pub id: WalletId,

    /// The owning user. One wallet per user.
    pub user_id: UserId,

    /// Current balance. Never negative at rest.
    pub balance: Decimal,

    /// When the wallet was created.
    pub created_at: DateTime<Utc>,

    /// When the balance was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a new wallet for `user_id` holding `balance`.
    ///
    /// Wallets are provisioned outside the withdraw protocol; this is used
    /// by store provisioning helpers and tests.
    #[must_use]
    pub fn new(user_id: UserId, balance: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: WalletId::generate(),
            user_id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the wallet can cover a debit of `amount`.
    #[must_use]
    pub fn has_sufficient_funds(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Compute the balance left after debiting `amount`.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InsufficientFunds` if `amount` exceeds the balance.
    pub fn balance_after_debit(&self, amount: Decimal) -> Result<Decimal> {
        if !self.has_sufficient_funds(amount) {
            return Err(WalletError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        Ok(self.balance - amount)
    }
}

/// Validate a debit amount.
///
/// The amount must be strictly positive and carry no more than
/// [`MONEY_SCALE`] fractional digits.
///
/// # Errors
///
/// Returns `WalletError::InvalidAmount` otherwise.
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > MONEY_SCALE {
        return Err(WalletError::InvalidAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn new_wallet_timestamps_match() {
        let wallet = Wallet::new(UserId::generate(), money("10.00"));
        assert_eq!(wallet.created_at, wallet.updated_at);
        assert_eq!(wallet.balance, money("10.00"));
    }

    #[test]
    fn wallet_sufficient_funds() {
        let wallet = Wallet::new(UserId::generate(), money("100.00"));

        assert!(wallet.has_sufficient_funds(money("40.00")));
        assert!(wallet.has_sufficient_funds(money("100.00")));
        assert!(!wallet.has_sufficient_funds(money("100.01")));
    }

    #[test]
    fn debit_to_zero_is_allowed() {
        let wallet = Wallet::new(UserId::generate(), money("25.50"));
        assert_eq!(wallet.balance_after_debit(money("25.50")).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn overdraw_reports_balance_and_request() {
        let wallet = Wallet::new(UserId::generate(), money("60.00"));
        let err = wallet.balance_after_debit(money("100.00")).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { balance, requested }
                if balance == money("60.00") && requested == money("100.00")
        ));
    }

    #[test]
    fn non_positive_amounts_are_invalid() {
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(money("-5")).is_err());
        assert!(validate_amount(money("0.01")).is_ok());
    }

    #[test]
    fn sub_cent_amounts_are_invalid() {
        assert!(validate_amount(money("1.005")).is_err());
        // Trailing zeros do not count as precision.
        assert!(validate_amount(money("1.5000")).is_ok());
    }
}
