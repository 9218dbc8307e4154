//! Error types for the wallet ledger.

use rust_decimal::Decimal;

use crate::UserId;

/// Result type for wallet operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Errors a wallet operation can end with.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The requested amount is not a positive amount of money.
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// No wallet exists for the user.
    #[error("wallet not found for user: {user_id}")]
    WalletNotFound {
        /// The user ID that was looked up.
        user_id: UserId,
    },

    /// The wallet balance cannot cover the requested amount.
    #[error("insufficient funds: balance={balance}, requested={requested}")]
    InsufficientFunds {
        /// Balance at the time of the check.
        balance: Decimal,
        /// Amount that was requested.
        requested: Decimal,
    },

    /// The data store failed (connection loss, lock timeout, commit failure,
    /// constraint violation).
    #[error("storage error: {0}")]
    Storage(String),
}
