//! Error types for wallet storage.

use wallet_core::WalletError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// `SQLSTATE` raised by PostgreSQL when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// A unique key is already taken.
    #[error("duplicate {entity}: {id}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// The conflicting key.
        id: String,
    },

    /// A row lock could not be acquired before the lock timeout.
    #[error("lock wait timed out")]
    LockTimeout,

    /// A write touched a row the scope has not locked.
    #[error("row not locked by this scope: {id}")]
    NotLocked {
        /// The row key.
        id: String,
    },

    /// A stored row could not be decoded into a domain value.
    #[error("decode error: {0}")]
    Decode(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Build a `NotFound` error for a wallet key.
    pub(crate) fn wallet_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "wallet",
            id: id.to_string(),
        }
    }

    /// Check if this is a `NotFound` error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a `Duplicate` error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
                return Self::LockTimeout;
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for WalletError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
