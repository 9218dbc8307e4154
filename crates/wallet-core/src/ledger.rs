//! Ledger entry types.
//!
//! Every committed withdrawal leaves exactly one ledger entry. Entries are
//! append-only: nothing in the workspace updates or deletes them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ReferenceId, TransactionId, WalletId};

/// An immutable record of a balance-affecting operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID.
    pub id: TransactionId,

    /// The wallet the entry debits or credits.
    pub wallet_id: WalletId,

    /// Amount moved. Always positive; the direction comes from `transaction_type`.
    pub amount: Decimal,

    /// Kind of operation.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// Outcome of the operation.
    pub status: TransactionStatus,

    /// Correlation token for audit and idempotency tooling.
    pub reference_id: ReferenceId,

    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a successful withdrawal entry stamped with the current time.
    #[must_use]
    pub fn withdrawal(wallet_id: WalletId, amount: Decimal) -> Self {
        Self::withdrawal_at(wallet_id, amount, Utc::now())
    }

    /// Create a successful withdrawal entry with an explicit timestamp.
    #[must_use]
    pub fn withdrawal_at(wallet_id: WalletId, amount: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::generate(),
            wallet_id,
            amount,
            transaction_type: TransactionType::Withdraw,
            status: TransactionStatus::Success,
            reference_id: ReferenceId::generate(),
            created_at,
        }
    }

    /// Signed effect of this entry on the wallet balance.
    #[must_use]
    pub fn balance_delta(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Withdraw => -self.amount,
            TransactionType::Deposit => self.amount,
        }
    }
}

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Funds leaving the wallet.
    Withdraw,

    /// Funds entering the wallet. Part of the stored vocabulary; the service
    /// never writes deposits.
    Deposit,
}

impl TransactionType {
    /// Get the stored name of the type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Withdraw => "withdraw",
            Self::Deposit => "deposit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "withdraw" => Ok(Self::Withdraw),
            "deposit" => Ok(Self::Deposit),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Outcome of a ledger entry.
///
/// Only committed operations are recorded, so `Success` is the sole status.
/// A rejected withdrawal rolls back before anything reaches the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// The operation committed.
    Success,
}

impl TransactionStatus {
    /// Get the stored name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// A stored enum value that this build does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);
