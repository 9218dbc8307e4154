//! Storage layer for the wallet ledger.
//!
//! This crate defines the storage contracts used by the withdrawal
//! coordinator and provides two backends:
//!
//! - [`postgres`]: `PgWalletStore` and `PgLedger` over a shared `PgPool`.
//!   Locked reads use `SELECT ... FOR UPDATE`.
//! - [`memory`]: `MemoryStore`, a single-process backend with one async
//!   mutex per wallet row. Used by tests and local runs.
//!
//! # Transaction scopes
//!
//! Every write takes an explicit `&mut Scope` obtained from
//! [`WalletStore::begin`]. A scope is finished with
//! [`TransactionScope::commit`] or [`TransactionScope::rollback`]; dropping
//! an unfinished scope rolls it back and releases its row locks.
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{Decimal, LedgerEntry, UserId, Wallet};
//! use wallet_store::{LedgerWriter, MemoryStore, TransactionScope, WalletStore};
//!
//! # async fn run() -> wallet_store::Result<()> {
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//! store.insert_wallet(Wallet::new(user_id, Decimal::new(10_000, 2)))?;
//!
//! let mut scope = store.begin().await?;
//! let wallet = store.get_by_user_id_locked(&user_id, &mut scope).await?;
//! let amount = Decimal::new(1_000, 2);
//! store.update_balance(&wallet.id, wallet.balance - amount, &mut scope).await?;
//! store.append(&LedgerEntry::withdrawal(wallet.id, amount), &mut scope).await?;
//! scope.commit().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::{MemoryScope, MemoryStore};
pub use postgres::{connect, PgLedger, PgScope, PgWalletStore};
pub use schema::migrate;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use wallet_core::{LedgerEntry, UserId, Wallet, WalletId};

/// An open unit of atomicity and isolation.
///
/// Dropping a scope without calling [`commit`](Self::commit) discards its
/// writes and releases its locks.
#[async_trait]
pub trait TransactionScope: Send {
    /// Make every write of the scope durable and release its locks.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; nothing of the scope is
    /// durable in that case.
    async fn commit(self) -> Result<()>;

    /// Discard every write of the scope and release its locks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports a failure while rolling back.
    async fn rollback(self) -> Result<()>;
}

/// Wallet balance persistence.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Transaction scope type of this backend.
    type Scope: TransactionScope;

    /// Open a transaction scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction.
    async fn begin(&self) -> Result<Self::Scope>;

    /// Get the wallet owned by `user_id`.
    ///
    /// This is a plain read and never waits on row locks.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user has no wallet.
    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Wallet>;

    /// Get the wallet owned by `user_id` and lock its row until `scope` ends.
    ///
    /// Other lockers of the same row wait until this scope commits or rolls
    /// back, then observe its committed balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user has no wallet.
    /// - `StoreError::LockTimeout` if the row stayed locked past the lock timeout.
    async fn get_by_user_id_locked(
        &self,
        user_id: &UserId,
        scope: &mut Self::Scope,
    ) -> Result<Wallet>;

    /// Write `new_balance` to the wallet within `scope`.
    ///
    /// Returns the refreshed `updated_at` timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the wallet does not exist.
    async fn update_balance(
        &self,
        wallet_id: &WalletId,
        new_balance: Decimal,
        scope: &mut Self::Scope,
    ) -> Result<DateTime<Utc>>;
}

/// Append-only ledger writes.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Transaction scope type the ledger writes into.
    type Scope: Send;

    /// Insert `entry` within `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn append(&self, entry: &LedgerEntry, scope: &mut Self::Scope) -> Result<()>;
}

/// Read access to committed ledger history.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// List committed entries of a wallet, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;
}
