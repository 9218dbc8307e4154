//! In-memory storage implementation.
//!
//! `MemoryStore` honors the same contract as the PostgreSQL backend:
//!
//! - Each wallet row has its own `tokio::sync::Mutex`. A locked read takes an
//!   owned guard and parks it in the [`MemoryScope`], so the row stays locked
//!   until the scope commits, rolls back or is dropped.
//! - Writes are staged in the scope and applied to the committed tables in
//!   one step on commit. Plain reads only see committed data and never wait
//!   on row locks.
//! - Balance writes require the row lock held by the same scope.
//! - A zero lock timeout means "wait without bound", as `lock_timeout = 0`
//!   does in PostgreSQL.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::OwnedMutexGuard;

use wallet_core::{LedgerEntry, ReferenceId, TransactionId, UserId, Wallet, WalletId};

use crate::error::{Result, StoreError};
use crate::{LedgerReader, LedgerWriter, TransactionScope, WalletStore};

/// Default time a locked read waits for a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Committed state.
#[derive(Default)]
struct Tables {
    wallets: HashMap<WalletId, Wallet>,
    wallets_by_user: HashMap<UserId, WalletId>,
    row_locks: HashMap<WalletId, Arc<tokio::sync::Mutex<()>>>,
    ledger: Vec<LedgerEntry>,
    transaction_ids: HashSet<TransactionId>,
    reference_ids: HashSet<ReferenceId>,
}

type SharedTables = Arc<Mutex<Tables>>;

fn lock_tables(tables: &Mutex<Tables>) -> Result<MutexGuard<'_, Tables>> {
    tables
        .lock()
        .map_err(|_| StoreError::Database("memory tables poisoned".into()))
}

/// In-memory wallet and ledger store.
#[derive(Clone)]
pub struct MemoryStore {
    tables: SharedTables,
    lock_timeout: Duration,
}

impl MemoryStore {
    /// Create an empty store with the default lock timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store whose locked reads give up after `lock_timeout`.
    #[must_use]
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            lock_timeout,
        }
    }

    /// Provision a wallet.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the user already owns a wallet or
    /// the wallet ID is taken.
    pub fn insert_wallet(&self, wallet: Wallet) -> Result<()> {
        let mut tables = lock_tables(&self.tables)?;

        if tables.wallets_by_user.contains_key(&wallet.user_id) {
            return Err(StoreError::Duplicate {
                entity: "wallet for user",
                id: wallet.user_id.to_string(),
            });
        }
        if tables.wallets.contains_key(&wallet.id) {
            return Err(StoreError::Duplicate {
                entity: "wallet",
                id: wallet.id.to_string(),
            });
        }

        tables.wallets_by_user.insert(wallet.user_id, wallet.id);
        tables
            .row_locks
            .insert(wallet.id, Arc::new(tokio::sync::Mutex::new(())));
        tables.wallets.insert(wallet.id, wallet);
        Ok(())
    }

    fn resolve_row(&self, user_id: &UserId) -> Result<(WalletId, Arc<tokio::sync::Mutex<()>>)> {
        let tables = lock_tables(&self.tables)?;
        let wallet_id = *tables
            .wallets_by_user
            .get(user_id)
            .ok_or_else(|| StoreError::wallet_not_found(user_id))?;
        let row_lock = tables
            .row_locks
            .get(&wallet_id)
            .cloned()
            .ok_or_else(|| StoreError::wallet_not_found(wallet_id))?;
        Ok((wallet_id, row_lock))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A transaction scope of [`MemoryStore`].
pub struct MemoryScope {
    tables: SharedTables,
    row_guards: HashMap<WalletId, OwnedMutexGuard<()>>,
    staged_balances: HashMap<WalletId, (Decimal, DateTime<Utc>)>,
    staged_entries: Vec<LedgerEntry>,
}

impl MemoryScope {
    fn new(tables: SharedTables) -> Self {
        Self {
            tables,
            row_guards: HashMap::new(),
            staged_balances: HashMap::new(),
            staged_entries: Vec::new(),
        }
    }

    /// Number of wallet rows this scope holds locked.
    #[must_use]
    pub fn locked_rows(&self) -> usize {
        self.row_guards.len()
    }

    /// Apply staged writes to the committed tables.
    fn apply(&mut self) -> Result<()> {
        let mut tables = lock_tables(&self.tables)?;

        // Validate everything before touching anything so a failing commit
        // leaves the tables as they were.
        for wallet_id in self.staged_balances.keys() {
            if !tables.wallets.contains_key(wallet_id) {
                return Err(StoreError::wallet_not_found(wallet_id));
            }
        }
        let mut batch_ids = HashSet::new();
        let mut batch_refs = HashSet::new();
        for entry in &self.staged_entries {
            let fresh = !tables.transaction_ids.contains(&entry.id)
                && !tables.reference_ids.contains(&entry.reference_id)
                && batch_ids.insert(entry.id)
                && batch_refs.insert(entry.reference_id);
            if !fresh {
                return Err(StoreError::Duplicate {
                    entity: "transaction",
                    id: entry.id.to_string(),
                });
            }
        }

        for (wallet_id, (balance, updated_at)) in self.staged_balances.drain() {
            if let Some(wallet) = tables.wallets.get_mut(&wallet_id) {
                wallet.balance = balance;
                wallet.updated_at = updated_at;
            }
        }
        tables.transaction_ids.extend(batch_ids);
        tables.reference_ids.extend(batch_refs);
        tables.ledger.append(&mut self.staged_entries);
        Ok(())
    }
}

#[async_trait]
impl TransactionScope for MemoryScope {
    async fn commit(mut self) -> Result<()> {
        self.apply()?;
        tracing::trace!(rows = self.row_guards.len(), "Memory scope committed");
        // Row guards drop here, after the committed tables are updated.
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        tracing::trace!(rows = self.row_guards.len(), "Memory scope rolled back");
        Ok(())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> Result<MemoryScope> {
        Ok(MemoryScope::new(Arc::clone(&self.tables)))
    }

    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Wallet> {
        let tables = lock_tables(&self.tables)?;
        tables
            .wallets_by_user
            .get(user_id)
            .and_then(|id| tables.wallets.get(id))
            .cloned()
            .ok_or_else(|| StoreError::wallet_not_found(user_id))
    }

    async fn get_by_user_id_locked(
        &self,
        user_id: &UserId,
        scope: &mut MemoryScope,
    ) -> Result<Wallet> {
        let (wallet_id, row_lock) = self.resolve_row(user_id)?;

        if !scope.row_guards.contains_key(&wallet_id) {
            let guard = if self.lock_timeout.is_zero() {
                row_lock.lock_owned().await
            } else {
                tokio::time::timeout(self.lock_timeout, row_lock.lock_owned())
                    .await
                    .map_err(|_| StoreError::LockTimeout)?
            };
            scope.row_guards.insert(wallet_id, guard);
        }

        let mut wallet = {
            let tables = lock_tables(&self.tables)?;
            tables
                .wallets
                .get(&wallet_id)
                .cloned()
                .ok_or_else(|| StoreError::wallet_not_found(user_id))?
        };
        if let Some((balance, updated_at)) = scope.staged_balances.get(&wallet_id) {
            wallet.balance = *balance;
            wallet.updated_at = *updated_at;
        }
        Ok(wallet)
    }

    async fn update_balance(
        &self,
        wallet_id: &WalletId,
        new_balance: Decimal,
        scope: &mut MemoryScope,
    ) -> Result<DateTime<Utc>> {
        if new_balance < Decimal::ZERO {
            return Err(StoreError::Database(format!(
                "balance of wallet {wallet_id} would be negative: {new_balance}"
            )));
        }
        if !scope.row_guards.contains_key(wallet_id) {
            return Err(StoreError::NotLocked {
                id: wallet_id.to_string(),
            });
        }
        let previous = match scope.staged_balances.get(wallet_id) {
            Some((_, staged_at)) => *staged_at,
            None => lock_tables(&self.tables)?
                .wallets
                .get(wallet_id)
                .map(|w| w.updated_at)
                .ok_or_else(|| StoreError::wallet_not_found(wallet_id))?,
        };

        // Never move updated_at backwards, even if the wall clock does.
        let updated_at = Utc::now().max(previous);
        scope
            .staged_balances
            .insert(*wallet_id, (new_balance, updated_at));
        Ok(updated_at)
    }
}

#[async_trait]
impl LedgerWriter for MemoryStore {
    type Scope = MemoryScope;

    async fn append(&self, entry: &LedgerEntry, scope: &mut MemoryScope) -> Result<()> {
        if entry.amount <= Decimal::ZERO {
            return Err(StoreError::Database(format!(
                "ledger amount must be positive: {}",
                entry.amount
            )));
        }
        if !lock_tables(&self.tables)?.wallets.contains_key(&entry.wallet_id) {
            return Err(StoreError::wallet_not_found(entry.wallet_id));
        }

        scope.staged_entries.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl LedgerReader for MemoryStore {
    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let tables = lock_tables(&self.tables)?;
        Ok(tables
            .ledger
            .iter()
            .rev()
            .filter(|e| e.wallet_id == *wallet_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
