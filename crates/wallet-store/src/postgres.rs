//! PostgreSQL storage implementation.
//!
//! `PgWalletStore` and `PgLedger` share one `PgPool`. A [`PgScope`] wraps a
//! `sqlx::Transaction`; dropping it without committing rolls the transaction
//! back, which is what makes cancelled withdrawals release their row locks.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use wallet_core::{LedgerEntry, UserId, Wallet, WalletId};

use crate::error::{Result, StoreError};
use crate::{LedgerReader, LedgerWriter, TransactionScope, WalletStore};

/// Default time a locked read waits for a row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_WALLET_BY_USER: &str =
    "SELECT id, user_id, balance, created_at, updated_at FROM wallets WHERE user_id = $1";

const SELECT_WALLET_BY_USER_FOR_UPDATE: &str =
    "SELECT id, user_id, balance, created_at, updated_at FROM wallets \
     WHERE user_id = $1 FOR UPDATE";

/// Open a connection pool.
///
/// # Errors
///
/// Returns an error if the database cannot be reached.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    tracing::info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: Uuid,
    balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WalletRow> for Wallet {
    fn from(row: WalletRow) -> Self {
        Self {
            id: WalletId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            balance: row.balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    wallet_id: Uuid,
    amount: Decimal,
    #[sqlx(rename = "type")]
    transaction_type: String,
    status: String,
    reference_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerRow) -> Result<Self> {
        let id = row.id;
        let decode = |reason: String| StoreError::Decode(format!("transaction {id}: {reason}"));
        Ok(Self {
            id: row.id.into(),
            wallet_id: row.wallet_id.into(),
            amount: row.amount,
            transaction_type: row
                .transaction_type
                .parse()
                .map_err(|e: wallet_core::UnknownVariant| decode(e.to_string()))?,
            status: row
                .status
                .parse()
                .map_err(|e: wallet_core::UnknownVariant| decode(e.to_string()))?,
            reference_id: row
                .reference_id
                .parse()
                .map_err(|e: wallet_core::IdError| decode(e.to_string()))?,
            created_at: row.created_at,
        })
    }
}

/// A transaction scope of the PostgreSQL backend.
pub struct PgScope {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TransactionScope for PgScope {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// PostgreSQL-backed wallet store.
#[derive(Clone)]
pub struct PgWalletStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgWalletStore {
    /// Create a wallet store over `pool` with the default lock timeout.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_lock_timeout(pool, DEFAULT_LOCK_TIMEOUT)
    }

    /// Create a wallet store whose locked reads give up after `lock_timeout`.
    #[must_use]
    pub fn with_lock_timeout(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Provision a wallet for `user_id` holding `balance`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the user already owns a wallet.
    pub async fn create_wallet(&self, user_id: &UserId, balance: Decimal) -> Result<Wallet> {
        let wallet = Wallet::new(*user_id, balance);
        let row = sqlx::query_as::<_, WalletRow>(
            "INSERT INTO wallets (id, user_id, balance, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO NOTHING \
             RETURNING id, user_id, balance, created_at, updated_at",
        )
        .bind(*wallet.id.as_uuid())
        .bind(*wallet.user_id.as_uuid())
        .bind(wallet.balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Wallet::from).ok_or_else(|| StoreError::Duplicate {
            entity: "wallet for user",
            id: user_id.to_string(),
        })
    }
}

#[async_trait]
impl WalletStore for PgWalletStore {
    type Scope = PgScope;

    async fn begin(&self) -> Result<PgScope> {
        let mut tx = self.pool.begin().await?;
        // SET does not take bind parameters; the value is an integer we format.
        // Zero disables the timeout.
        let statement = format!("SET LOCAL lock_timeout = {}", self.lock_timeout.as_millis());
        sqlx::query(&statement).execute(&mut *tx).await?;
        Ok(PgScope { tx })
    }

    async fn get_by_user_id(&self, user_id: &UserId) -> Result<Wallet> {
        sqlx::query_as::<_, WalletRow>(SELECT_WALLET_BY_USER)
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Wallet::from)
            .ok_or_else(|| StoreError::wallet_not_found(user_id))
    }

    async fn get_by_user_id_locked(&self, user_id: &UserId, scope: &mut PgScope) -> Result<Wallet> {
        sqlx::query_as::<_, WalletRow>(SELECT_WALLET_BY_USER_FOR_UPDATE)
            .bind(*user_id.as_uuid())
            .fetch_optional(&mut *scope.tx)
            .await?
            .map(Wallet::from)
            .ok_or_else(|| StoreError::wallet_not_found(user_id))
    }

    async fn update_balance(
        &self,
        wallet_id: &WalletId,
        new_balance: Decimal,
        scope: &mut PgScope,
    ) -> Result<DateTime<Utc>> {
        // now() is frozen at transaction start, which can predate the commit
        // of whoever held the row lock before us.
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE wallets \
             SET balance = $1, updated_at = GREATEST(clock_timestamp(), updated_at) \
             WHERE id = $2 RETURNING updated_at",
        )
        .bind(new_balance)
        .bind(*wallet_id.as_uuid())
        .fetch_optional(&mut *scope.tx)
        .await?
        .ok_or_else(|| StoreError::wallet_not_found(wallet_id))
    }
}

/// PostgreSQL-backed ledger.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Create a ledger over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerWriter for PgLedger {
    type Scope = PgScope;

    async fn append(&self, entry: &LedgerEntry, scope: &mut PgScope) -> Result<()> {
        sqlx::query(
            "INSERT INTO transactions \
             (id, wallet_id, amount, type, status, reference_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(*entry.id.as_uuid())
        .bind(*entry.wallet_id.as_uuid())
        .bind(entry.amount)
        .bind(entry.transaction_type.as_str())
        .bind(entry.status.as_str())
        .bind(entry.reference_id.to_string())
        .bind(entry.created_at)
        .execute(&mut *scope.tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerReader for PgLedger {
    async fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, wallet_id, amount, type, status, reference_id, created_at \
             FROM transactions WHERE wallet_id = $1 \
             ORDER BY created_at DESC, reference_id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(*wallet_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}
