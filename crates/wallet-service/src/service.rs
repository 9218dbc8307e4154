//! Wallet operations and the atomic withdraw protocol.
//!
//! [`WalletService`] composes a [`WalletStore`] and a [`LedgerWriter`] that
//! share a transaction scope type. A withdrawal runs entirely inside one
//! scope:
//!
//! 1. validate the amount (before any scope is opened)
//! 2. begin a scope
//! 3. lock the wallet row
//! 4. check funds
//! 5. write the new balance
//! 6. append the ledger entry
//! 7. commit
//!
//! Any failure after step 2 rolls the scope back, so the balance change and
//! the ledger entry become durable together or not at all. Concurrent
//! withdrawals on one wallet serialize on the row lock held by the store;
//! the service keeps no in-process lock of its own.

use std::sync::Arc;

use async_trait::async_trait;
use wallet_core::{validate_amount, Decimal, LedgerEntry, Result, UserId, Wallet, WalletError};
use wallet_store::{LedgerReader, LedgerWriter, StoreError, TransactionScope, WalletStore};

/// Operations the HTTP layer needs from the wallet service.
///
/// This is the object-safe face of [`WalletService`], so handlers do not
/// depend on the storage backend.
#[async_trait]
pub trait WalletOperations: Send + Sync {
    /// Get the wallet (and balance) of a user.
    ///
    /// # Errors
    ///
    /// - `WalletError::WalletNotFound` if the user has no wallet.
    /// - `WalletError::Storage` if the read fails.
    async fn get_balance(&self, user_id: &UserId) -> Result<Wallet>;

    /// Withdraw `amount` from the user's wallet.
    ///
    /// Returns the wallet as it stands after the committed withdrawal.
    ///
    /// # Errors
    ///
    /// - `WalletError::InvalidAmount` if `amount` is not a positive amount of money.
    /// - `WalletError::WalletNotFound` if the user has no wallet.
    /// - `WalletError::InsufficientFunds` if `amount` exceeds the balance.
    /// - `WalletError::Storage` if the store fails at any step, including commit.
    async fn withdraw(&self, user_id: &UserId, amount: Decimal) -> Result<Wallet>;

    /// List the user's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// - `WalletError::WalletNotFound` if the user has no wallet.
    /// - `WalletError::Storage` if the read fails.
    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>>;
}

/// The withdrawal coordinator.
pub struct WalletService<W, L> {
    wallets: Arc<W>,
    ledger: Arc<L>,
}

impl<W, L> WalletService<W, L>
where
    W: WalletStore,
    L: LedgerWriter<Scope = W::Scope>,
{
    /// Create a service over a wallet store and a ledger sharing its scopes.
    #[must_use]
    pub fn new(wallets: Arc<W>, ledger: Arc<L>) -> Self {
        Self { wallets, ledger }
    }

    /// Steps 3 to 6 of the protocol. The caller owns commit and rollback.
    async fn debit_in_scope(
        &self,
        user_id: &UserId,
        amount: Decimal,
        scope: &mut W::Scope,
    ) -> Result<(Wallet, LedgerEntry)> {
        let mut wallet = self
            .wallets
            .get_by_user_id_locked(user_id, scope)
            .await
            .map_err(|e| lookup_error(e, user_id))?;

        let new_balance = wallet.balance_after_debit(amount)?;

        tracing::debug!(
            user_id = %user_id,
            wallet_id = %wallet.id,
            balance = %wallet.balance,
            new_balance = %new_balance,
            "Wallet locked, debiting"
        );

        let updated_at = self
            .wallets
            .update_balance(&wallet.id, new_balance, scope)
            .await?;

        let entry = LedgerEntry::withdrawal(wallet.id, amount);
        self.ledger.append(&entry, scope).await?;

        wallet.balance = new_balance;
        wallet.updated_at = updated_at;
        Ok((wallet, entry))
    }
}

/// Map a wallet lookup failure, turning a missing row into `WalletNotFound`.
fn lookup_error(err: StoreError, user_id: &UserId) -> WalletError {
    if err.is_not_found() {
        WalletError::WalletNotFound { user_id: *user_id }
    } else {
        err.into()
    }
}

#[async_trait]
impl<W, L> WalletOperations for WalletService<W, L>
where
    W: WalletStore + 'static,
    L: LedgerWriter<Scope = W::Scope> + LedgerReader + 'static,
{
    async fn get_balance(&self, user_id: &UserId) -> Result<Wallet> {
        self.wallets
            .get_by_user_id(user_id)
            .await
            .map_err(|e| lookup_error(e, user_id))
    }

    async fn withdraw(&self, user_id: &UserId, amount: Decimal) -> Result<Wallet> {
        if let Err(err) = validate_amount(amount) {
            tracing::warn!(user_id = %user_id, amount = %amount, "Rejected withdrawal amount");
            return Err(err);
        }

        let mut scope = self.wallets.begin().await?;

        let (wallet, entry) = match self.debit_in_scope(user_id, amount, &mut scope).await {
            Ok(done) => done,
            Err(err) => {
                if let Err(rollback_err) = scope.rollback().await {
                    tracing::error!(
                        user_id = %user_id,
                        error = %rollback_err,
                        "Rollback failed"
                    );
                }
                tracing::warn!(
                    user_id = %user_id,
                    amount = %amount,
                    error = %err,
                    "Withdrawal rolled back"
                );
                return Err(err);
            }
        };

        if let Err(err) = scope.commit().await {
            tracing::error!(
                user_id = %user_id,
                wallet_id = %wallet.id,
                error = %err,
                "Withdrawal commit failed"
            );
            return Err(err.into());
        }

        tracing::info!(
            user_id = %user_id,
            wallet_id = %wallet.id,
            transaction_id = %entry.id,
            reference_id = %entry.reference_id,
            amount = %amount,
            new_balance = %wallet.balance,
            "Withdrawal committed"
        );

        Ok(wallet)
    }

    async fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let wallet = self.get_balance(user_id).await?;
        Ok(self.ledger.list_by_wallet(&wallet.id, limit, offset).await?)
    }
}
