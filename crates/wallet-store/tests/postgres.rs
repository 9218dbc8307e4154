//! PostgreSQL backend integration tests.
//!
//! These tests need a disposable PostgreSQL database. Set `DATABASE_URL`
//! to point at it.
//!
//! Run with: cargo test -p wallet-store --test postgres -- --ignored

use std::time::Duration;

use rust_decimal::Decimal;
use sqlx::PgPool;

use wallet_core::{LedgerEntry, UserId};
use wallet_store::{
    connect, migrate, LedgerReader, LedgerWriter, PgLedger, PgWalletStore, StoreError,
    TransactionScope, WalletStore,
};

async fn setup() -> (PgPool, PgWalletStore, PgLedger) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = connect(&url, 5).await.expect("Failed to connect");
    migrate(&pool).await.expect("Failed to migrate");

    let wallets = PgWalletStore::with_lock_timeout(pool.clone(), Duration::from_millis(300));
    let ledger = PgLedger::new(pool.clone());
    (pool, wallets, ledger)
}

fn money(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn create_and_read_wallet() {
    let (_pool, wallets, _ledger) = setup().await;
    let user_id = UserId::generate();

    let created = wallets.create_wallet(&user_id, money("100.00")).await.unwrap();
    let read = wallets.get_by_user_id(&user_id).await.unwrap();

    assert_eq!(read.id, created.id);
    assert_eq!(read.balance, money("100.00"));

    let err = wallets
        .create_wallet(&user_id, Decimal::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate { .. }));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn unknown_user_is_not_found() {
    let (_pool, wallets, _ledger) = setup().await;
    let err = wallets.get_by_user_id(&UserId::generate()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn commit_makes_balance_and_entry_durable() {
    let (_pool, wallets, ledger) = setup().await;
    let user_id = UserId::generate();
    let wallet = wallets.create_wallet(&user_id, money("100.00")).await.unwrap();

    let mut scope = wallets.begin().await.unwrap();
    let locked = wallets.get_by_user_id_locked(&user_id, &mut scope).await.unwrap();
    let updated_at = wallets
        .update_balance(&locked.id, money("60.00"), &mut scope)
        .await
        .unwrap();
    ledger
        .append(&LedgerEntry::withdrawal(locked.id, money("40.00")), &mut scope)
        .await
        .unwrap();
    scope.commit().await.unwrap();

    let after = wallets.get_by_user_id(&user_id).await.unwrap();
    assert_eq!(after.balance, money("60.00"));
    assert_eq!(after.updated_at, updated_at);

    let entries = ledger.list_by_wallet(&wallet.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].amount, money("40.00"));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn dropped_scope_rolls_back() {
    let (_pool, wallets, ledger) = setup().await;
    let user_id = UserId::generate();
    let wallet = wallets.create_wallet(&user_id, money("10.00")).await.unwrap();

    {
        let mut scope = wallets.begin().await.unwrap();
        wallets.get_by_user_id_locked(&user_id, &mut scope).await.unwrap();
        wallets
            .update_balance(&wallet.id, money("1.00"), &mut scope)
            .await
            .unwrap();
        ledger
            .append(&LedgerEntry::withdrawal(wallet.id, money("9.00")), &mut scope)
            .await
            .unwrap();
    }

    assert_eq!(
        wallets.get_by_user_id(&user_id).await.unwrap().balance,
        money("10.00")
    );
    assert!(ledger.list_by_wallet(&wallet.id, 10, 0).await.unwrap().is_empty());

    // The row lock was released with the dropped scope.
    let mut scope = wallets.begin().await.unwrap();
    wallets.get_by_user_id_locked(&user_id, &mut scope).await.unwrap();
    scope.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn second_locker_hits_lock_timeout() {
    let (_pool, wallets, _ledger) = setup().await;
    let user_id = UserId::generate();
    wallets.create_wallet(&user_id, money("10.00")).await.unwrap();

    let mut holder = wallets.begin().await.unwrap();
    wallets.get_by_user_id_locked(&user_id, &mut holder).await.unwrap();

    let mut waiter = wallets.begin().await.unwrap();
    let err = wallets
        .get_by_user_id_locked(&user_id, &mut waiter)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout));

    holder.rollback().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn negative_balance_violates_check_constraint() {
    let (_pool, wallets, _ledger) = setup().await;
    let user_id = UserId::generate();
    let wallet = wallets.create_wallet(&user_id, money("1.00")).await.unwrap();

    let mut scope = wallets.begin().await.unwrap();
    let err = wallets
        .update_balance(&wallet.id, money("-1.00"), &mut scope)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn updated_at_advances_across_interleaved_scopes() {
    let (_pool, wallets, _ledger) = setup().await;
    let user_id = UserId::generate();
    let wallet = wallets.create_wallet(&user_id, money("100.00")).await.unwrap();

    // The later committer opens its transaction first.
    let mut late = wallets.begin().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut early = wallets.begin().await.unwrap();
    wallets.get_by_user_id_locked(&user_id, &mut early).await.unwrap();
    let first = wallets
        .update_balance(&wallet.id, money("99.00"), &mut early)
        .await
        .unwrap();
    early.commit().await.unwrap();

    let locked = wallets.get_by_user_id_locked(&user_id, &mut late).await.unwrap();
    assert_eq!(locked.balance, money("99.00"));
    let second = wallets
        .update_balance(&wallet.id, money("98.00"), &mut late)
        .await
        .unwrap();
    late.commit().await.unwrap();

    assert!(second >= first, "updated_at went from {first} to {second}");
    let stored = wallets.get_by_user_id(&user_id).await.unwrap();
    assert_eq!(stored.updated_at, second);
    assert_eq!(stored.balance, money("98.00"));
}
