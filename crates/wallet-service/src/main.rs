//! Wallet ledger service - HTTP API for balances and withdrawals.
//!
//! This is the main entry point for the wallet service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_core::Wallet;
use wallet_service::{
    create_router, AppState, ServiceConfig, StorageBackend, WalletOperations, WalletService,
};
use wallet_store::{MemoryStore, PgLedger, PgWalletStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wallet=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting wallet service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        storage_backend = ?config.storage_backend,
        lock_timeout_ms = config.lock_timeout.as_millis(),
        seed_wallets = config.seed_wallets.len(),
        "Service configuration loaded"
    );

    let wallets = match config.storage_backend {
        StorageBackend::Postgres => open_postgres(&config).await?,
        StorageBackend::Memory => open_memory(&config)?,
    };

    // Build app state
    let state = AppState::new(wallets, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Wallet service stopped");
    Ok(())
}

async fn open_postgres(
    config: &ServiceConfig,
) -> Result<Arc<dyn WalletOperations>, Box<dyn std::error::Error>> {
    tracing::info!(max_connections = config.db_max_connections, "Connecting to PostgreSQL");
    let pool = wallet_store::connect(&config.database_url, config.db_max_connections).await?;

    if config.run_migrations {
        wallet_store::migrate(&pool).await?;
    }

    let store = PgWalletStore::with_lock_timeout(pool.clone(), config.lock_timeout);
    for seed in &config.seed_wallets {
        match store.create_wallet(&seed.user_id, seed.balance).await {
            Ok(wallet) => {
                tracing::info!(
                    user_id = %wallet.user_id,
                    balance = %wallet.balance,
                    "Seeded wallet"
                );
            }
            Err(e) if e.is_duplicate() => {
                tracing::debug!(user_id = %seed.user_id, "Seed wallet already exists");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let ledger = PgLedger::new(pool);
    Ok(Arc::new(WalletService::new(Arc::new(store), Arc::new(ledger))))
}

fn open_memory(
    config: &ServiceConfig,
) -> Result<Arc<dyn WalletOperations>, Box<dyn std::error::Error>> {
    tracing::warn!("Using in-memory storage, data is lost on restart");
    let store = MemoryStore::with_lock_timeout(config.lock_timeout);

    for seed in &config.seed_wallets {
        match store.insert_wallet(Wallet::new(seed.user_id, seed.balance)) {
            Ok(()) => {
                tracing::info!(user_id = %seed.user_id, balance = %seed.balance, "Seeded wallet");
            }
            Err(e) if e.is_duplicate() => {
                tracing::debug!(user_id = %seed.user_id, "Seed wallet already exists");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let store = Arc::new(store);
    Ok(Arc::new(WalletService::new(Arc::clone(&store), store)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
