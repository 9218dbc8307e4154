//! Common test utilities for wallet service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;

use wallet_core::{Decimal, UserId, Wallet};
use wallet_service::{create_router, AppState, ServiceConfig, StorageBackend, WalletService};
use wallet_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for seeding wallets directly.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Create a new test harness with an empty in-memory store.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            storage_backend: StorageBackend::Memory,
            ..ServiceConfig::default()
        };

        let service = WalletService::new(Arc::clone(&store), Arc::clone(&store));
        let state = AppState::new(Arc::new(service), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Create a wallet for a fresh user with the given balance.
    pub fn funded_wallet(&self, balance: &str) -> Wallet {
        let balance: Decimal = balance.parse().expect("valid balance");
        let wallet = Wallet::new(UserId::generate(), balance);
        self.store
            .insert_wallet(wallet.clone())
            .expect("Failed to insert wallet");
        wallet
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
