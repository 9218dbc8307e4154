//! Application state.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::service::WalletOperations;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Wallet operations over the configured storage backend.
    pub wallets: Arc<dyn WalletOperations>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(wallets: Arc<dyn WalletOperations>, config: ServiceConfig) -> Self {
        Self { wallets, config }
    }
}
