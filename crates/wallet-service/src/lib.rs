//! Wallet ledger HTTP API service.
//!
//! This crate provides the HTTP API for the wallet ledger, including:
//!
//! - Balance lookups
//! - Atomic withdrawals (balance update and ledger entry in one transaction)
//! - Per-wallet transaction history
//!
//! Storage is pluggable through [`WalletOperations`]: PostgreSQL in
//! production, or an in-process store for tests and local runs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler is async for routing

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod service;
pub mod state;

pub use config::{SeedWallet, ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use service::{WalletOperations, WalletService};
pub use state::AppState;
