//! Core types for the wallet ledger.
//!
//! This crate provides the types shared by the store and service crates:
//!
//! - **Identifiers**: `UserId`, `WalletId`, `TransactionId`, `ReferenceId`
//! - **Wallets**: `Wallet`, amount validation
//! - **Ledger**: `LedgerEntry`, `TransactionType`, `TransactionStatus`
//! - **Errors**: `WalletError`
//!
//! # Money
//!
//! Amounts are `rust_decimal::Decimal` with two fractional digits. Balances
//! never go negative and ledger amounts are always positive.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod ledger;
pub mod wallet;

pub use error::{Result, WalletError};
pub use ids::{IdError, ReferenceId, TransactionId, UserId, WalletId};
pub use ledger::{LedgerEntry, TransactionStatus, TransactionType, UnknownVariant};
pub use rust_decimal::Decimal;
pub use wallet::{validate_amount, Wallet, MONEY_SCALE};
