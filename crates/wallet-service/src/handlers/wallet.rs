//! Wallet balance, withdrawal and history handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use wallet_core::{Decimal, LedgerEntry, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Maximum page size for the transaction history.
const MAX_TRANSACTIONS_LIMIT: usize = 100;

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid user id".into()))
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Owning user.
    pub user_id: UserId,
    /// Current balance.
    pub balance: Decimal,
}

/// Get a user's balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let wallet = state.wallets.get_balance(&user_id).await?;

    Ok(Json(BalanceResponse {
        user_id: wallet.user_id,
        balance: wallet.balance,
    }))
}

/// Withdraw request.
#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    /// User whose wallet is debited.
    pub user_id: String,
    /// Amount to withdraw.
    pub amount: Decimal,
}

/// Withdraw response.
#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Owning user.
    pub user_id: UserId,
    /// Balance after the withdrawal.
    pub new_balance: Decimal,
}

/// Withdraw from a user's wallet.
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Json(body): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    tracing::debug!(user_id = %user_id, amount = %body.amount, "Processing withdrawal");

    let wallet = state.wallets.withdraw(&user_id, body.amount).await?;

    Ok(Json(WithdrawResponse {
        message: "withdrawal successful".to_string(),
        user_id: wallet.user_id,
        new_balance: wallet.balance,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Wallet the entry belongs to.
    pub wallet_id: String,
    /// Amount moved.
    pub amount: Decimal,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Transaction status.
    pub status: String,
    /// Reference token.
    pub reference_id: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for TransactionResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            wallet_id: entry.wallet_id.to_string(),
            amount: entry.amount,
            transaction_type: entry.transaction_type.to_string(),
            status: entry.status.to_string(),
            reference_id: entry.reference_id.to_string(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List a user's transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(MAX_TRANSACTIONS_LIMIT);
    let entries = state
        .wallets
        .list_transactions(&user_id, limit + 1, query.offset)
        .await?;

    let has_more = entries.len() > limit;
    let transactions = entries
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}
