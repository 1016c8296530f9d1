//! HTTP handlers over the node's operations

use crate::core::{Transaction, TransactionError, TransactionRequest};
use crate::network::{ChainResponse, Node, NodeError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared application state for API handlers
pub type ApiState = Arc<Node>;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    /// Peers that accepted the forwarded transaction
    pub forwarded: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TruncateResponse {
    pub truncated: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub timestamp: i64,
    pub mined: bool,
    pub notified: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsensusResponse {
    pub replaced: bool,
    pub failures: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountResponse {
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AmountQuery {
    pub blockchain_address: String,
}

fn error_response(err: NodeError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        NodeError::Crypto(_) => StatusCode::BAD_REQUEST,
        NodeError::Transaction(TransactionError::Serialization(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        NodeError::Transaction(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::warn!("Request failed ({}): {}", status, err);

    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /chain - Full chain
pub async fn get_chain(State(node): State<ApiState>) -> Json<ChainResponse> {
    Json(ChainResponse {
        chain: node.chain().await,
    })
}

/// GET /transactions - Pending pool
pub async fn get_transactions(State(node): State<ApiState>) -> Json<TransactionsResponse> {
    let transactions = node.transactions().await;
    Json(TransactionsResponse {
        length: transactions.len(),
        transactions,
    })
}

/// POST /transactions - Admit a signed transfer and forward it to peers
pub async fn create_transaction(
    State(node): State<ApiState>,
    Json(request): Json<TransactionRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let report = node
        .create_transaction(&request)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "success".to_string(),
            forwarded: report.succeeded.len(),
            failures: report.failure_messages(),
        }),
    ))
}

/// PUT /transactions - Admit a transfer forwarded by a peer
pub async fn add_transaction(
    State(node): State<ApiState>,
    Json(request): Json<TransactionRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    node.add_transaction(&request)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "success".to_string(),
            forwarded: 0,
            failures: Vec::new(),
        }),
    ))
}

/// DELETE /transactions - Drop the pending pool
pub async fn truncate_pool(State(node): State<ApiState>) -> Json<TruncateResponse> {
    Json(TruncateResponse {
        truncated: node.truncate_pool().await,
    })
}

/// POST /mine - Mine the pool now
pub async fn mine(State(node): State<ApiState>) -> ApiResult<Json<MineResponse>> {
    let report = node.mine().await.map_err(error_response)?;

    Ok(Json(MineResponse {
        timestamp: report.outcome.timestamp,
        mined: report.outcome.mined,
        notified: report.notified(),
        failures: report.failure_messages(),
    }))
}

/// PUT /consensus - Adopt the longest valid peer chain
pub async fn resolve_conflicts(State(node): State<ApiState>) -> ApiResult<Json<ConsensusResponse>> {
    let resolution = node.resolve_conflicts().await.map_err(error_response)?;

    Ok(Json(ConsensusResponse {
        replaced: resolution.replaced,
        failures: resolution.report.failure_messages(),
    }))
}

/// GET /amount?blockchain_address= - Confirmed balance
pub async fn get_amount(
    State(node): State<ApiState>,
    Query(query): Query<AmountQuery>,
) -> Json<AmountResponse> {
    Json(AmountResponse {
        amount: node.calculate_balance(&query.blockchain_address).await,
    })
}

/// GET /peers - Current peer book
pub async fn get_peers(State(node): State<ApiState>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: node.peers().await,
    })
}
