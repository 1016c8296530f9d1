//! HTTP API module
//!
//! One surface for wallets and peers alike.
//!
//! # Endpoints
//!
//! ## Ledger
//! - `GET /chain` - Full chain
//! - `GET /amount?blockchain_address=` - Confirmed balance
//!
//! ## Pending pool
//! - `GET /transactions` - List pending transactions
//! - `POST /transactions` - Submit a signed transfer (forwarded to peers)
//! - `PUT /transactions` - Accept a transfer forwarded by a peer
//! - `DELETE /transactions` - Drop the pool
//!
//! ## Mining and consensus
//! - `POST /mine` - Mine now and notify peers
//! - `PUT /consensus` - Adopt the longest valid peer chain
//!
//! ## Peers
//! - `GET /peers` - Current peer book

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, ApiState};
pub use routes::create_router;
