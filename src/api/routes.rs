//! HTTP routes configuration

use crate::api::handlers::{self, ApiState};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the router serving clients and peers alike
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Ledger
        .route("/chain", get(handlers::get_chain))
        .route("/amount", get(handlers::get_amount))
        // Pending pool
        .route(
            "/transactions",
            get(handlers::get_transactions)
                .post(handlers::create_transaction)
                .put(handlers::add_transaction)
                .delete(handlers::truncate_pool),
        )
        // Mining and consensus
        .route("/mine", post(handlers::mine))
        .route("/consensus", put(handlers::resolve_conflicts))
        // Peers
        .route("/peers", get(handlers::get_peers))
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::{
        AmountResponse, ConsensusResponse, CreatedResponse, MineResponse, TransactionsResponse,
    };
    use crate::core::LedgerConfig;
    use crate::network::{ChainResponse, HttpPeerClient, Node, NodeConfig, PeerError};
    use crate::wallet::Wallet;
    use serde::de::DeserializeOwned;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn spawn_node() -> (Arc<Node>, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let config = NodeConfig {
            port: listener.local_addr().unwrap().port(),
            miner_address: Wallet::new().address().to_string(),
            ledger: LedgerConfig {
                difficulty: 1,
                ..LedgerConfig::default()
            },
            peer_timeout: Duration::from_secs(5),
            ..NodeConfig::default()
        };
        let node = Arc::new(Node::new(config).unwrap());
        let app = create_router(Arc::clone(&node));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (node, addr)
    }

    async fn call<T: DeserializeOwned>(method: &str, node: &str, path: &str) -> T {
        let body = HttpPeerClient::default()
            .request(method, node, path, None)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_transfer_mine_and_replicate() {
        let (node_a, addr_a) = spawn_node().await;
        let (node_b, addr_b) = spawn_node().await;
        node_a.set_peers(vec![addr_b.clone()]).await;
        node_b.set_peers(vec![addr_a.clone()]).await;

        let sender = Wallet::new();
        let recipient = Wallet::new();
        let request = sender.sign_transfer(recipient.address(), 1.0).unwrap();

        let body = HttpPeerClient::default()
            .submit_transaction(&addr_a, &request)
            .await
            .unwrap();
        let created: CreatedResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.forwarded, 1);
        assert!(created.failures.is_empty());

        // Forwarded to B without being sent back to A
        let pool_b: TransactionsResponse = call("GET", &addr_b, "/transactions").await;
        assert_eq!(pool_b.length, 1);
        let pool_a: TransactionsResponse = call("GET", &addr_a, "/transactions").await;
        assert_eq!(pool_a.length, 1);

        let mined: MineResponse = call("POST", &addr_a, "/mine").await;
        assert!(mined.mined);
        assert_eq!(mined.notified, 1);
        assert!(mined.failures.is_empty());

        let chain_a: ChainResponse = call("GET", &addr_a, "/chain").await;
        let chain_b: ChainResponse = call("GET", &addr_b, "/chain").await;
        assert_eq!(chain_a.chain.len(), 2);
        assert_eq!(chain_b.chain, chain_a.chain);

        let pool_b: TransactionsResponse = call("GET", &addr_b, "/transactions").await;
        assert_eq!(pool_b.length, 0);

        let path = format!("/amount?blockchain_address={}", recipient.address());
        let amount: AmountResponse = call("GET", &addr_b, &path).await;
        assert_eq!(amount.amount, 1.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bad_signature_is_client_error() {
        let (node, addr) = spawn_node().await;
        let mut request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();
        request.value = 2.0;

        let result = HttpPeerClient::default()
            .submit_transaction(&addr, &request)
            .await;

        match result {
            Err(PeerError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("error"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(node.transactions().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_consensus_reports_unreachable_peer() {
        let (node, addr) = spawn_node().await;
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap().to_string();
        drop(dead);
        node.set_peers(vec![dead_addr]).await;

        let resolution: ConsensusResponse = call("PUT", &addr, "/consensus").await;

        assert!(!resolution.replaced);
        assert_eq!(resolution.failures.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_health_and_empty_mine() {
        let (_node, addr) = spawn_node().await;

        let body = HttpPeerClient::default()
            .request("GET", &addr, "/health", None)
            .await
            .unwrap();
        assert_eq!(body, b"OK");

        let mined: MineResponse = call("POST", &addr, "/mine").await;
        assert!(!mined.mined);
        assert_eq!(mined.timestamp, 0);
    }
}
