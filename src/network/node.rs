//! Ledger node
//!
//! Owns one ledger and the peer book, and coordinates everything that
//! touches both: mining with peer notification, consensus resolution,
//! neighbor refresh and transaction admission.

use crate::core::{
    Block, BlockError, Blockchain, BlockchainError, LedgerConfig, MineOutcome, Transaction,
    TransactionError, TransactionRequest,
};
use crate::crypto::KeyError;
use crate::mining::{BlockTemplate, MinedBlock};
use crate::network::client::{HttpPeerClient, PeerClient, DEFAULT_PEER_TIMEOUT};
use crate::network::discovery::{
    DiscoveryError, NeighborScan, DEFAULT_NEIGHBOR_IPS, DEFAULT_NEIGHBOR_PORTS,
    DEFAULT_PROBE_TIMEOUT,
};
use crate::network::sync::{broadcast, BroadcastReport, LongestChain};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Default port for the HTTP surface
pub const DEFAULT_PORT: u16 = 5000;

/// Default period of the auto-mine and peer-sync schedulers
pub const DEFAULT_JOB_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("Transaction rejected: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] BlockchainError),
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("Mining task failed: {0}")]
    Task(String),
}

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host this node advertises and scans around
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Address credited with mining rewards
    pub miner_address: String,
    pub ledger: LedgerConfig,
    /// Offsets added to our last IPv4 octet during discovery
    pub neighbor_ips: RangeInclusive<u8>,
    /// Ports probed on each candidate host
    pub neighbor_ports: RangeInclusive<u16>,
    pub probe_timeout: Duration,
    /// Bound on each HTTP call to a peer
    pub peer_timeout: Duration,
    pub mine_interval: Duration,
    pub sync_interval: Duration,
    /// Peers kept in the book regardless of discovery
    pub bootstrap_peers: Vec<String>,
}

impl NodeConfig {
    /// `host:port` as peers reach us
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn neighbor_scan(&self) -> NeighborScan {
        NeighborScan {
            ip_offsets: self.neighbor_ips.clone(),
            ports: self.neighbor_ports.clone(),
            timeout: self.probe_timeout,
            ..NeighborScan::new(&self.host, self.port)
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            miner_address: String::new(),
            ledger: LedgerConfig::default(),
            neighbor_ips: DEFAULT_NEIGHBOR_IPS,
            neighbor_ports: DEFAULT_NEIGHBOR_PORTS,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            mine_interval: DEFAULT_JOB_INTERVAL,
            sync_interval: DEFAULT_JOB_INTERVAL,
            bootstrap_peers: Vec::new(),
        }
    }
}

/// Result of a mining round, including the peer notifications
#[derive(Debug)]
pub struct MineReport {
    pub outcome: MineOutcome,
    pub truncated: BroadcastReport,
    pub consensus: BroadcastReport,
}

impl MineReport {
    fn skipped() -> Self {
        Self {
            outcome: MineOutcome::skipped(),
            truncated: BroadcastReport::default(),
            consensus: BroadcastReport::default(),
        }
    }

    /// Peers that accepted the consensus request
    pub fn notified(&self) -> usize {
        self.consensus.succeeded.len()
    }

    pub fn failure_messages(&self) -> Vec<String> {
        let mut messages = self.truncated.failure_messages();
        messages.extend(self.consensus.failure_messages());
        messages
    }
}

impl fmt::Display for MineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.outcome.mined {
            return write!(f, "pool empty, nothing mined");
        }
        write!(
            f,
            "mined block at {}, notified {} peers ({} failures)",
            self.outcome.timestamp,
            self.notified(),
            self.truncated.failures.len() + self.consensus.failures.len()
        )
    }
}

/// Result of consensus resolution
#[derive(Debug, Default)]
pub struct Resolution {
    pub replaced: bool,
    /// Per-peer fetch and validation results
    pub report: BroadcastReport,
}

/// A ledger node
pub struct Node<C: PeerClient = HttpPeerClient> {
    config: NodeConfig,
    blockchain: RwLock<Blockchain>,
    /// Serializes mining rounds
    mining: Mutex<()>,
    peers: RwLock<Vec<String>>,
    /// Serializes neighbor refreshes
    refreshing: Mutex<()>,
    client: C,
}

impl Node<HttpPeerClient> {
    /// Create a node that talks to peers over HTTP
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let client = HttpPeerClient::new(config.peer_timeout);
        Self::with_client(config, client)
    }
}

impl<C: PeerClient> Node<C> {
    pub fn with_client(config: NodeConfig, client: C) -> Result<Self, NodeError> {
        let blockchain = Blockchain::with_config(&config.miner_address, config.ledger.clone())?;
        let peers = config.bootstrap_peers.clone();

        Ok(Self {
            config,
            blockchain: RwLock::new(blockchain),
            mining: Mutex::new(()),
            peers: RwLock::new(peers),
            refreshing: Mutex::new(()),
            client,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    // =========================================================================
    // Ledger access
    // =========================================================================

    pub async fn chain(&self) -> Vec<Block> {
        self.blockchain.read().await.chain().to_vec()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.blockchain.read().await.transactions().to_vec()
    }

    /// Drop the pending pool, returning how many transactions were discarded
    pub async fn truncate_pool(&self) -> usize {
        let dropped = self.blockchain.write().await.truncate_pool();
        log::info!("Pool truncated ({} transactions dropped)", dropped);
        dropped
    }

    pub async fn calculate_balance(&self, address: &str) -> f64 {
        self.blockchain.read().await.calculate_balance(address)
    }

    /// Verify and admit a signed transfer locally, without forwarding it
    pub async fn add_transaction(&self, request: &TransactionRequest) -> Result<(), NodeError> {
        let (public_key, signature) = request.credentials()?;
        self.blockchain.write().await.add_transaction(
            &request.sender_blockchain_address,
            &request.recipient_blockchain_address,
            request.value,
            Some(&public_key),
            Some(&signature),
        )?;
        Ok(())
    }

    /// Admit a signed transfer locally, then forward it to every peer.
    ///
    /// Forwarding is best effort; the report lists peers that missed it.
    pub async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<BroadcastReport, NodeError> {
        self.add_transaction(request).await?;

        let peers = self.peers().await;
        let report = broadcast(&peers, |peer| self.client.forward_transaction(peer, request)).await;
        log::info!(
            "Transaction {} -> {} forwarded to {}/{} peers",
            request.sender_blockchain_address,
            request.recipient_blockchain_address,
            report.succeeded.len(),
            report.attempted()
        );
        Ok(report)
    }

    // =========================================================================
    // Mining and consensus
    // =========================================================================

    /// Mine the pending pool into a block, then ask every peer to drop
    /// its pool and re-run consensus.
    ///
    /// The proof-of-work search runs on the blocking pool with no ledger
    /// lock held, so transactions can still be admitted meanwhile; those
    /// stay pending for the next round.
    pub async fn mine(&self) -> Result<MineReport, NodeError> {
        self.mine_with(BlockTemplate::solve).await
    }

    async fn mine_with<F>(&self, solve: F) -> Result<MineReport, NodeError>
    where
        F: FnOnce(BlockTemplate) -> Result<MinedBlock, BlockError> + Send + 'static,
    {
        let outcome = {
            let _round = self.mining.lock().await;

            let template = self.blockchain.read().await.prepare_block()?;
            let Some(template) = template else {
                return Ok(MineReport::skipped());
            };

            let mined = tokio::task::spawn_blocking(move || solve(template))
                .await
                .map_err(|e| NodeError::Task(e.to_string()))?
                .map_err(BlockchainError::from)?;

            self.blockchain.write().await.commit_block(mined)?
        };

        let peers = self.peers().await;
        let truncated = broadcast(&peers, |peer| self.client.truncate_pool(peer)).await;
        let consensus = broadcast(&peers, |peer| self.client.request_consensus(peer)).await;

        Ok(MineReport {
            outcome,
            truncated,
            consensus,
        })
    }

    /// Adopt the longest valid peer chain, if strictly longer than ours.
    ///
    /// Unreachable peers and invalid chains are recorded in the report and
    /// skipped.
    pub async fn resolve_conflicts(&self) -> Result<Resolution, NodeError> {
        let peers = self.peers().await;
        let mut longest = LongestChain::new(self.blockchain.read().await.len());
        let mut report = BroadcastReport::default();

        for peer in &peers {
            let result = match self.client.fetch_chain(peer).await {
                Ok(chain) => {
                    let blockchain = self.blockchain.read().await;
                    longest
                        .offer(peer, chain, |candidate| blockchain.valid_chain(candidate))
                        .map(|_| ())
                }
                Err(e) => Err(e),
            };
            report.record(peer, result);
        }

        let mut replaced = false;
        if let Some((peer, chain)) = longest.into_best() {
            let mut blockchain = self.blockchain.write().await;
            // Our chain may have grown while peers were being queried
            if chain.len() > blockchain.len() {
                let length = chain.len();
                blockchain.set_chain(chain)?;
                replaced = true;
                log::info!("Chain replaced with {} blocks from {}", length, peer);
            }
        }

        if !replaced {
            log::debug!("Consensus kept the local chain");
        }
        Ok(Resolution { replaced, report })
    }

    // =========================================================================
    // Peer book
    // =========================================================================

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.clone()
    }

    pub async fn set_peers(&self, peers: Vec<String>) {
        *self.peers.write().await = peers;
    }

    /// Rescan the neighbor window and replace the peer book with what
    /// answered, plus the bootstrap peers.
    pub async fn refresh_peers(&self) -> Result<usize, NodeError> {
        let _refresh = self.refreshing.lock().await;

        let mut peers = self.config.neighbor_scan().find_neighbors().await?;
        for bootstrap in &self.config.bootstrap_peers {
            if !peers.contains(bootstrap) {
                peers.push(bootstrap.clone());
            }
        }

        let count = peers.len();
        log::debug!("Peer book: {:?}", peers);
        self.set_peers(peers).await;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::REWARD_SENDER;
    use crate::network::client::testing::StubPeerClient;
    use crate::wallet::Wallet;
    use std::sync::Arc;

    fn test_config() -> NodeConfig {
        NodeConfig {
            miner_address: "miner".to_string(),
            ledger: LedgerConfig {
                difficulty: 1,
                ..LedgerConfig::default()
            },
            ..NodeConfig::default()
        }
    }

    fn stub_node(peers: &[&str]) -> Node<StubPeerClient> {
        let node = Node::with_client(test_config(), StubPeerClient::new()).unwrap();
        *node.peers.try_write().unwrap() = peers.iter().map(|p| p.to_string()).collect();
        node
    }

    /// A chain of `blocks` mined blocks on top of genesis
    fn peer_chain(blocks: usize) -> Vec<Block> {
        let mut blockchain = Blockchain::with_config("peer-miner", test_config().ledger).unwrap();
        for _ in 0..blocks {
            blockchain
                .add_transaction(REWARD_SENDER, "someone", 1.0, None, None)
                .unwrap();
            blockchain.mine().unwrap();
        }
        blockchain.chain().to_vec()
    }

    #[tokio::test]
    async fn test_mine_empty_pool_skips_notifications() {
        let node = stub_node(&["peer-a"]);

        let report = node.mine().await.unwrap();

        assert!(!report.outcome.mined);
        assert_eq!(report.outcome.timestamp, 0);
        assert_eq!(node.chain().await.len(), 1);
        assert!(node.client().calls("truncate_pool").is_empty());
        assert!(node.client().calls("request_consensus").is_empty());
    }

    #[tokio::test]
    async fn test_mine_notifies_all_peers_despite_failures() {
        let node = stub_node(&["peer-a", "peer-b", "peer-c"]);
        node.client().fail("peer-b");

        let wallet = Wallet::new();
        let request = wallet.sign_transfer("recipient", 2.0).unwrap();
        node.add_transaction(&request).await.unwrap();

        let report = node.mine().await.unwrap();

        assert!(report.outcome.mined);
        assert_eq!(node.chain().await.len(), 2);
        assert!(node.transactions().await.is_empty());
        assert_eq!(
            node.client().calls("request_consensus"),
            vec!["peer-a", "peer-b", "peer-c"]
        );
        assert_eq!(node.client().calls("truncate_pool").len(), 3);
        assert_eq!(report.notified(), 2);
        assert_eq!(report.failure_messages().len(), 2);
        assert_eq!(node.calculate_balance("recipient").await, 2.0);
    }

    #[tokio::test]
    async fn test_concurrent_mines_produce_one_block() {
        let node = Arc::new(stub_node(&[]));
        let request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();
        node.add_transaction(&request).await.unwrap();

        let (first, second) = tokio::join!(node.mine(), node.mine());
        let mined = [first.unwrap(), second.unwrap()]
            .iter()
            .filter(|r| r.outcome.mined)
            .count();

        assert_eq!(mined, 1);
        assert_eq!(node.chain().await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_chain_replaced_during_mining_discards_block() {
        let node = stub_node(&["peer-a"]);
        let longer = peer_chain(2);
        node.client().set_chain("peer-a", longer.clone());
        let request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();
        node.add_transaction(&request).await.unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (go_tx, go_rx) = std::sync::mpsc::channel::<()>();
        let solver = move |template: BlockTemplate| {
            let _ = started_tx.send(());
            let _ = go_rx.recv();
            template.solve()
        };

        let (mined, resolution) = tokio::join!(node.mine_with(solver), async {
            started_rx.await.unwrap();
            let resolution = node.resolve_conflicts().await;
            go_tx.send(()).unwrap();
            resolution
        });

        assert!(resolution.unwrap().replaced);
        assert!(matches!(
            mined,
            Err(NodeError::Ledger(BlockchainError::StaleBlock))
        ));
        assert_eq!(node.chain().await, longer);
        assert_eq!(node.transactions().await.len(), 1);
        assert!(node.client().calls("truncate_pool").is_empty());
    }

    #[tokio::test]
    async fn test_equal_length_chains_not_replaced() {
        let node = stub_node(&["peer-a"]);
        let request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();
        node.add_transaction(&request).await.unwrap();
        node.mine().await.unwrap();
        let ours = node.chain().await;

        node.client().set_chain("peer-a", peer_chain(1));
        let resolution = node.resolve_conflicts().await.unwrap();

        assert!(!resolution.replaced);
        assert!(resolution.report.is_clean());
        assert_eq!(node.chain().await, ours);
    }

    #[tokio::test]
    async fn test_longer_valid_chain_replaces_ours() {
        let node = stub_node(&["peer-a", "peer-b", "peer-c"]);
        let longest = peer_chain(3);
        node.client().set_chain("peer-a", peer_chain(1));
        node.client().fail("peer-b");
        node.client().set_chain("peer-c", longest.clone());

        let resolution = node.resolve_conflicts().await.unwrap();

        assert!(resolution.replaced);
        assert_eq!(resolution.report.failures.len(), 1);
        assert_eq!(resolution.report.failures[0].peer, "peer-b");
        assert_eq!(node.chain().await, longest);
        assert_eq!(node.calculate_balance("peer-miner").await, 3.0 * 0.0001);
    }

    #[tokio::test]
    async fn test_longer_invalid_chain_rejected() {
        let node = stub_node(&["peer-a"]);
        let mut forged = peer_chain(2);
        forged[1].transactions[0].value = 1_000.0;
        node.client().set_chain("peer-a", forged);

        let resolution = node.resolve_conflicts().await.unwrap();

        assert!(!resolution.replaced);
        assert_eq!(resolution.report.failures.len(), 1);
        assert_eq!(node.chain().await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_transaction_forwards_to_peers() {
        let node = stub_node(&["peer-a", "peer-b"]);
        let request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();

        let report = node.create_transaction(&request).await.unwrap();

        assert_eq!(report.succeeded, vec!["peer-a", "peer-b"]);
        assert_eq!(node.transactions().await.len(), 1);
        assert_eq!(node.transactions().await[0], request.transaction());
    }

    #[tokio::test]
    async fn test_malformed_signature_leaves_pool_unchanged() {
        let node = stub_node(&["peer-a"]);
        let mut request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();
        request.signature = "zz".repeat(64);

        let result = node.create_transaction(&request).await;

        assert!(matches!(result, Err(NodeError::Crypto(_))));
        assert!(node.transactions().await.is_empty());
        assert!(node.client().calls("forward_transaction").is_empty());
    }

    #[tokio::test]
    async fn test_tampered_value_rejected() {
        let node = stub_node(&[]);
        let mut request = Wallet::new().sign_transfer("recipient", 1.0).unwrap();
        request.value = 5.0;

        let result = node.add_transaction(&request).await;

        assert!(matches!(
            result,
            Err(NodeError::Transaction(TransactionError::InvalidSignature))
        ));
        assert!(node.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_truncate_pool() {
        let node = stub_node(&[]);
        let wallet = Wallet::new();
        for value in [1.0, 2.0] {
            let request = wallet.sign_transfer("recipient", value).unwrap();
            node.add_transaction(&request).await.unwrap();
        }

        assert_eq!(node.truncate_pool().await, 2);
        assert!(node.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_peer_book() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let own = if open > 1024 { open - 1 } else { open + 1 };

        let config = NodeConfig {
            host: "127.0.0.1".to_string(),
            port: own,
            neighbor_ips: 0..=0,
            neighbor_ports: open.min(own)..=open.max(own),
            probe_timeout: Duration::from_millis(500),
            bootstrap_peers: vec!["10.1.2.3:5000".to_string()],
            ..test_config()
        };
        let node = Node::with_client(config, StubPeerClient::new()).unwrap();
        node.set_peers(vec!["stale:1".to_string()]).await;

        let count = node.refresh_peers().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            node.peers().await,
            vec![format!("127.0.0.1:{}", open), "10.1.2.3:5000".to_string()]
        );
    }
}
