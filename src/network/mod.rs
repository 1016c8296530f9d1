//! Peer networking
//!
//! Nodes talk to each other over the same HTTP surface clients use.
//!
//! # Features
//! - Neighbor discovery by probing a local address window
//! - Best-effort fan-out with per-peer failure reporting
//! - Longest-valid-chain consensus
//! - Transaction forwarding

pub mod client;
pub mod discovery;
pub mod node;
pub mod sync;

pub use client::{ChainResponse, HttpPeerClient, PeerClient, PeerError, DEFAULT_PEER_TIMEOUT};
pub use discovery::{
    is_found_host, local_host, DiscoveryError, NeighborScan, DEFAULT_NEIGHBOR_IPS,
    DEFAULT_NEIGHBOR_PORTS, DEFAULT_PROBE_TIMEOUT,
};
pub use node::{
    MineReport, Node, NodeConfig, NodeError, Resolution, DEFAULT_JOB_INTERVAL, DEFAULT_PORT,
};
pub use sync::{broadcast, BroadcastReport, LongestChain, PeerFailure};
