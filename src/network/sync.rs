//! Peer fan-out and chain selection
//!
//! Notifications go to every known peer and are best effort: one peer
//! failing never stops the rest, and every failure is reported back.

use crate::core::{Block, BlockchainError};
use crate::network::client::PeerError;
use std::fmt;
use std::future::Future;

/// One peer call that did not succeed
#[derive(Debug)]
pub struct PeerFailure {
    pub peer: String,
    pub error: PeerError,
}

impl fmt::Display for PeerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.peer, self.error)
    }
}

/// Outcome of calling a set of peers
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub succeeded: Vec<String>,
    pub failures: Vec<PeerFailure>,
}

impl BroadcastReport {
    pub fn record(&mut self, peer: &str, result: Result<(), PeerError>) {
        match result {
            Ok(()) => self.succeeded.push(peer.to_string()),
            Err(error) => {
                log::warn!("Peer call to {} failed: {}", peer, error);
                self.failures.push(PeerFailure {
                    peer: peer.to_string(),
                    error,
                });
            }
        }
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures rendered as `peer: error` strings
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.to_string()).collect()
    }
}

/// Call every peer in order, collecting successes and failures
pub async fn broadcast<'a, F, Fut>(peers: &'a [String], mut call: F) -> BroadcastReport
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<(), PeerError>>,
{
    let mut report = BroadcastReport::default();
    for peer in peers {
        let result = call(peer.as_str()).await;
        report.record(peer, result);
    }
    report
}

/// Running pick of the longest valid chain seen so far
///
/// Only a chain strictly longer than the current best is considered, so
/// among equal lengths the first one offered wins.
#[derive(Debug)]
pub struct LongestChain {
    length: usize,
    best: Option<(String, Vec<Block>)>,
}

impl LongestChain {
    /// Start from the length of our own chain
    pub fn new(current_length: usize) -> Self {
        Self {
            length: current_length,
            best: None,
        }
    }

    /// Offer a peer's chain. Returns whether it became the new best.
    ///
    /// A longer chain that fails `validate` is an error for that peer;
    /// a chain that is not longer is silently ignored.
    pub fn offer<V>(&mut self, peer: &str, chain: Vec<Block>, validate: V) -> Result<bool, PeerError>
    where
        V: FnOnce(&[Block]) -> Result<bool, BlockchainError>,
    {
        if chain.len() <= self.length {
            return Ok(false);
        }
        if !validate(&chain)? {
            return Err(PeerError::ChainRejected);
        }

        log::debug!("Chain from {} is the longest so far ({} blocks)", peer, chain.len());
        self.length = chain.len();
        self.best = Some((peer.to_string(), chain));
        Ok(true)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// The winning peer and its chain, if any beat the starting length
    pub fn into_best(self) -> Option<(String, Vec<Block>)> {
        self.best
    }
}
