//! Peer client
//!
//! The calls a node makes against other nodes: fetch their chain, tell
//! them to drop a stale pool, ask them to re-run consensus, and forward a
//! signed transaction. `HttpPeerClient` speaks plain HTTP/1.1 over a
//! fresh TCP connection per call.

use crate::core::{Block, BlockchainError, TransactionRequest};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default bound on a single peer call
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(3);

/// Largest raw response accepted from a peer, headers included
pub const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Peer communication errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request to {0} timed out")]
    Timeout(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Malformed HTTP response: {0}")]
    InvalidResponse(String),
    #[error("Peer responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Candidate chain failed validation")]
    ChainRejected,
    #[error("Candidate chain could not be checked: {0}")]
    Validation(#[from] BlockchainError),
}

/// Wire envelope for a full chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
}

/// Operations a node invokes on its peers
pub trait PeerClient: Send + Sync + 'static {
    /// Download a peer's full chain
    fn fetch_chain(&self, peer: &str)
        -> impl Future<Output = Result<Vec<Block>, PeerError>> + Send;

    /// Ask a peer to discard its pending pool
    fn truncate_pool(&self, peer: &str) -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Ask a peer to run consensus resolution
    fn request_consensus(&self, peer: &str)
        -> impl Future<Output = Result<(), PeerError>> + Send;

    /// Hand a signed transaction to a peer without further re-broadcast
    fn forward_transaction(
        &self,
        peer: &str,
        request: &TransactionRequest,
    ) -> impl Future<Output = Result<(), PeerError>> + Send;
}

/// Minimal HTTP/1.1 peer client
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    timeout: Duration,
    max_response_bytes: u64,
}

impl HttpPeerClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    /// Submit a transfer to a node's public creation endpoint
    pub async fn submit_transaction(
        &self,
        node: &str,
        request: &TransactionRequest,
    ) -> Result<Vec<u8>, PeerError> {
        let body = serde_json::to_vec(request)?;
        self.request("POST", node, "/transactions", Some(body)).await
    }

    /// Send one request and return the body of a 2xx response
    pub async fn request(
        &self,
        method: &str,
        peer: &str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, PeerError> {
        tokio::time::timeout(self.timeout, self.exchange(method, peer, path, body))
            .await
            .map_err(|_| PeerError::Timeout(peer.to_string()))?
    }

    async fn exchange(
        &self,
        method: &str,
        peer: &str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, PeerError> {
        let mut stream = TcpStream::connect(peer)
            .await
            .map_err(|e| PeerError::ConnectionFailed(format!("{}: {}", peer, e)))?;

        let body = body.unwrap_or_default();
        let head = format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            method,
            path,
            peer,
            body.len()
        );
        stream.write_all(head.as_bytes()).await?;
        stream.write_all(&body).await?;

        let mut response = Vec::new();
        (&mut stream)
            .take(self.max_response_bytes + 1)
            .read_to_end(&mut response)
            .await?;
        if response.len() as u64 > self.max_response_bytes {
            return Err(PeerError::InvalidResponse(format!(
                "response exceeds {} bytes",
                self.max_response_bytes
            )));
        }

        log::debug!("{} {}{} -> {} bytes", method, peer, path, response.len());
        parse_response(&response)
    }
}

impl Default for HttpPeerClient {
    fn default() -> Self {
        Self::new(DEFAULT_PEER_TIMEOUT)
    }
}

impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
        let body = self.request("GET", peer, "/chain", None).await?;
        let response: ChainResponse = serde_json::from_slice(&body)?;
        Ok(response.chain)
    }

    async fn truncate_pool(&self, peer: &str) -> Result<(), PeerError> {
        self.request("DELETE", peer, "/transactions", None).await?;
        Ok(())
    }

    async fn request_consensus(&self, peer: &str) -> Result<(), PeerError> {
        self.request("PUT", peer, "/consensus", None).await?;
        Ok(())
    }

    async fn forward_transaction(
        &self,
        peer: &str,
        request: &TransactionRequest,
    ) -> Result<(), PeerError> {
        let body = serde_json::to_vec(request)?;
        self.request("PUT", peer, "/transactions", Some(body)).await?;
        Ok(())
    }
}

/// Split a raw HTTP response into status and body, rejecting non-2xx
fn parse_response(raw: &[u8]) -> Result<Vec<u8>, PeerError> {
    let split = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .ok_or_else(|| PeerError::InvalidResponse("missing header terminator".into()))?;

    let head = std::str::from_utf8(&raw[..split])
        .map_err(|_| PeerError::InvalidResponse("headers are not UTF-8".into()))?;
    let mut lines = head.split("\r\n");

    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| PeerError::InvalidResponse("bad status line".into()))?;

    let chunked = lines.any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("transfer-encoding:") && line.contains("chunked")
    });

    let raw_body = &raw[split + 4..];
    let body = if chunked {
        decode_chunked(raw_body)?
    } else {
        raw_body.to_vec()
    };

    if !(200..300).contains(&status) {
        return Err(PeerError::Status {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    Ok(body)
}

fn decode_chunked(mut raw: &[u8]) -> Result<Vec<u8>, PeerError> {
    let malformed = || PeerError::InvalidResponse("malformed chunked body".into());
    let mut body = Vec::new();

    loop {
        let line_end = raw
            .windows(2)
            .position(|window| window == b"\r\n")
            .ok_or_else(malformed)?;
        let size_field = std::str::from_utf8(&raw[..line_end]).map_err(|_| malformed())?;
        let size_hex = size_field.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| malformed())?;

        raw = &raw[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        let end = size.checked_add(2).ok_or_else(malformed)?;
        if raw.len() < end {
            return Err(malformed());
        }
        body.extend_from_slice(&raw[..size]);
        raw = &raw[end..];
    }
}

#[cfg(test)]
pub mod testing {
    //! In-process stand-in for remote peers.

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Records every call, serves canned chains, fails on demand
    #[derive(Default)]
    pub struct StubPeerClient {
        chains: Mutex<HashMap<String, Vec<Block>>>,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<(String, &'static str)>>,
    }

    impl StubPeerClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_chain(&self, peer: &str, chain: Vec<Block>) {
            self.chains.lock().unwrap().insert(peer.to_string(), chain);
        }

        /// Make every call to `peer` fail
        pub fn fail(&self, peer: &str) {
            self.failing.lock().unwrap().insert(peer.to_string());
        }

        /// Peers that received a call of the given kind, in call order
        pub fn calls(&self, kind: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, k)| *k == kind)
                .map(|(peer, _)| peer.clone())
                .collect()
        }

        fn record(&self, peer: &str, kind: &'static str) -> Result<(), PeerError> {
            self.calls.lock().unwrap().push((peer.to_string(), kind));
            if self.failing.lock().unwrap().contains(peer) {
                return Err(PeerError::ConnectionFailed(peer.to_string()));
            }
            Ok(())
        }
    }

    impl PeerClient for StubPeerClient {
        async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
            self.record(peer, "fetch_chain")?;
            self.chains
                .lock()
                .unwrap()
                .get(peer)
                .cloned()
                .ok_or_else(|| PeerError::ConnectionFailed(peer.to_string()))
        }

        async fn truncate_pool(&self, peer: &str) -> Result<(), PeerError> {
            self.record(peer, "truncate_pool")
        }

        async fn request_consensus(&self, peer: &str) -> Result<(), PeerError> {
            self.record(peer, "request_consensus")
        }

        async fn forward_transaction(
            &self,
            peer: &str,
            _request: &TransactionRequest,
        ) -> Result<(), PeerError> {
            self.record(peer, "forward_transaction")
        }
    }
}
