//! Neighbor discovery
//!
//! Peers are found by probing a small window of addresses next to our
//! own: the last IPv4 octet plus an offset, crossed with a port range.
//! Anything that accepts a TCP connection within the probe timeout is a
//! neighbor.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

// =============================================================================
// Defaults
// =============================================================================

/// Offsets added to our last octet
pub const DEFAULT_NEIGHBOR_IPS: RangeInclusive<u8> = 0..=3;

/// Ports probed on each candidate host
pub const DEFAULT_NEIGHBOR_PORTS: RangeInclusive<u16> = 5000..=5003;

/// Bound on a single reachability probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

const FALLBACK_HOST: &str = "127.0.0.1";

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Host is not an IPv4 address: {0}")]
    InvalidHost(String),
}

// =============================================================================
// Neighbor Scan
// =============================================================================

/// A probe window around one node's own address
#[derive(Debug, Clone)]
pub struct NeighborScan {
    pub host: String,
    pub port: u16,
    pub ip_offsets: RangeInclusive<u8>,
    pub ports: RangeInclusive<u16>,
    pub timeout: Duration,
}

impl NeighborScan {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ip_offsets: DEFAULT_NEIGHBOR_IPS,
            ports: DEFAULT_NEIGHBOR_PORTS,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Every address in the window, ports outermost, excluding ourselves
    pub fn candidates(&self) -> Result<Vec<String>, DiscoveryError> {
        let ip: Ipv4Addr = self
            .host
            .parse()
            .map_err(|_| DiscoveryError::InvalidHost(self.host.clone()))?;
        let [a, b, c, d] = ip.octets();
        let own = format!("{}:{}", self.host, self.port);

        let mut candidates = Vec::new();
        for port in self.ports.clone() {
            for offset in self.ip_offsets.clone() {
                let last = d as u16 + offset as u16;
                if last > 255 {
                    continue;
                }
                let candidate = format!("{}.{}.{}.{}:{}", a, b, c, last, port);
                if candidate != own {
                    candidates.push(candidate);
                }
            }
        }
        Ok(candidates)
    }

    /// Probe each candidate in turn and keep the reachable ones
    pub async fn find_neighbors(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut neighbors = Vec::new();
        for candidate in self.candidates()? {
            if is_found_host(&candidate, self.timeout).await {
                neighbors.push(candidate);
            }
        }
        log::debug!("Neighbor scan from {}:{} found {:?}", self.host, self.port, neighbors);
        Ok(neighbors)
    }
}

/// Whether `target` accepts a TCP connection within `timeout`
pub async fn is_found_host(target: &str, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect(target)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            log::trace!("Probe {} failed: {}", target, e);
            false
        }
        Err(_) => {
            log::trace!("Probe {} timed out", target);
            false
        }
    }
}

/// Our outbound IPv4 address, or loopback if there is no route
pub fn local_host() -> String {
    route_local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

fn route_local_ip() -> Option<Ipv4Addr> {
    // Connecting a UDP socket picks a route without sending anything
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:53").ok()?;

    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
