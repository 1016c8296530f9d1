//! Background jobs driven by the scheduler

use crate::network::{MineReport, Node, NodeError, PeerClient};
use crate::scheduler::periodic::Job;
use std::sync::Arc;

/// Mine the pending pool on every tick
pub struct AutoMine<C: PeerClient> {
    node: Arc<Node<C>>,
}

impl<C: PeerClient> AutoMine<C> {
    pub fn new(node: Arc<Node<C>>) -> Self {
        Self { node }
    }
}

impl<C: PeerClient> Job for AutoMine<C> {
    type Output = MineReport;
    type Error = NodeError;

    fn name(&self) -> &'static str {
        "auto-mine"
    }

    async fn run(&self) -> Result<MineReport, NodeError> {
        self.node.mine().await
    }
}

/// Rescan the neighbor window on every tick
pub struct PeerSync<C: PeerClient> {
    node: Arc<Node<C>>,
}

impl<C: PeerClient> PeerSync<C> {
    pub fn new(node: Arc<Node<C>>) -> Self {
        Self { node }
    }
}

impl<C: PeerClient> Job for PeerSync<C> {
    type Output = String;
    type Error = NodeError;

    fn name(&self) -> &'static str {
        "peer-sync"
    }

    async fn run(&self) -> Result<String, NodeError> {
        let count = self.node.refresh_peers().await?;
        Ok(format!("{} peers", count))
    }
}
