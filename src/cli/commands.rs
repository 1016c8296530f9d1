//! CLI commands for the ledger node
//!
//! Implements the command handlers behind `ledger-node`.

use crate::api::create_router;
use crate::api::handlers::CreatedResponse;
use crate::network::{HttpPeerClient, Node, NodeConfig};
use crate::scheduler::{AutoMine, PeerSync, Scheduler};
use crate::wallet::Wallet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Run a node until Ctrl-C
pub async fn cmd_start(mut config: NodeConfig, auto_mine: bool) -> CliResult<()> {
    if config.miner_address.is_empty() {
        let wallet = Wallet::new();
        println!("🔑 No miner address given, generated a wallet for rewards:");
        println!("{}", serde_json::to_string_pretty(&wallet.export())?);
        config.miner_address = wallet.address().to_string();
    }

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let node = Arc::new(Node::new(config)?);
    let config = node.config();

    println!("🚀 Node listening on http://{}", config.address());
    println!("   Rewards go to {}", config.miner_address);
    println!(
        "   Difficulty {}, reward {}, auto-mine {}",
        config.ledger.difficulty,
        config.ledger.mining_reward,
        if auto_mine { "on" } else { "off" }
    );

    let shutdown = CancellationToken::new();
    let mut jobs = Vec::new();
    if auto_mine {
        let job = AutoMine::new(Arc::clone(&node));
        jobs.push(Scheduler::new(config.mine_interval, job).spawn(shutdown.clone()));
    }
    let job = PeerSync::new(Arc::clone(&node));
    jobs.push(Scheduler::new(config.sync_interval, job).spawn(shutdown.clone()));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        println!("\n📴 Shutting down node...");
        signal.cancel();
    });

    let graceful = shutdown.clone();
    axum::serve(listener, create_router(Arc::clone(&node)))
        .with_graceful_shutdown(async move { graceful.cancelled().await })
        .await?;

    shutdown.cancel();
    for job in jobs {
        job.await?;
    }
    Ok(())
}

/// Generate a wallet and print its keys as JSON
pub fn cmd_wallet_new() -> CliResult<()> {
    let wallet = Wallet::new();
    println!("{}", serde_json::to_string_pretty(&wallet.export())?);
    Ok(())
}

/// Sign a transfer and submit it to a node
pub async fn cmd_send(
    private_key: &str,
    to: &str,
    amount: f64,
    node: &str,
    timeout: Duration,
) -> CliResult<()> {
    let wallet = Wallet::from_private_key(private_key)?;
    let request = wallet.sign_transfer(to, amount)?;

    let body = HttpPeerClient::new(timeout)
        .submit_transaction(node, &request)
        .await?;
    let response: CreatedResponse = serde_json::from_slice(&body)?;

    println!("✅ Sent {} from {} to {}", amount, wallet.address(), to);
    println!("   Forwarded to {} peers", response.forwarded);
    for failure in &response.failures {
        println!("   ⚠️  {}", failure);
    }
    Ok(())
}
