//! Ledger node CLI
//!
//! Runs a node, or acts as a wallet against a running one.

use clap::{Parser, Subcommand};
use peer_ledger::cli;
use peer_ledger::core::{LedgerConfig, DEFAULT_DIFFICULTY, MINING_REWARD};
use peer_ledger::network::{local_host, NodeConfig, DEFAULT_PORT};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ledger-node")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A peer-replicated proof-of-work ledger node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a node
    Start {
        /// Host to advertise and scan around (detected if omitted)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address receiving mining rewards (a fresh wallet if omitted)
        #[arg(short, long)]
        miner_address: Option<String>,

        /// Leading zero hex digits required of a block hash
        #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY)]
        difficulty: usize,

        /// Reward paid per mined block
        #[arg(long, default_value_t = MINING_REWARD)]
        reward: f64,

        /// Reject transfers exceeding the sender's confirmed balance
        #[arg(long)]
        strict_balance: bool,

        /// Seconds between auto-mine attempts
        #[arg(long, default_value_t = 10)]
        mine_interval: u64,

        /// Seconds between neighbor scans
        #[arg(long, default_value_t = 10)]
        sync_interval: u64,

        /// Only mine on POST /mine
        #[arg(long)]
        no_auto_mine: bool,

        /// Extra peers to keep regardless of discovery (comma separated)
        #[arg(long, value_delimiter = ',')]
        peers: Vec<String>,

        /// First offset added to our last IPv4 octet when scanning
        #[arg(long, default_value_t = 0)]
        ip_start: u8,

        /// Last offset added to our last IPv4 octet when scanning
        #[arg(long, default_value_t = 3)]
        ip_end: u8,

        /// First port probed on each neighbor
        #[arg(long, default_value_t = 5000)]
        port_start: u16,

        /// Last port probed on each neighbor
        #[arg(long, default_value_t = 5003)]
        port_end: u16,

        /// Milliseconds allowed per neighbor probe
        #[arg(long, default_value_t = 1000)]
        probe_timeout_ms: u64,

        /// Milliseconds allowed per peer request
        #[arg(long, default_value_t = 3000)]
        peer_timeout_ms: u64,
    },

    /// Generate a new wallet
    Wallet,

    /// Sign a transfer and submit it to a node
    Send {
        /// Sender's private key (hex)
        #[arg(short, long)]
        private_key: String,

        /// Recipient's address
        #[arg(short, long)]
        to: String,

        /// Amount to send
        #[arg(short, long)]
        amount: f64,

        /// Node to submit to
        #[arg(short, long, default_value = "127.0.0.1:5000")]
        node: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Wallet => cli::cmd_wallet_new(),

        Commands::Start {
            host,
            port,
            miner_address,
            difficulty,
            reward,
            strict_balance,
            mine_interval,
            sync_interval,
            no_auto_mine,
            peers,
            ip_start,
            ip_end,
            port_start,
            port_end,
            probe_timeout_ms,
            peer_timeout_ms,
        } => {
            let config = NodeConfig {
                host: host.unwrap_or_else(local_host),
                port,
                miner_address: miner_address.unwrap_or_default(),
                ledger: LedgerConfig {
                    difficulty,
                    mining_reward: reward,
                    strict_balance,
                },
                neighbor_ips: ip_start..=ip_end,
                neighbor_ports: port_start..=port_end,
                probe_timeout: Duration::from_millis(probe_timeout_ms),
                peer_timeout: Duration::from_millis(peer_timeout_ms),
                mine_interval: Duration::from_secs(mine_interval),
                sync_interval: Duration::from_secs(sync_interval),
                bootstrap_peers: peers,
            };

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_start(config, !no_auto_mine))
        }

        Commands::Send {
            private_key,
            to,
            amount,
            node,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_send(
                &private_key,
                &to,
                amount,
                &node,
                Duration::from_secs(10),
            ))
        }
    }
}
