//! Command handlers for the `ledger-node` binary

pub mod commands;

pub use commands::{cmd_send, cmd_start, cmd_wallet_new, CliResult};
