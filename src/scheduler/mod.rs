//! Periodic background work: auto-mining and peer refresh

pub mod jobs;
pub mod periodic;

pub use jobs::{AutoMine, PeerSync};
pub use periodic::{Job, Scheduler};
