//! Fixed-period job runner
//!
//! The first run happens one period after start. A run that overruns the
//! period delays the next tick instead of bursting to catch up, and a
//! run in progress always finishes before shutdown is observed.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Work executed on every tick
pub trait Job: Send + Sync + 'static {
    type Output: fmt::Display + Send;
    type Error: fmt::Display + Send;

    fn name(&self) -> &'static str;

    fn run(&self) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

pub struct Scheduler<J: Job> {
    period: Duration,
    job: J,
}

impl<J: Job> Scheduler<J> {
    pub fn new(period: Duration, job: J) -> Self {
        Self {
            period: period.max(MIN_PERIOD),
            job,
        }
    }

    /// Tick until `shutdown` fires, returning how many runs completed
    pub async fn run(self, shutdown: CancellationToken) -> u64 {
        let name = self.job.name();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("{} scheduled every {:?}", name, self.period);

        let mut runs = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.job.run().await {
                        Ok(output) => log::info!("{}: {}", name, output),
                        Err(e) => log::warn!("{} failed: {}", name, e),
                    }
                    runs += 1;
                }
            }
        }

        log::info!("{} stopped after {} runs", name, runs);
        runs
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<u64> {
        tokio::spawn(self.run(shutdown))
    }
}
