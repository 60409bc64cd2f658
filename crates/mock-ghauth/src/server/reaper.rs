//! Background sweep of the token store.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::store::{SweepPolicy, TokenStore};

/// Shortest accepted sweep interval; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically evicts tokens from a [`TokenStore`].
#[derive(Debug, Clone)]
pub struct ExpiryReaper {
    tokens: TokenStore,
    interval: Duration,
    policy: SweepPolicy,
}

impl ExpiryReaper {
    #[must_use]
    pub fn new(tokens: TokenStore, interval: Duration, policy: SweepPolicy) -> Self {
        Self {
            tokens,
            interval: interval.max(MIN_INTERVAL),
            policy,
        }
    }

    /// Sweep once per interval until `shutdown` is cancelled.
    ///
    /// The first sweep happens one full interval after the call.
    pub async fn run(self, shutdown: CancellationToken) {
        let start = Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, policy = ?self.policy, "Token reaper started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.tokens.sweep(Utc::now(), self.policy).await;
                    if removed > 0 {
                        tracing::debug!(count = removed, "Reaped access tokens");
                    }
                }
            }
        }

        tracing::info!("Token reaper stopped");
    }

    /// Run the reaper on its own task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
