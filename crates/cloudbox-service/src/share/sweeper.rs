//! Periodic deactivation of expired share links.
//!
//! Expiry is enforced on every resolution regardless, so the sweeper only
//! keeps stored `is_active` flags close to the truth for listings and
//! reporting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use cloudbox_core::result::AppResult;
use cloudbox_core::types::Clock;
use cloudbox_database::store::ShareLinkStore;

/// Background task that deactivates lapsed links in bulk.
#[derive(Debug, Clone)]
pub struct ShareSweeper {
    /// Link persistence.
    shares: Arc<dyn ShareLinkStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Pause between passes.
    interval: Duration,
}

impl ShareSweeper {
    /// Creates a sweeper running every `interval`.
    pub fn new(shares: Arc<dyn ShareLinkStore>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            shares,
            clock,
            interval,
        }
    }

    /// Runs a single pass and returns the number of links deactivated.
    pub async fn run_once(&self) -> AppResult<u64> {
        let swept = self.shares.deactivate_expired(self.clock.now()).await?;
        if swept > 0 {
            info!(count = swept, "Deactivated expired share links");
        } else {
            debug!("No expired share links to deactivate");
        }
        Ok(swept)
    }

    /// Runs passes until `cancel` flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(interval_seconds = self.interval.as_secs(), "Share sweeper started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "Share sweep failed");
                    }
                }
            }
        }

        info!("Share sweeper stopped");
    }

    /// Spawns [`run`](Self::run) onto the runtime.
    pub fn spawn(self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use cloudbox_core::types::ManualClock;
    use cloudbox_database::memory::MemoryShareLinkStore;
    use cloudbox_entity::share::ShareLink;
    use uuid::Uuid;

    use super::*;

    fn link(clock: &ManualClock, ttl: ChronoDuration) -> ShareLink {
        let now = clock.now();
        ShareLink {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().simple().to_string(),
            file_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            created_at: now,
            expires_at: now + ttl,
            is_active: true,
            access_count: 0,
        }
    }

    #[tokio::test]
    async fn test_run_once_deactivates_only_lapsed_links() {
        let clock = Arc::new(ManualClock::default());
        let shares = Arc::new(MemoryShareLinkStore::new());
        let short = link(&clock, ChronoDuration::hours(1));
        let long = link(&clock, ChronoDuration::hours(3));
        shares.insert(&short).await.unwrap();
        shares.insert(&long).await.unwrap();

        let sweeper = ShareSweeper::new(shares.clone(), clock.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.run_once().await.unwrap(), 0);

        clock.advance(ChronoDuration::hours(1));
        assert_eq!(sweeper.run_once().await.unwrap(), 1);
        assert_eq!(sweeper.run_once().await.unwrap(), 0);

        let stored = shares.find_by_token(&short.token).await.unwrap().unwrap();
        assert!(!stored.is_active);
        let stored = shares.find_by_token(&long.token).await.unwrap().unwrap();
        assert!(stored.is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancel() {
        let clock = Arc::new(ManualClock::default());
        let shares = Arc::new(MemoryShareLinkStore::new());
        let sweeper = ShareSweeper::new(shares, clock, Duration::from_secs(60));

        let (tx, rx) = watch::channel(false);
        let handle = sweeper.spawn(rx);
        time::sleep(Duration::from_secs(180)).await;

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
