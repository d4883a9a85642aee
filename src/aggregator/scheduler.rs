use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::aggregator::worker::{IngestOutcome, IngestWorker};
use crate::app::{FeedtideError, Result};
use crate::domain::Feed;
use crate::store::Store;

/// Consecutive unreachable-store cycles before the log level escalates.
const STORE_FAILURE_ESCALATION: u32 = 3;

/// Polls one feed per tick, always the least recently fetched one.
pub struct Scheduler<S> {
    store: Arc<S>,
    worker: IngestWorker<S>,
    interval: Duration,
}

impl<S: Store + Send + Sync> Scheduler<S> {
    pub fn new(store: Arc<S>, worker: IngestWorker<S>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(FeedtideError::Config(
                "Polling interval must be positive".into(),
            ));
        }

        Ok(Self {
            store,
            worker,
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Select the next feed and ingest it.
    ///
    /// Returns `None` when there are no feeds at all.
    pub async fn run_cycle(&self) -> Result<Option<(Feed, IngestOutcome)>> {
        let Some(feed) = self.store.next_feed_to_fetch()? else {
            return Ok(None);
        };

        debug!(feed_id = feed.id, url = %feed.url, "Selected feed");
        let outcome = self.worker.ingest(&feed).await?;
        Ok(Some((feed, outcome)))
    }

    /// Run cycles until `shutdown` changes or its sender is dropped.
    ///
    /// The first cycle starts immediately. Ticks are fixed-rate: a cycle that
    /// overruns is followed by one immediate cycle and then the schedule
    /// resumes on the original boundaries. A shutdown that arrives while a
    /// cycle is fetching abandons the request.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut store_failures = 0u32;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = timer.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("Shutdown requested, abandoning in-flight cycle");
                    break;
                }
                result = self.run_cycle() => self.report(result, &mut store_failures),
            }
        }

        info!("Aggregator stopped");
    }

    fn report(&self, result: Result<Option<(Feed, IngestOutcome)>>, store_failures: &mut u32) {
        match result {
            Ok(None) => {
                *store_failures = 0;
                debug!("No feeds to fetch");
            }
            Ok(Some(_)) => *store_failures = 0,
            Err(e) if e.is_store_unavailable() => {
                *store_failures += 1;
                if *store_failures >= STORE_FAILURE_ESCALATION {
                    error!(
                        consecutive_failures = *store_failures,
                        "Store still unreachable, will retry next tick: {}", e
                    );
                } else {
                    warn!("Store unreachable, will retry next tick: {}", e);
                }
            }
            Err(e) => {
                *store_failures = 0;
                warn!("Cycle aborted: {}", e);
            }
        }
    }
}
