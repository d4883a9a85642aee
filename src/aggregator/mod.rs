//! Background feed collection.
//!
//! ```text
//! tick → next_feed_to_fetch → mark_fetched → fetch → decode → normalize → create_post
//! ```
//!
//! One feed is collected per tick, the least recently fetched first, which
//! gives every feed a turn before any feed gets a second one.

pub mod clock;
pub mod scheduler;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, SystemClock};
pub use scheduler::Scheduler;
pub use worker::{IngestOutcome, IngestSummary, IngestWorker};

use tokio::sync::watch;
use tracing::{error, info};

use crate::app::{AppContext, Result};
use crate::config::{format_interval, parse_interval};

/// Collect feeds every `interval` until `shutdown` fires.
///
/// An interval that doesn't parse or isn't positive is rejected with
/// [`FeedtideError::Config`](crate::app::FeedtideError::Config) before the
/// first tick.
pub async fn run_aggregator(
    ctx: &AppContext,
    interval: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let interval = parse_interval(interval)?;

    let worker = IngestWorker::new(ctx.store.clone(), ctx.fetcher.clone(), ctx.clock.clone());
    let scheduler = Scheduler::new(ctx.store.clone(), worker, interval)?;

    info!("Collecting feeds every {}", format_interval(scheduler.interval()));
    scheduler.run(shutdown).await;
    Ok(())
}

/// A receiver that flips to `true` on SIGINT or SIGTERM (Ctrl-C on Windows).
pub fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        let _ = tx.send(true);
    });

    rx
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers, falling back to Ctrl-C: {}", e);
            return wait_for_ctrl_c(tokio::signal::ctrl_c()).await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {},
        _ = sigint.recv() => {},
    }
}

#[cfg(windows)]
async fn wait_for_signal() {
    wait_for_ctrl_c(tokio::signal::ctrl_c()).await
}

/// Resolves when `ctrl_c` does. If the handler couldn't be installed this
/// never resolves, so the aggregator keeps running until it is killed.
async fn wait_for_ctrl_c<F>(ctrl_c: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = ctrl_c.await {
        error!("Failed to listen for Ctrl-C, shutdown signals are disabled: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::FeedtideError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bad_interval_rejected_before_ticking() {
        let ctx = AppContext::in_memory().unwrap();
        let (_tx, rx) = watch::channel(false);

        for bad in ["soon", "0s", ""] {
            let err = run_aggregator(&ctx, bad, rx.clone()).await.unwrap_err();
            assert!(matches!(err, FeedtideError::Config(_)), "{}", bad);
        }
    }

    #[tokio::test]
    async fn test_returns_after_shutdown() {
        let ctx = AppContext::in_memory().unwrap();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        tokio_test::assert_ok!(run_aggregator(&ctx, "1m", rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ctrl_c_handler_never_signals() {
        let failing = async { Err(std::io::Error::other("no signal support")) };
        let waited = tokio::time::timeout(Duration::from_secs(3600), wait_for_ctrl_c(failing)).await;
        assert!(waited.is_err(), "a broken handler must not look like Ctrl-C");
    }

    #[tokio::test]
    async fn test_ctrl_c_resolves_wait() {
        wait_for_ctrl_c(async { Ok(()) }).await;
    }
}
