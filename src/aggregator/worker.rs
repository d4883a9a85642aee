use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::aggregator::clock::Clock;
use crate::app::{FeedtideError, Result};
use crate::domain::Feed;
use crate::fetcher::{fetch_feed, Fetcher};
use crate::normalizer::normalize_items;
use crate::store::Store;

/// Per-feed counts from one ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Items present in the fetched document.
    pub items_seen: usize,
    pub created: usize,
    /// Items whose `(feed, link)` was already stored.
    pub duplicates: usize,
    /// Items dropped because their publish date could not be parsed.
    pub bad_dates: usize,
    /// Items without a link, or whose insert failed for another reason.
    pub skipped: usize,
}

#[derive(Debug)]
pub enum IngestOutcome {
    Ingested(IngestSummary),
    /// Fetching or decoding failed; no posts were touched.
    FetchFailed(FeedtideError),
}

/// Collects one feed into the store.
pub struct IngestWorker<S> {
    store: Arc<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<S: Store + Send + Sync> IngestWorker<S> {
    pub fn new(
        store: Arc<S>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock,
        }
    }

    /// Mark `feed` fetched, then fetch it and store its new items.
    ///
    /// The feed is marked before the network call so that a feed which
    /// keeps failing still moves to the back of the rotation. Fetch and
    /// per-item failures are logged and absorbed; only a failure to reach
    /// the store is returned as an error.
    pub async fn ingest(&self, feed: &Feed) -> Result<IngestOutcome> {
        self.store.mark_fetched(feed.id, self.clock.now())?;

        let raw = match fetch_feed(self.fetcher.as_ref(), &feed.url).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(feed_id = feed.id, feed = %feed.display_name(), url = %feed.url, "Couldn't collect feed: {}", e);
                return Ok(IngestOutcome::FetchFailed(e));
            }
        };

        let mut summary = IngestSummary {
            items_seen: raw.items.len(),
            ..Default::default()
        };

        for normalized in normalize_items(raw) {
            if let Err(e) = &normalized.published_at {
                warn!(feed_id = feed.id, title = %normalized.item.title, "Skipping item: {}", e);
                summary.bad_dates += 1;
                continue;
            }

            let Some(post) = normalized.to_new_post(feed.id, self.clock.now()) else {
                warn!(feed_id = feed.id, title = %normalized.item.title, "Skipping item without a link");
                summary.skipped += 1;
                continue;
            };

            match self.store.create_post(&post) {
                Ok(created) => {
                    debug!(feed_id = feed.id, post_id = created.id, url = %created.url, "Stored post");
                    summary.created += 1;
                }
                Err(e) if e.is_duplicate() => summary.duplicates += 1,
                Err(e) if e.is_store_unavailable() => return Err(e),
                Err(e) => {
                    warn!(feed_id = feed.id, url = %post.url, "Couldn't store post: {}", e);
                    summary.skipped += 1;
                }
            }
        }

        info!(
            feed_id = feed.id,
            feed = %feed.display_name(),
            seen = summary.items_seen,
            created = summary.created,
            duplicates = summary.duplicates,
            "Feed collected"
        );

        Ok(IngestOutcome::Ingested(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::testing::{
        feed_body, rss_item, FakeClock, FlakyStore, StubFetcher, StubResponse,
    };
    use crate::domain::{NewFeed, Post};
    use crate::store::SqliteStore;
    use chrono::{TimeZone, Utc};

    const FEED_URL: &str = "https://example.com/feed.xml";

    struct Fixture {
        store: Arc<SqliteStore>,
        fetcher: Arc<StubFetcher>,
        clock: Arc<FakeClock>,
        feed: Feed,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(SqliteStore::in_memory().unwrap());
            let user = store.add_user("alice").unwrap();
            let feed = store
                .add_feed(&NewFeed::new("Example", FEED_URL, user.id))
                .unwrap();
            Self {
                store,
                fetcher: Arc::new(StubFetcher::new()),
                clock: Arc::new(FakeClock::starting_at(
                    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
                )),
                feed,
            }
        }

        fn worker(&self) -> IngestWorker<SqliteStore> {
            IngestWorker::new(self.store.clone(), self.fetcher.clone(), self.clock.clone())
        }

        fn posts(&self) -> Vec<Post> {
            self.store.get_posts_by_feed(self.feed.id).unwrap()
        }
    }

    fn summary(outcome: IngestOutcome) -> IngestSummary {
        match outcome {
            IngestOutcome::Ingested(summary) => summary,
            IngestOutcome::FetchFailed(e) => panic!("unexpected fetch failure: {}", e),
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_posts_and_marks_fetched() {
        let fx = Fixture::new();
        fx.fetcher.respond(
            FEED_URL,
            StubResponse::Body(feed_body(&[
                rss_item("First", "https://example.com/1", "Mon, 03 Jun 2024 10:00:00 +0000"),
                rss_item("Second", "https://example.com/2", "Sun, 02 Jun 2024 10:00:00 GMT"),
            ])),
        );

        let result = summary(fx.worker().ingest(&fx.feed).await.unwrap());
        assert_eq!(
            result,
            IngestSummary {
                items_seen: 2,
                created: 2,
                ..Default::default()
            }
        );

        let posts = fx.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "First");
        assert_eq!(
            posts[0].published_at,
            Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
        );

        let feed = fx.store.get_feed(fx.feed.id).unwrap().unwrap();
        assert_eq!(
            feed.last_fetched_at,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_reingesting_is_idempotent() {
        let fx = Fixture::new();
        fx.fetcher.respond(
            FEED_URL,
            StubResponse::Body(feed_body(&[
                rss_item("A", "https://example.com/a", "Mon, 03 Jun 2024 10:00:00 +0000"),
                rss_item("B", "https://example.com/b", "Mon, 03 Jun 2024 11:00:00 +0000"),
            ])),
        );
        let worker = fx.worker();

        summary(worker.ingest(&fx.feed).await.unwrap());
        let first: Vec<(i64, String)> = fx.posts().into_iter().map(|p| (p.id, p.url)).collect();

        let second = summary(worker.ingest(&fx.feed).await.unwrap());
        assert_eq!(second.created, 0);
        assert_eq!(second.duplicates, 2);

        let again: Vec<(i64, String)> = fx.posts().into_iter().map(|p| (p.id, p.url)).collect();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_duplicate_link_within_payload() {
        let fx = Fixture::new();
        fx.fetcher.respond(
            FEED_URL,
            StubResponse::Body(feed_body(&[
                rss_item("Original", "https://example.com/same", "Mon, 03 Jun 2024 10:00:00 +0000"),
                rss_item("Repost", "https://example.com/same", "Mon, 03 Jun 2024 11:00:00 +0000"),
            ])),
        );

        let result = summary(fx.worker().ingest(&fx.feed).await.unwrap());
        assert_eq!(result.created, 1);
        assert_eq!(result.duplicates, 1);

        let posts = fx.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Original");
    }

    #[tokio::test]
    async fn test_bad_date_skips_only_that_item() {
        let fx = Fixture::new();
        fx.fetcher.respond(
            FEED_URL,
            StubResponse::Body(feed_body(&[
                rss_item("Broken", "https://example.com/broken", "not-a-date"),
                rss_item("Fine", "https://example.com/fine", "Mon, 03 Jun 2024 10:00:00 +0000"),
            ])),
        );

        let result = summary(fx.worker().ingest(&fx.feed).await.unwrap());
        assert_eq!(result.items_seen, 2);
        assert_eq!(result.bad_dates, 1);
        assert_eq!(result.created, 1);

        let posts = fx.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].url, "https://example.com/fine");
    }

    #[tokio::test]
    async fn test_item_without_link_is_skipped() {
        let fx = Fixture::new();
        let body = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title><link>https://example.com/</link><description>d</description>
<item><title>No link</title><pubDate>Mon, 03 Jun 2024 10:00:00 +0000</pubDate></item>
<item><title>Linked</title><link>https://example.com/x</link><pubDate>Mon, 03 Jun 2024 10:00:00 +0000</pubDate></item>
</channel></rss>"#;
        fx.fetcher
            .respond(FEED_URL, StubResponse::Body(body.as_bytes().to_vec()));

        let result = summary(fx.worker().ingest(&fx.feed).await.unwrap());
        assert_eq!(result.skipped, 1);
        assert_eq!(result.created, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_still_advances_rotation() {
        let fx = Fixture::new();
        fx.fetcher.respond(FEED_URL, StubResponse::TransportError);

        let outcome = fx.worker().ingest(&fx.feed).await.unwrap();
        assert!(matches!(
            outcome,
            IngestOutcome::FetchFailed(FeedtideError::Fetch(_))
        ));

        let feed = fx.store.get_feed(fx.feed.id).unwrap().unwrap();
        assert!(feed.last_fetched_at.is_some());
        assert!(fx.posts().is_empty());
    }

    #[tokio::test]
    async fn test_empty_and_malformed_feeds_are_fetch_failures() {
        let fx = Fixture::new();
        let worker = fx.worker();

        fx.fetcher
            .respond(FEED_URL, StubResponse::Body(feed_body(&[])));
        assert!(matches!(
            worker.ingest(&fx.feed).await.unwrap(),
            IngestOutcome::FetchFailed(FeedtideError::EmptyFeed(_))
        ));

        fx.fetcher
            .respond(FEED_URL, StubResponse::Body(b"<html></html>".to_vec()));
        assert!(matches!(
            worker.ingest(&fx.feed).await.unwrap(),
            IngestOutcome::FetchFailed(FeedtideError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_store_unavailable_during_mark_is_fatal() {
        let fx = Fixture::new();
        let flaky = Arc::new(FlakyStore::new(fx.store.clone()));
        flaky.set_unavailable(true);
        let worker = IngestWorker::new(flaky.clone(), fx.fetcher.clone(), fx.clock.clone());

        let err = worker.ingest(&fx.feed).await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(fx.fetcher.visited().is_empty());
    }

    #[tokio::test]
    async fn test_store_unavailable_during_insert_aborts() {
        let fx = Fixture::new();
        fx.fetcher.respond(
            FEED_URL,
            StubResponse::Body(feed_body(&[rss_item(
                "A",
                "https://example.com/a",
                "Mon, 03 Jun 2024 10:00:00 +0000",
            )])),
        );
        let flaky = Arc::new(FlakyStore::new(fx.store.clone()));
        flaky.set_posts_unavailable(true);
        let worker = IngestWorker::new(flaky.clone(), fx.fetcher.clone(), fx.clock.clone());

        let err = worker.ingest(&fx.feed).await.unwrap_err();
        assert!(err.is_store_unavailable());
        assert!(fx.posts().is_empty());
        // The claim happened before the failure.
        let feed = fx.store.get_feed(fx.feed.id).unwrap().unwrap();
        assert!(feed.last_fetched_at.is_some());
    }
}
