//! Test doubles for the aggregator: a stepping clock, a scripted fetcher
//! and a store wrapper that can be switched off.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use crate::aggregator::clock::Clock;
use crate::app::{FeedtideError, Result};
use crate::domain::{Feed, FeedFollow, NewFeed, NewPost, Post, User};
use crate::fetcher::Fetcher;
use crate::store::{SqliteStore, Store};

/// Returns its current instant and then moves forward by `step`.
pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl FakeClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            step: Duration::seconds(1),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        let current = *now;
        *now = current + self.step;
        current
    }
}

#[derive(Clone)]
pub enum StubResponse {
    Body(Vec<u8>),
    TransportError,
    /// Answers with the body after the given delay.
    Slow(std::time::Duration, Vec<u8>),
    /// Never completes.
    Hang,
}

/// Serves scripted responses per URL and records every request.
#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, StubResponse>>,
    visited: Mutex<Vec<String>>,
    notify: Option<mpsc::UnboundedSender<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report every requested URL on the returned channel.
    pub fn with_notifications() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Self {
            notify: Some(tx),
            ..Self::default()
        };
        (fetcher, rx)
    }

    pub fn respond(&self, url: &str, response: StubResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.visited.lock().unwrap().push(url.to_string());
        if let Some(tx) = &self.notify {
            let _ = tx.send(url.to_string());
        }

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(StubResponse::Body(body)) => Ok(body),
            Some(StubResponse::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Some(StubResponse::Hang) => std::future::pending().await,
            Some(StubResponse::TransportError) | None => Err(transport_error()),
        }
    }
}

/// A genuine `reqwest::Error`, produced without touching the network.
pub fn transport_error() -> FeedtideError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .expect_err("a relative URL cannot be requested");
    FeedtideError::Fetch(err)
}

pub fn rss_item(title: &str, link: &str, pub_date: &str) -> String {
    format!(
        "<item><title>{}</title><link>{}</link><pubDate>{}</pubDate><description>About {}</description></item>",
        title, link, pub_date, title
    )
}

pub fn feed_body(items: &[String]) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Stub</title><link>https://example.com/</link><description>Stub feed</description>{}</channel></rss>"#,
        items.concat()
    )
    .into_bytes()
}

/// Delegates to a real store unless switched to fail with `StoreUnavailable`.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    unavailable: AtomicBool,
    posts_unavailable: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            unavailable: AtomicBool::new(false),
            posts_unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn set_posts_unavailable(&self, down: bool) {
        self.posts_unavailable.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FeedtideError::StoreUnavailable("database is locked".into()));
        }
        Ok(())
    }
}

impl Store for FlakyStore {
    fn add_user(&self, name: &str) -> Result<User> {
        self.check()?;
        self.inner.add_user(name)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.check()?;
        self.inner.get_user(id)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.check()?;
        self.inner.get_user_by_name(name)
    }

    fn get_all_users(&self) -> Result<Vec<User>> {
        self.check()?;
        self.inner.get_all_users()
    }

    fn add_feed(&self, feed: &NewFeed) -> Result<Feed> {
        self.check()?;
        self.inner.add_feed(feed)
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        self.check()?;
        self.inner.get_feed(id)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        self.check()?;
        self.inner.get_feed_by_url(url)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        self.check()?;
        self.inner.get_all_feeds()
    }

    fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        self.check()?;
        self.inner.next_feed_to_fetch()
    }

    fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<Feed> {
        self.check()?;
        self.inner.mark_fetched(feed_id, at)
    }

    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        self.check()?;
        self.inner.follow_feed(user_id, feed_id)
    }

    fn unfollow_feed(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        self.check()?;
        self.inner.unfollow_feed(user_id, feed_id)
    }

    fn get_followed_feeds(&self, user_id: i64) -> Result<Vec<Feed>> {
        self.check()?;
        self.inner.get_followed_feeds(user_id)
    }

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        self.check()?;
        if self.posts_unavailable.load(Ordering::SeqCst) {
            return Err(FeedtideError::StoreUnavailable("disk I/O error".into()));
        }
        self.inner.create_post(post)
    }

    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        self.check()?;
        self.inner.get_posts_by_feed(feed_id)
    }

    fn get_recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
        self.check()?;
        self.inner.get_recent_posts(limit)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>> {
        self.check()?;
        self.inner.get_posts_for_user(user_id, limit)
    }
}
