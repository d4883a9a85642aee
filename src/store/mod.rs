pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, NewFeed, NewPost, Post, User};

pub use sqlite::SqliteStore;

/// Persistence for users, feeds, follows and posts.
///
/// The store is shared between the aggregator and the CLI commands and is
/// responsible for serializing conflicting writes itself.
pub trait Store {
    // User operations
    fn add_user(&self, name: &str) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn get_all_users(&self) -> Result<Vec<User>>;

    // Feed operations
    fn add_feed(&self, feed: &NewFeed) -> Result<Feed>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;

    /// The feed fetched least recently; never-fetched feeds come first.
    fn next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Set `last_fetched_at` to `at` and return the updated feed.
    fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<Feed>;

    // Follow operations

    /// Subscribe `user_id` to `feed_id`. Fails with
    /// [`AlreadyFollowing`](crate::app::FeedtideError::AlreadyFollowing)
    /// when the subscription exists.
    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow>;

    /// Returns `false` when there was nothing to remove.
    fn unfollow_feed(&self, user_id: i64, feed_id: i64) -> Result<bool>;
    fn get_followed_feeds(&self, user_id: i64) -> Result<Vec<Feed>>;

    // Post operations

    /// Insert a post. Fails with
    /// [`DuplicatePost`](crate::app::FeedtideError::DuplicatePost) when the
    /// feed already has a post with the same URL.
    fn create_post(&self, post: &NewPost) -> Result<Post>;
    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>>;
    fn get_recent_posts(&self, limit: usize) -> Result<Vec<Post>>;

    /// Most recent posts across the feeds `user_id` follows.
    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>>;
}
