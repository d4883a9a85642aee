use url::Url;

use crate::aggregator::{run_aggregator, shutdown_signal};
use crate::app::{AppContext, FeedtideError, Result};
use crate::domain::{Feed, FeedFollow, NewFeed, Post, User};
use crate::store::Store;

/// Which posts `browse` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseScope<'a> {
    All,
    /// Posts from the feed with this URL.
    Feed(&'a str),
    /// Posts from every feed this user follows.
    User(&'a str),
}

pub fn register_user(ctx: &AppContext, name: &str) -> Result<User> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FeedtideError::Other("User name cannot be empty".into()));
    }

    let user = ctx.store.add_user(name)?;
    println!("Registered user: {}", user.name);
    Ok(user)
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.get_all_users()?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    for user in users {
        println!("* {}", user.name);
    }

    Ok(())
}

fn require_user(ctx: &AppContext, name: &str) -> Result<User> {
    ctx.store
        .get_user_by_name(name)?
        .ok_or_else(|| FeedtideError::UserNotFound(name.to_string()))
}

fn require_feed(ctx: &AppContext, url: &str) -> Result<Feed> {
    ctx.store
        .get_feed_by_url(url)?
        .ok_or_else(|| FeedtideError::FeedNotFound(url.to_string()))
}

/// Add a feed owned by `user_name` and subscribe them to it.
///
/// An already-known URL is left as is, but the user still ends up following it.
pub fn add_feed(ctx: &AppContext, name: &str, url: &str, user_name: &str) -> Result<Feed> {
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FeedtideError::Other(format!(
            "Unsupported URL scheme '{}': {}",
            parsed.scheme(),
            url
        )));
    }

    let user = require_user(ctx, user_name)?;

    let feed = match ctx.store.get_feed_by_url(parsed.as_str())? {
        Some(existing) => {
            println!("Feed already exists: {}", existing.url);
            existing
        }
        None => {
            let feed = ctx
                .store
                .add_feed(&NewFeed::new(name.trim(), parsed.as_str(), user.id))?;
            println!("Added feed: {} ({})", feed.display_name(), feed.url);
            feed
        }
    };

    match ctx.store.follow_feed(user.id, feed.id) {
        Ok(_) => println!("{} now follows {}", user.name, feed.display_name()),
        Err(FeedtideError::AlreadyFollowing { .. }) => {}
        Err(e) => return Err(e),
    }

    Ok(feed)
}

pub fn follow(ctx: &AppContext, url: &str, user_name: &str) -> Result<FeedFollow> {
    let user = require_user(ctx, user_name)?;
    let feed = require_feed(ctx, url)?;

    let follow = ctx.store.follow_feed(user.id, feed.id)?;
    println!("{} now follows {}", user.name, feed.display_name());
    Ok(follow)
}

pub fn following(ctx: &AppContext, user_name: &str) -> Result<Vec<Feed>> {
    let user = require_user(ctx, user_name)?;
    let feeds = ctx.store.get_followed_feeds(user.id)?;

    if feeds.is_empty() {
        println!("{} follows no feeds", user.name);
    }
    for feed in &feeds {
        println!("* {}", feed.display_name());
    }

    Ok(feeds)
}

/// Returns `false` when the user wasn't following the feed.
pub fn unfollow(ctx: &AppContext, url: &str, user_name: &str) -> Result<bool> {
    let user = require_user(ctx, user_name)?;
    let feed = require_feed(ctx, url)?;

    let removed = ctx.store.unfollow_feed(user.id, feed.id)?;
    if removed {
        println!("{} unfollowed {}", user.name, feed.display_name());
    } else {
        println!("{} was not following {}", user.name, feed.display_name());
    }
    Ok(removed)
}

pub fn list_feeds(ctx: &AppContext, json: bool) -> Result<()> {
    let feeds = ctx.store.get_all_feeds()?;

    if json {
        let out = serde_json::to_string_pretty(&feeds)
            .map_err(|e| FeedtideError::Other(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    for feed in feeds {
        let owner = ctx
            .store
            .get_user(feed.user_id)?
            .map(|u| u.name)
            .unwrap_or_else(|| "?".to_string());
        let fetched = feed
            .last_fetched_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "{}\n  {}\n  added by {}, last fetched {}",
            feed.display_name(),
            feed.url,
            owner,
            fetched
        );
    }

    Ok(())
}

/// Most recent posts in `scope`, newest first.
pub fn recent_posts(ctx: &AppContext, limit: usize, scope: BrowseScope<'_>) -> Result<Vec<Post>> {
    match scope {
        BrowseScope::All => ctx.store.get_recent_posts(limit),
        BrowseScope::Feed(url) => {
            let feed = require_feed(ctx, url)?;
            let mut posts = ctx.store.get_posts_by_feed(feed.id)?;
            posts.truncate(limit);
            Ok(posts)
        }
        BrowseScope::User(name) => {
            let user = require_user(ctx, name)?;
            ctx.store.get_posts_for_user(user.id, limit)
        }
    }
}

pub fn browse(ctx: &AppContext, limit: usize, scope: BrowseScope<'_>, json: bool) -> Result<()> {
    let posts = recent_posts(ctx, limit, scope)?;

    if json {
        let out = serde_json::to_string_pretty(&posts)
            .map_err(|e| FeedtideError::Other(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in posts {
        println!(
            "{} {}\n  {}",
            post.published_at.format("%Y-%m-%d"),
            post.display_title(),
            post.url
        );
        if let Some(description) = post.description.as_deref().filter(|d| !d.is_empty()) {
            println!("  {}", description);
        }
    }

    Ok(())
}

/// Run the aggregator in the foreground until SIGINT/SIGTERM.
pub async fn aggregate(ctx: &AppContext, interval: &str) -> Result<()> {
    run_aggregator(ctx, interval, shutdown_signal()).await
}
