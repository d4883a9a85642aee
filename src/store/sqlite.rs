use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{FeedtideError, Result};
use crate::domain::{Feed, FeedFollow, NewFeed, NewPost, Post, User};
use crate::store::Store;

const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, created_at";
const POST_COLUMNS: &str = "id, feed_id, title, url, description, published_at, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-feed-follows/up.sql")),
        ]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FeedtideError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    /// A poisoned lock means a writer panicked mid-statement; treat the
    /// store as unreachable rather than trusting the connection.
    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FeedtideError::StoreUnavailable(e.to_string()))
    }

    fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            last_fetched_at: optional_datetime_column(row, 4)?,
            created_at: datetime_column(row, 5)?,
        })
    }

    fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: datetime_column(row, 5)?,
            created_at: datetime_column(row, 6)?,
        })
    }

    fn user_from_row(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: datetime_column(row, 2)?,
        })
    }

    fn query_feed(
        conn: &Connection,
        clause: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Option<Feed>> {
        let sql = format!("SELECT {} FROM feeds WHERE {}", FEED_COLUMNS, clause);
        let feed = conn
            .query_row(&sql, params![param], Self::feed_from_row)
            .optional()?;
        Ok(feed)
    }
}

/// Fixed-width UTC timestamps, so that text order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn datetime_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(&raw).ok_or_else(|| invalid_timestamp(idx, &raw))
}

/// NULL stays `None`; text that isn't a timestamp is a conversion failure.
fn optional_datetime_column(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_datetime(&raw).ok_or_else(|| invalid_timestamp(idx, &raw)))
        .transpose()
}

fn invalid_timestamp(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("invalid timestamp: {}", raw).into(),
    )
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Store for SqliteStore {
    fn add_user(&self, name: &str) -> Result<User> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO users (name, created_at) VALUES (?1, ?2)",
            params![name, format_datetime(&created_at)],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                FeedtideError::Other(format!("User already exists: {}", name))
            } else {
                e.into()
            }
        })?;

        Ok(User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE name = ?1",
                params![name],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn get_all_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, created_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn add_feed(&self, feed: &NewFeed) -> Result<Feed> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (name, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                feed.name,
                feed.url,
                feed.user_id,
                format_datetime(&feed.created_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                FeedtideError::Other(format!("Feed already exists: {}", feed.url))
            } else {
                e.into()
            }
        })?;

        Ok(Feed {
            id: conn.last_insert_rowid(),
            name: feed.name.clone(),
            url: feed.url.clone(),
            user_id: feed.user_id,
            last_fetched_at: None,
            created_at: feed.created_at,
        })
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        Self::query_feed(&conn, "id = ?1", &id)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        Self::query_feed(&conn, "url = ?1", &url)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM feeds ORDER BY name, url", FEED_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM feeds
             ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC
             LIMIT 1",
            FEED_COLUMNS
        );
        let feed = conn.query_row(&sql, [], Self::feed_from_row).optional()?;
        Ok(feed)
    }

    fn mark_fetched(&self, feed_id: i64, at: DateTime<Utc>) -> Result<Feed> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE feeds SET last_fetched_at = ?1 WHERE id = ?2",
            params![format_datetime(&at), feed_id],
        )?;
        if updated == 0 {
            return Err(FeedtideError::FeedNotFound(feed_id.to_string()));
        }

        Self::query_feed(&conn, "id = ?1", &feed_id)?
            .ok_or_else(|| FeedtideError::FeedNotFound(feed_id.to_string()))
    }

    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, feed_id, format_datetime(&created_at)],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                FeedtideError::AlreadyFollowing { user_id, feed_id }
            } else {
                e.into()
            }
        })?;

        Ok(FeedFollow {
            id: conn.last_insert_rowid(),
            user_id,
            feed_id,
            created_at,
        })
    }

    fn unfollow_feed(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id, feed_id],
        )?;
        Ok(removed > 0)
    }

    fn get_followed_feeds(&self, user_id: i64) -> Result<Vec<Feed>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM feeds
             WHERE id IN (SELECT feed_id FROM feed_follows WHERE user_id = ?1)
             ORDER BY name, url",
            FEED_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let feeds = stmt
            .query_map(params![user_id], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(feeds)
    }

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT INTO posts (feed_id, title, url, description, published_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                post.feed_id,
                post.title,
                post.url,
                post.description,
                format_datetime(&post.published_at),
                format_datetime(&post.created_at)
            ],
        );

        match inserted {
            Ok(_) => Ok(Post {
                id: conn.last_insert_rowid(),
                feed_id: post.feed_id,
                title: post.title.clone(),
                url: post.url.clone(),
                description: post.description.clone(),
                published_at: post.published_at,
                created_at: post.created_at,
            }),
            Err(e) if is_unique_violation(&e) => Err(FeedtideError::DuplicatePost {
                feed_id: post.feed_id,
                url: post.url.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM posts WHERE feed_id = ?1 ORDER BY published_at DESC, id DESC",
            POST_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params![feed_id], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn get_recent_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM posts ORDER BY published_at DESC, id DESC LIMIT ?1",
            POST_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params![limit as i64], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<Post>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM posts
             WHERE feed_id IN (SELECT feed_id FROM feed_follows WHERE user_id = ?1)
             ORDER BY published_at DESC, id DESC LIMIT ?2",
            POST_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params![user_id, limit as i64], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}
