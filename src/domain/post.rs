use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::RawItem;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// Insert parameters for a post; `(feed_id, url)` identifies it.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A raw item paired with the outcome of parsing its publish date.
#[derive(Debug)]
pub struct NormalizedItem {
    pub item: RawItem,
    pub published_at: Result<DateTime<Utc>>,
}

impl NormalizedItem {
    /// Build the insert for this item, or `None` if it cannot become a post.
    pub fn to_new_post(&self, feed_id: i64, created_at: DateTime<Utc>) -> Option<NewPost> {
        let published_at = *self.published_at.as_ref().ok()?;
        let url = self.item.link.as_ref()?.clone();

        Some(NewPost {
            feed_id,
            title: self.item.title.clone(),
            url,
            description: self.item.description.clone(),
            published_at,
            created_at,
        })
    }
}
