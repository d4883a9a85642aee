use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub user_id: i64,
    /// `None` until the aggregator claims the feed for the first time.
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Feed {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl NewFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
            created_at: Utc::now(),
        }
    }
}
