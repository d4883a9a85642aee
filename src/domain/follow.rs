use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's subscription to a feed. At most one per `(user_id, feed_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub created_at: DateTime<Utc>,
}
